use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::{
    domain::{MessageId, ReportId, TagId},
    protocol::{Message, TagDetails, TimelinePoint},
};
use tracing::{debug, warn};
use url::Url;

use crate::{
    config::ClientSettings,
    error::{ClientError, ClientResult},
    page::PageMeta,
    query_cache::QueryCache,
    transport::{build_http_client, read_json},
};

const TAG_DETAILS_QUERY: &str = r#"
query TagDetails($tagId: String!, $reportId: String!) {
  tagDetails(tagId: $tagId, reportId: $reportId) {
    reportName
    tagName
    messages {
      reportId
      messageId
      title
      equalifiedCount
      activeCount
      totalCount
      tags
    }
    timeline {
      date
      equalified
      active
      ignored
    }
  }
}
"#;

pub const MESSAGE_COLUMNS: [&str; 4] = ["Message", "Equalified", "Active", "Total"];

#[derive(Serialize)]
struct GraphQlRequest<'a, V> {
    query: &'a str,
    variables: V,
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TagDetailsVariables<'a> {
    tag_id: &'a str,
    report_id: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagDetailsData {
    tag_details: Option<TagDetails>,
}

pub struct ReportsClient {
    http: Client,
    endpoint: Url,
    tag_details: QueryCache<(TagId, ReportId), TagDetails>,
}

impl ReportsClient {
    pub fn new(settings: &ClientSettings) -> ClientResult<Self> {
        Ok(Self::with_client(
            build_http_client(settings)?,
            Url::parse(&settings.graphql_url)?,
        ))
    }

    pub fn with_client(http: Client, endpoint: Url) -> Self {
        Self {
            http,
            endpoint,
            tag_details: QueryCache::new(),
        }
    }

    pub async fn tag_details(
        &self,
        tag_id: &TagId,
        report_id: &ReportId,
    ) -> ClientResult<TagDetails> {
        let key = (tag_id.clone(), report_id.clone());
        self.tag_details
            .ensure_query_data(&key, || self.fetch_tag_details(tag_id, report_id))
            .await
    }

    /// Drops the cached copy so the next read goes back to the server.
    pub async fn invalidate_tag_details(&self, tag_id: &TagId, report_id: &ReportId) -> bool {
        self.tag_details
            .invalidate(&(tag_id.clone(), report_id.clone()))
            .await
    }

    async fn fetch_tag_details(
        &self,
        tag_id: &TagId,
        report_id: &ReportId,
    ) -> ClientResult<TagDetails> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&GraphQlRequest {
                query: TAG_DETAILS_QUERY,
                variables: TagDetailsVariables {
                    tag_id: tag_id.as_str(),
                    report_id: report_id.as_str(),
                },
            })
            .send()
            .await?;
        let body: GraphQlResponse<TagDetailsData> = read_json(response).await?;

        if !body.errors.is_empty() {
            let message = body
                .errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            warn!(tag_id = %tag_id, report_id = %report_id, "reports: graphql errors: {message}");
            return Err(ClientError::GraphQl(message));
        }

        let details = body.data.and_then(|data| data.tag_details).ok_or_else(|| {
            ClientError::GraphQl(format!("tag {tag_id} not found in report {report_id}"))
        })?;
        debug!(
            tag_id = %tag_id,
            report_id = %report_id,
            messages = details.messages.len(),
            "reports: tag details loaded"
        );
        Ok(details)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow {
    pub message_id: MessageId,
    pub title: String,
    pub link: String,
    pub equalified: u64,
    pub active: u64,
    pub total: u64,
}

pub fn message_link(report_id: &ReportId, message_id: MessageId) -> String {
    format!("/reports/{report_id}/messages/{message_id}")
}

pub fn message_rows(report_id: &ReportId, messages: &[Message]) -> Vec<MessageRow> {
    messages
        .iter()
        .map(|message| MessageRow {
            message_id: message.message_id,
            title: message.title.clone(),
            link: message_link(report_id, message.message_id),
            equalified: message.equalified_count,
            active: message.active_count,
            total: message.total_count,
        })
        .collect()
}

/// Everything the tag details page shows, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDetailsView {
    pub meta: PageMeta,
    pub report_name: String,
    pub tag_name: String,
    pub report_link: String,
    pub edit_report_link: String,
    pub timeline: Vec<TimelinePoint>,
    pub rows: Vec<MessageRow>,
}

impl TagDetailsView {
    pub fn new(details: &TagDetails, tag_id: &TagId, report_id: &ReportId) -> Self {
        Self {
            meta: tag_details_meta(Some(details), tag_id, report_id),
            report_name: details.report_name.clone(),
            tag_name: details.tag_name.clone(),
            report_link: format!("/reports/{report_id}"),
            edit_report_link: format!("/reports/{report_id}/edit"),
            timeline: details.timeline.clone(),
            rows: message_rows(report_id, &details.messages),
        }
    }
}

pub fn tag_details_meta(
    details: Option<&TagDetails>,
    tag_id: &TagId,
    report_id: &ReportId,
) -> PageMeta {
    let tag_name = details.map(|d| d.tag_name.as_str()).unwrap_or("Tag");
    PageMeta::new(
        format!("{tag_name} - Tag Details - Equalify"),
        format!(
            "View the details of the {tag_name} tag, including associated messages, on Equalify."
        ),
        &format!("/reports/{report_id}/tags/{tag_id}"),
    )
}

#[cfg(test)]
#[path = "tests/reports_tests.rs"]
mod tests;

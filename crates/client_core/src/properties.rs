use reqwest::Client;
use shared::{
    domain::PropertyId,
    protocol::{MutationResponse, MutationStatus, Property, UpdatePropertyRequest},
};
use tracing::{info, warn};
use url::Url;

use crate::{
    config::{parse_base_url, ClientSettings},
    error::{ClientError, ClientResult},
    events::EventBus,
    page::PageMeta,
    query_cache::{QueryCache, QueryKey},
    transport::{build_http_client, endpoint, expect_success, read_json},
};

pub const PROPERTIES_PATH: &str = "/properties";

pub struct PropertyClient {
    http: Client,
    base: Url,
}

impl PropertyClient {
    pub fn new(settings: &ClientSettings) -> ClientResult<Self> {
        Ok(Self {
            http: build_http_client(settings)?,
            base: parse_base_url(&settings.api_url)?,
        })
    }

    pub fn with_client(http: Client, base: Url) -> Self {
        Self { http, base }
    }

    pub async fn list_properties(&self) -> ClientResult<Vec<Property>> {
        let response = self
            .http
            .get(endpoint(&self.base, "properties")?)
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn get_property(&self, property_id: &PropertyId) -> ClientResult<Property> {
        let response = self
            .http
            .get(endpoint(&self.base, &format!("properties/{property_id}"))?)
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn update_property(
        &self,
        property_id: &PropertyId,
        property_name: &str,
        sitemap_url: &str,
    ) -> ClientResult<MutationResponse> {
        let response = self
            .http
            .put(endpoint(&self.base, &format!("properties/{property_id}"))?)
            .json(&UpdatePropertyRequest {
                property_name: property_name.to_string(),
                sitemap_url: sitemap_url.to_string(),
            })
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn delete_property(&self, property_id: &PropertyId) -> ClientResult<()> {
        let response = self
            .http
            .delete(endpoint(&self.base, &format!("properties/{property_id}"))?)
            .send()
            .await?;
        expect_success(response).await
    }
}

/// Cached property reads, keyed the same way invalidations are named.
#[derive(Default)]
pub struct PropertyQueries {
    list: QueryCache<(), Vec<Property>>,
    by_id: QueryCache<PropertyId, Property>,
}

impl PropertyQueries {
    pub async fn invalidate(&self, key: &QueryKey) -> bool {
        match key {
            QueryKey::Properties => self.list.invalidate(&()).await,
            QueryKey::Property(id) => self.by_id.invalidate(id).await,
        }
    }

    pub async fn cached_property(&self, property_id: &PropertyId) -> Option<Property> {
        self.by_id.get(property_id).await
    }

    pub async fn cached_list(&self) -> Option<Vec<Property>> {
        self.list.get(&()).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyLoaderData {
    pub initial_property: Property,
    pub property_id: PropertyId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyFormData {
    pub property_name: String,
    pub sitemap_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub to: String,
}

/// Loader, update action and delete mutation behind the property pages.
pub struct PropertyPages {
    client: PropertyClient,
    queries: PropertyQueries,
    events: EventBus,
}

impl PropertyPages {
    pub fn new(client: PropertyClient, events: EventBus) -> Self {
        Self {
            client,
            queries: PropertyQueries::default(),
            events,
        }
    }

    pub fn queries(&self) -> &PropertyQueries {
        &self.queries
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub async fn list(&self) -> ClientResult<Vec<Property>> {
        self.queries
            .list
            .ensure_query_data(&(), || self.client.list_properties())
            .await
    }

    pub async fn load(&self, route_id: Option<&str>) -> ClientResult<PropertyLoaderData> {
        let property_id = require_param(
            route_id,
            "Property ID is missing in the route parameters",
        )?;
        let initial_property = self
            .queries
            .by_id
            .ensure_query_data(&property_id, || self.client.get_property(&property_id))
            .await?;
        Ok(PropertyLoaderData {
            initial_property,
            property_id,
        })
    }

    pub async fn update(
        &self,
        route_id: Option<&str>,
        form: &PropertyFormData,
    ) -> ClientResult<Redirect> {
        let property_id = require_param(route_id, "No property ID provided")?;

        let response = match self
            .client
            .update_property(&property_id, &form.property_name, &form.sitemap_url)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(property_id = %property_id, "properties: update failed: {err}");
                self.events
                    .toast_error("An error occurred while updating the property.");
                return Err(err);
            }
        };

        self.queries
            .invalidate(&QueryKey::Property(property_id.clone()))
            .await;
        self.queries.invalidate(&QueryKey::Properties).await;

        if response.status == MutationStatus::Success {
            info!(property_id = %property_id, "properties: updated");
            self.events.toast_success("Property updated successfully!");
            Ok(Redirect {
                to: PROPERTIES_PATH.to_string(),
            })
        } else {
            warn!(
                property_id = %property_id,
                reason = response.message.as_deref().unwrap_or_default(),
                "properties: update rejected"
            );
            self.events.toast_error("Failed to update property.");
            Err(ClientError::UnexpectedStatus {
                status: 500,
                body: "Failed to update property".to_string(),
            })
        }
    }

    pub async fn delete(&self, property_id: &PropertyId) -> ClientResult<()> {
        match self.client.delete_property(property_id).await {
            Ok(()) => {
                info!(property_id = %property_id, "properties: deleted");
                self.queries.invalidate(&QueryKey::Properties).await;
                self.queries
                    .invalidate(&QueryKey::Property(property_id.clone()))
                    .await;
                self.events.toast_success("Property deleted successfully!");
                self.events.navigate(PROPERTIES_PATH);
                Ok(())
            }
            Err(err) => {
                warn!(property_id = %property_id, "properties: delete failed: {err}");
                self.events.toast_error("Failed to delete property.");
                Err(err)
            }
        }
    }
}

fn require_param(value: Option<&str>, message: &'static str) -> ClientResult<PropertyId> {
    match value.map(str::trim) {
        Some(id) if !id.is_empty() => Ok(PropertyId(id.to_string())),
        _ => Err(ClientError::MissingParameter(message)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyField {
    Name,
    SitemapUrl,
}

/// Edit form state: tracks edits against the loaded property and the delete dialog.
#[derive(Debug, Clone)]
pub struct EditPropertyForm {
    original: Property,
    property_name: String,
    sitemap_url: String,
    delete_dialog_open: bool,
}

impl EditPropertyForm {
    pub fn new(original: Property) -> Self {
        Self {
            property_name: original.name.clone(),
            sitemap_url: original.sitemap_url.clone(),
            original,
            delete_dialog_open: false,
        }
    }

    pub fn set_field(&mut self, field: PropertyField, value: impl Into<String>) {
        match field {
            PropertyField::Name => self.property_name = value.into(),
            PropertyField::SitemapUrl => self.sitemap_url = value.into(),
        }
    }

    /// Submit is only offered once a trimmed value differs from what was loaded.
    pub fn is_changed(&self) -> bool {
        self.property_name.trim() != self.original.name.trim()
            || self.sitemap_url.trim() != self.original.sitemap_url.trim()
    }

    pub fn form_data(&self) -> PropertyFormData {
        PropertyFormData {
            property_name: self.property_name.clone(),
            sitemap_url: self.sitemap_url.clone(),
        }
    }

    pub fn property_id(&self) -> &PropertyId {
        &self.original.id
    }

    pub fn open_delete_dialog(&mut self) {
        self.delete_dialog_open = true;
    }

    pub fn close_delete_dialog(&mut self) {
        self.delete_dialog_open = false;
    }

    pub fn is_delete_dialog_open(&self) -> bool {
        self.delete_dialog_open
    }

    /// Closes the dialog; returns whether a deletion was actually being confirmed.
    pub fn confirm_delete(&mut self) -> bool {
        std::mem::replace(&mut self.delete_dialog_open, false)
    }
}

pub fn edit_property_meta(property: Option<&Property>, property_id: &PropertyId) -> PageMeta {
    let name = property.map(|p| p.name.as_str()).filter(|n| !n.is_empty());
    PageMeta::new(
        format!("Edit {} - Equalify", name.unwrap_or("Property")),
        format!(
            "Edit the details of {} on Equalify.",
            name.unwrap_or("this property")
        ),
        &format!("{PROPERTIES_PATH}/{property_id}/edit"),
    )
}

#[cfg(test)]
#[path = "tests/properties_tests.rs"]
mod tests;

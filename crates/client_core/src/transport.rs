//! Shared reqwest plumbing: building the client and mapping API error bodies.

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::error::{ApiError, ApiException};
use tracing::debug;
use url::Url;

use crate::{
    config::ClientSettings,
    error::{ClientError, ClientResult},
};

pub fn build_http_client(settings: &ClientSettings) -> ClientResult<Client> {
    Ok(Client::builder()
        .timeout(settings.request_timeout())
        .build()?)
}

pub(crate) fn endpoint(base: &Url, path: &str) -> ClientResult<Url> {
    Ok(base.join(path.trim_start_matches('/'))?)
}

pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let response = check_status(response).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub(crate) async fn expect_success(response: Response) -> ClientResult<()> {
    check_status(response).await.map(|_| ())
}

async fn check_status(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(err) => {
            debug!(status = status.as_u16(), "transport: error body unreadable: {err}");
            String::new()
        }
    };
    match serde_json::from_str::<ApiError>(&body) {
        Ok(api) => Err(ClientError::Api(ApiException::from(api))),
        Err(_) => Err(ClientError::UnexpectedStatus {
            status: status.as_u16(),
            body,
        }),
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;

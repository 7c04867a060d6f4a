use shared::error::ApiException;
use thiserror::Error;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error: {0}")]
    Api(#[from] ApiException),
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("graphql error: {0}")]
    GraphQl(String),
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("{0}")]
    MissingParameter(&'static str),
}

impl ClientError {
    /// Message suitable for an alert region. API errors show the server's text, or
    /// the code's fallback when the server sent none.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api(api) => api.user_message(),
            ClientError::GraphQl(message) => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn needs_new_code(&self) -> bool {
        matches!(self, ClientError::Api(api) if api.code.needs_new_code())
    }
}

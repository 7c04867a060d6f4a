use async_trait::async_trait;
use reqwest::Client;
use shared::protocol::{
    ConfirmSignUpRequest, ResendSignUpCodeRequest, SignInRequest, SignInResponse, SignUpRequest,
    SignUpResponse,
};
use tokio::sync::watch;
use tracing::{info, warn};
use url::Url;

use crate::{
    config::{parse_base_url, ClientSettings},
    error::{ClientError, ClientResult},
    transport::{build_http_client, endpoint, expect_success, read_json},
};

/// Remote authentication operations the sign-up flows depend on.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> ClientResult<SignUpResponse>;
    async fn sign_in(&self, email: &str, password: &str) -> ClientResult<SignInResponse>;
    async fn confirm_sign_up(&self, request: ConfirmSignUpRequest) -> ClientResult<()>;
    async fn resend_sign_up_code(&self, email: &str) -> ClientResult<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub loading: bool,
    pub error: Option<String>,
}

/// Loading flag and last remote error shared between the auth flows and whoever renders them.
pub struct AuthContext {
    state: watch::Sender<AuthSnapshot>,
}

impl Default for AuthContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthContext {
    pub fn new() -> Self {
        let (state, _) = watch::channel(AuthSnapshot::default());
        Self { state }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    /// Marks a request as outstanding and clears the previous attempt's error.
    pub fn begin(&self) {
        self.state.send_replace(AuthSnapshot {
            loading: true,
            error: None,
        });
    }

    pub fn settle<T>(&self, result: &ClientResult<T>) {
        let error = result.as_ref().err().map(ClientError::user_message);
        self.state.send_replace(AuthSnapshot {
            loading: false,
            error,
        });
    }
}

pub struct HttpAuthService {
    http: Client,
    base: Url,
}

impl HttpAuthService {
    pub fn new(settings: &ClientSettings) -> ClientResult<Self> {
        Ok(Self {
            http: build_http_client(settings)?,
            base: parse_base_url(&settings.api_url)?,
        })
    }

    pub fn with_client(http: Client, base: Url) -> Self {
        Self { http, base }
    }
}

#[async_trait]
impl AuthService for HttpAuthService {
    async fn sign_up(&self, email: &str, password: &str) -> ClientResult<SignUpResponse> {
        let response = self
            .http
            .post(endpoint(&self.base, "auth/sign-up")?)
            .json(&SignUpRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let body: SignUpResponse = read_json(response).await?;
        info!(email, confirmed = body.user_confirmed, "auth: signed up");
        Ok(body)
    }

    async fn sign_in(&self, email: &str, password: &str) -> ClientResult<SignInResponse> {
        let response = self
            .http
            .post(endpoint(&self.base, "auth/sign-in")?)
            .json(&SignInRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let body = read_json(response).await;
        if let Err(err) = &body {
            warn!(email, "auth: sign in failed: {err}");
        }
        body
    }

    async fn confirm_sign_up(&self, request: ConfirmSignUpRequest) -> ClientResult<()> {
        let response = self
            .http
            .post(endpoint(&self.base, "auth/confirm-sign-up")?)
            .json(&request)
            .send()
            .await?;
        expect_success(response).await?;
        info!(username = %request.username, "auth: sign up confirmed");
        Ok(())
    }

    async fn resend_sign_up_code(&self, email: &str) -> ClientResult<()> {
        let response = self
            .http
            .post(endpoint(&self.base, "auth/resend-sign-up-code")?)
            .json(&ResendSignUpCodeRequest {
                email: email.to_string(),
            })
            .send()
            .await?;
        expect_success(response).await?;
        info!(email, "auth: sign up code resent");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/auth_tests.rs"]
mod tests;

//! REST client for the backend API.
//!
//! Implements the application layer's [`AuthApi`] and [`CatalogApi`] traits
//! against the backend over HTTP.
//!
//! # Credential handling
//!
//! There is no ambient "default authorization header".  The bearer token is
//! an explicit argument of the calls that need one (`profile`,
//! `upgrade_subscription`), so a logout simply stops passing it – no global
//! state to scrub, and a logout racing an in-flight request is well-defined.
//!
//! # Error mapping
//!
//! A non-2xx response is decoded as the backend's error payload
//! (`{"detail": "..."}`) and surfaced as [`ApiError::Backend`] with that
//! human-readable message; the session layer forwards it verbatim to the
//! user.  Everything that prevented a response (DNS, refused connection,
//! timeout) becomes [`ApiError::Transport`].

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::debug;

use veil_core::api::{
    ApiError, AuthResponse, CredentialsRequest, ErrorBody, ForgotPasswordRequest,
    ProfileResponse,
};
use veil_core::{ServerEntry, Token};

use crate::application::connection::CatalogApi;
use crate::application::session::AuthApi;

/// Default backend base URL, overridable through `AppConfig`.
pub const DEFAULT_BASE_URL: &str = "https://api.veil.example/api";

/// reqwest-backed client for the backend REST API.
pub struct RestApiClient {
    base_url: String,
    http: Client,
}

impl RestApiClient {
    /// Creates a client against `base_url` (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            http: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Sends the request and decodes the success body as `T`.
    async fn execute_json<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.execute(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Sends the request and maps non-2xx statuses onto [`ApiError::Backend`].
    async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(status = %status, "backend rejected request");
        Err(backend_error(status, &body))
    }
}

/// Builds the [`ApiError::Backend`] for a non-2xx response, mining the
/// FastAPI-style `detail` field when the body carries one.
fn backend_error(status: StatusCode, body: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|e| e.detail)
        .unwrap_or_default();
    ApiError::Backend {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl AuthApi for RestApiClient {
    async fn register(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = CredentialsRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.execute_json(self.http.post(self.url("/auth/register")).json(&body))
            .await
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = CredentialsRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.execute_json(self.http.post(self.url("/auth/login")).json(&body))
            .await
    }

    async fn forgot_password(&self, email: &str) -> Result<(), ApiError> {
        let body = ForgotPasswordRequest {
            email: email.to_string(),
        };
        self.execute(self.http.post(self.url("/auth/forgot-password")).json(&body))
            .await
            .map(|_| ())
    }

    async fn profile(&self, token: &Token) -> Result<ProfileResponse, ApiError> {
        self.execute_json(
            self.http
                .get(self.url("/auth/profile"))
                .bearer_auth(token.as_str()),
        )
        .await
    }

    async fn upgrade_subscription(&self, token: &Token) -> Result<(), ApiError> {
        self.execute(
            self.http
                .post(self.url("/subscription/upgrade"))
                .bearer_auth(token.as_str()),
        )
        .await
        .map(|_| ())
    }
}

#[async_trait]
impl CatalogApi for RestApiClient {
    async fn fetch_servers(&self) -> Result<Vec<ServerEntry>, ApiError> {
        self.execute_json(self.http.get(self.url("/proxies"))).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Wire contracts for the backend REST API.
//!
//! These are the request and response bodies exchanged with the backend:
//!
//! | Call            | Method/Path                   | Body types                               |
//! |-----------------|-------------------------------|------------------------------------------|
//! | Register        | POST /auth/register           | [`CredentialsRequest`] → [`AuthResponse`] |
//! | Login           | POST /auth/login              | [`CredentialsRequest`] → [`AuthResponse`] |
//! | Forgot password | POST /auth/forgot-password    | [`ForgotPasswordRequest`] → 2xx (unused) |
//! | Profile         | GET /auth/profile             | – → [`ProfileResponse`]                  |
//! | Upgrade         | POST /subscription/upgrade    | – → 2xx (body unused)                    |
//! | Catalog         | GET /proxies                  | – → `Vec<ServerEntry>`                   |
//!
//! Only the shapes live here; the HTTP plumbing is an infrastructure concern
//! of the client crate.  Error responses carry an [`ErrorBody`] whose
//! `detail` field holds the human-readable message shown to the user.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::identity::{SubscriptionTier, User};

/// Failure of a backend API call, as seen by the application layer.
///
/// The HTTP adapter in the client crate maps its transport library's errors
/// into these variants, so the application layer never imports the HTTP
/// stack.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The backend answered with a non-2xx status.  `message` is the
    /// human-readable `detail` from the error payload when one was present.
    #[error("backend rejected the request ({status}): {message}")]
    Backend { status: u16, message: String },
    /// The request never produced a response (DNS, connect, timeout, ...).
    #[error("network error: {0}")]
    Transport(String),
    /// The response body could not be decoded as the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// The backend-provided message, if this failure carries one.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            ApiError::Backend { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}

/// Request body for both the register and login endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Request body for the forgot-password endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Success response of the register and login endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user_id: String,
    pub subscription_tier: SubscriptionTier,
}

/// Success response of the profile endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub id: String,
    pub email: String,
    pub subscription_tier: SubscriptionTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_expires_at: Option<String>,
}

impl From<ProfileResponse> for User {
    fn from(p: ProfileResponse) -> Self {
        User {
            id: p.id,
            email: p.email,
            subscription_tier: p.subscription_tier,
            subscription_expires_at: p.subscription_expires_at,
        }
    }
}

/// Error payload returned by the backend on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

//! Backend REST API client.
//!
//! ARCHITECTURE
//! ============
//! [`AuthApi`] is the seam between the session layer and the backend. The
//! production implementation, [`HttpAuthApi`], is a thin `reqwest` wrapper;
//! tests substitute in-memory fakes.
//!
//! ERROR HANDLING
//! ==============
//! Non-2xx responses are read to text and parsed into a [`BackendError`]
//! before being returned, so callers never see raw response bodies.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;

use super::error::{ApiError, BackendError};
use super::types::{
    ApiUser, AuthResponse, ForgotPasswordRequest, LoginRequest, LogoutRequest, MessageResponse,
    PasswordChangeRequest, ProfilePatch, RegisterRequest, ResetPasswordRequest,
};
use crate::config::ClientConfig;

pub const LOGIN_PATH: &str = "/login/";
pub const REGISTER_PATH: &str = "/register/";
pub const LOGOUT_PATH: &str = "/logout/";
pub const PASSWORD_RESET_REQUEST_PATH: &str = "/reset-password-request/";
pub const PASSWORD_RESET_PATH: &str = "/reset-password/";
pub const PROFILE_PATH: &str = "/settings/profile/";
pub const PROFILE_UPDATE_PATH: &str = "/settings/update/";
pub const CHANGE_PASSWORD_PATH: &str = "/settings/change-password/";
pub const DELETE_ACCOUNT_PATH: &str = "/settings/delete/";
pub const EXPORT_PATH: &str = "/settings/export/";

/// Operations the session layer needs from the backend.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError>;

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError>;

    async fn request_password_reset(&self, request: &ForgotPasswordRequest) -> Result<MessageResponse, ApiError>;

    async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<AuthResponse, ApiError>;

    /// Invalidate the refresh token server-side.
    async fn logout(&self, request: &LogoutRequest) -> Result<(), ApiError>;

    async fn fetch_profile(&self, token: &str) -> Result<ApiUser, ApiError>;

    /// Partially update the profile; returns the full profile after the update.
    async fn update_profile(&self, token: &str, patch: &ProfilePatch) -> Result<ApiUser, ApiError>;

    async fn change_password(&self, token: &str, request: &PasswordChangeRequest) -> Result<ApiUser, ApiError>;

    async fn delete_account(&self, token: &str) -> Result<(), ApiError>;

    async fn export_user_data(&self, token: &str) -> Result<serde_json::Value, ApiError>;
}

/// Join the API root and an endpoint path without doubling slashes.
pub(crate) fn endpoint_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

pub(crate) fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// `reqwest`-backed [`AuthApi`].
#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthApi {
    /// Build a client with the configured timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] for a base URL without an http(s)
    /// scheme, or [`ApiError::Network`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        if !(config.api_url.starts_with("http://") || config.api_url.starts_with("https://")) {
            return Err(ApiError::InvalidUrl(config.api_url.clone()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self { client, base_url: config.api_url.trim_end_matches('/').to_owned() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = endpoint_url(&self.base_url, path);
        tracing::debug!(%method, %url, "api request");
        let builder = self.client.request(method, url).header("Accept", "application/json");
        match token {
            Some(token) => builder.header("Authorization", bearer(token)),
            None => builder,
        }
    }
}

async fn read_success(builder: RequestBuilder) -> Result<String, ApiError> {
    let resp = builder.send().await.map_err(|e| ApiError::Network(e.to_string()))?;
    let status = resp.status();
    let body = resp.text().await.map_err(|e| ApiError::Network(e.to_string()))?;
    if !status.is_success() {
        let error = BackendError::parse(&body);
        tracing::warn!(status = status.as_u16(), %error, "api request rejected");
        return Err(ApiError::Status { status: status.as_u16(), error });
    }
    Ok(body)
}

async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ApiError> {
    let body = read_success(builder).await?;
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

async fn send_empty(builder: RequestBuilder) -> Result<(), ApiError> {
    read_success(builder).await.map(|_| ())
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        send_json(self.request(Method::POST, LOGIN_PATH, None).json(request)).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        send_json(self.request(Method::POST, REGISTER_PATH, None).json(request)).await
    }

    async fn request_password_reset(&self, request: &ForgotPasswordRequest) -> Result<MessageResponse, ApiError> {
        send_json(self.request(Method::POST, PASSWORD_RESET_REQUEST_PATH, None).json(request)).await
    }

    async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<AuthResponse, ApiError> {
        send_json(self.request(Method::POST, PASSWORD_RESET_PATH, None).json(request)).await
    }

    async fn logout(&self, request: &LogoutRequest) -> Result<(), ApiError> {
        send_empty(self.request(Method::POST, LOGOUT_PATH, None).json(request)).await
    }

    async fn fetch_profile(&self, token: &str) -> Result<ApiUser, ApiError> {
        send_json(self.request(Method::GET, PROFILE_PATH, Some(token))).await
    }

    async fn update_profile(&self, token: &str, patch: &ProfilePatch) -> Result<ApiUser, ApiError> {
        send_json(self.request(Method::PATCH, PROFILE_UPDATE_PATH, Some(token)).json(patch)).await
    }

    async fn change_password(&self, token: &str, request: &PasswordChangeRequest) -> Result<ApiUser, ApiError> {
        send_json(self.request(Method::PATCH, CHANGE_PASSWORD_PATH, Some(token)).json(request)).await
    }

    async fn delete_account(&self, token: &str) -> Result<(), ApiError> {
        send_empty(self.request(Method::DELETE, DELETE_ACCOUNT_PATH, Some(token))).await
    }

    async fn export_user_data(&self, token: &str) -> Result<serde_json::Value, ApiError> {
        send_json(self.request(Method::GET, EXPORT_PATH, Some(token))).await
    }
}

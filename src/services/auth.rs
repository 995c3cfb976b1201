//! Login, registration, password and account flows.
//!
//! ARCHITECTURE
//! ============
//! [`AuthFlows`] validates form input locally, calls the backend through
//! [`AuthApi`], and hands every session-bearing response to the
//! [`SessionCoordinator`]. It holds no state of its own.
//!
//! ERROR HANDLING
//! ==============
//! Local validation failures never reach the network. Backend failures are
//! returned as [`FlowError::Api`] with the parsed error body; nothing is
//! retried.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::sync::Arc;

use crate::net::api::AuthApi;
use crate::net::error::ApiError;
use crate::net::types::{
    AuthResponse, ForgotPasswordRequest, LoginRequest, LogoutRequest, PasswordChangeRequest, ProfilePatch,
    RegisterRequest, ResetPasswordRequest, UserProfile,
};
use crate::state::session::{ProfileUpdate, SessionCoordinator};

pub const MIN_PASSWORD_LEN: usize = 8;
const PASSWORD_SPECIALS: &str = "@$!%*?&";

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("{message}")]
    Validation { field: Option<&'static str>, message: String },
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl FlowError {
    fn invalid(field: &'static str, message: &str) -> Self {
        Self::Validation { field: Some(field), message: message.to_owned() }
    }

    /// Message for the form, local or backend.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message, .. } => message.clone(),
            Self::Api(e) => e.user_message(),
        }
    }

    /// Form field the error belongs to, when known.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => *field,
            Self::Api(e) => e.backend().and_then(|b| b.field()),
        }
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Mirror of the signup form's `local@domain.tld` check.
///
/// # Errors
///
/// Returns a validation error for empty or malformed addresses.
pub fn validate_email(email: &str) -> Result<(), FlowError> {
    if email.is_empty() {
        return Err(FlowError::invalid("email", "Email is required"));
    }
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        let clean = |s: &str| !s.is_empty() && !s.contains('@') && !s.chars().any(char::is_whitespace);
        clean(local)
            && clean(domain)
            && domain
                .char_indices()
                .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
    });
    if !valid {
        return Err(FlowError::invalid(
            "email",
            "Please enter a valid email address (e.g., user@example.com)",
        ));
    }
    Ok(())
}

/// Length check for every password form; `strict` adds the signup
/// character-class rules.
///
/// # Errors
///
/// Returns a validation error naming the first rule the password breaks.
pub fn validate_password(password: &str, strict: bool) -> Result<(), FlowError> {
    if password.is_empty() {
        return Err(FlowError::invalid("password", "Password is required"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(FlowError::invalid("password", "Password must be at least 8 characters long"));
    }
    if strict {
        let lower = password.chars().any(|c| c.is_ascii_lowercase());
        let upper = password.chars().any(|c| c.is_ascii_uppercase());
        let digit = password.chars().any(|c| c.is_ascii_digit());
        let special = password.chars().any(|c| PASSWORD_SPECIALS.contains(c));
        if !(lower && upper && digit && special) {
            return Err(FlowError::invalid(
                "password",
                "Password must contain at least one uppercase letter, one lowercase letter, one number, and one special character (@$!%*?&)",
            ));
        }
    }
    Ok(())
}

/// # Errors
///
/// Returns a validation error if the confirmation is empty or differs.
pub fn validate_confirmation(password: &str, confirmation: &str) -> Result<(), FlowError> {
    if confirmation.is_empty() {
        return Err(FlowError::invalid("confirm_password", "Please confirm your password"));
    }
    if password != confirmation {
        return Err(FlowError::invalid("confirm_password", "Passwords do not match"));
    }
    Ok(())
}

/// Username derived from the email's local part.
#[must_use]
pub fn username_from_email(email: &str) -> String {
    email.split('@').next().unwrap_or_default().to_owned()
}

// =============================================================================
// FLOWS
// =============================================================================

/// Signup form contents.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    /// Defaults to the email's local part when empty.
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Clone)]
pub struct AuthFlows {
    api: Arc<dyn AuthApi>,
    session: SessionCoordinator,
}

impl AuthFlows {
    #[must_use]
    pub fn new(api: Arc<dyn AuthApi>, session: SessionCoordinator) -> Self {
        Self { api, session }
    }

    #[must_use]
    pub fn session(&self) -> &SessionCoordinator {
        &self.session
    }

    /// Sign in with email and password and start a session.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad input or the backend rejection.
    pub async fn login_with_password(&self, email: &str, password: &str) -> Result<UserProfile, FlowError> {
        validate_email(email)?;
        validate_password(password, false)?;
        let request = LoginRequest { email: email.to_owned(), password: password.to_owned() };
        let response = self.api.login(&request).await?;
        Ok(self.start_session(response, email))
    }

    /// Create an account; the backend signs the new user in directly.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad input or the backend rejection.
    pub async fn register(&self, form: &RegistrationForm) -> Result<UserProfile, FlowError> {
        validate_email(&form.email)?;
        validate_password(&form.password, true)?;
        validate_confirmation(&form.password, &form.confirm_password)?;
        let username = if form.username.trim().is_empty() {
            username_from_email(&form.email)
        } else {
            form.username.trim().to_owned()
        };
        let request = RegisterRequest {
            email: form.email.clone(),
            password: form.password.clone(),
            confirm_password: form.confirm_password.clone(),
            username,
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
        };
        let response = self.api.register(&request).await?;
        Ok(self.start_session(response, &form.email))
    }

    /// Ask the backend to email a reset link. Returns the server's message.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad address or the backend rejection.
    pub async fn forgot_password(&self, email: &str) -> Result<Option<String>, FlowError> {
        validate_email(email)?;
        let response = self
            .api
            .request_password_reset(&ForgotPasswordRequest { email: email.to_owned() })
            .await?;
        Ok(response.message.or(response.detail))
    }

    /// Confirm a reset link and sign in with the new password.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad input or the backend rejection; use
    /// [`ApiError::reset_password_message`] for the latter.
    pub async fn reset_password(
        &self,
        uid: &str,
        token: &str,
        new_password: &str,
        confirmation: &str,
    ) -> Result<UserProfile, FlowError> {
        if new_password.is_empty() || confirmation.is_empty() {
            return Err(FlowError::invalid("new_password", "Both password fields are required"));
        }
        if new_password != confirmation {
            return Err(FlowError::invalid("confirm_password", "Passwords do not match"));
        }
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(FlowError::invalid("new_password", "Password must be at least 8 characters"));
        }
        let request = ResetPasswordRequest {
            uid: uid.to_owned(),
            token: token.to_owned(),
            new_password: new_password.to_owned(),
        };
        let response = self.api.reset_password(&request).await?;
        Ok(self.start_session(response, ""))
    }

    /// End the session locally, then tell the backend to drop the refresh token.
    ///
    /// The local logout always happens first; a backend failure is logged
    /// and otherwise ignored.
    pub async fn logout(&self) {
        let refresh = self.session.refresh_token();
        self.session.logout();
        let Some(refresh) = refresh else {
            tracing::debug!("no refresh token; skipping backend logout");
            return;
        };
        if let Err(e) = self.api.logout(&LogoutRequest { refresh }).await {
            tracing::warn!(error = %e, "backend logout failed");
        }
    }

    /// # Errors
    ///
    /// Returns the backend or network error.
    pub async fn update_profile(&self, patch: &ProfilePatch) -> Result<ProfileUpdate, FlowError> {
        Ok(self.session.update_user_profile(patch).await?)
    }

    /// # Errors
    ///
    /// Returns the backend or network error.
    pub async fn refresh_profile(&self) -> Result<ProfileUpdate, FlowError> {
        Ok(self.session.refresh_profile().await?)
    }

    /// Change the password of the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns a validation error, [`ApiError::MissingToken`] when signed out,
    /// or the backend rejection.
    pub async fn change_password(&self, current: &str, new: &str, confirmation: &str) -> Result<(), FlowError> {
        if current.is_empty() {
            return Err(FlowError::invalid("current_password", "Current password is required"));
        }
        validate_password(new, false)?;
        validate_confirmation(new, confirmation)?;
        let token = self.require_token()?;
        let request = PasswordChangeRequest {
            current_password: current.to_owned(),
            new_password: new.to_owned(),
            confirm_password: confirmation.to_owned(),
        };
        self.api.change_password(&token, &request).await?;
        tracing::info!("password changed");
        Ok(())
    }

    /// Delete the account, then end the session.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::MissingToken`] when signed out or the backend
    /// rejection; the session is kept on failure.
    pub async fn delete_account(&self) -> Result<(), FlowError> {
        let token = self.require_token()?;
        self.api.delete_account(&token).await?;
        tracing::info!("account deleted");
        self.logout().await;
        Ok(())
    }

    /// Download everything the backend stores about the user.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::MissingToken`] when signed out or the backend
    /// rejection.
    pub async fn export_user_data(&self) -> Result<serde_json::Value, FlowError> {
        let token = self.require_token()?;
        Ok(self.api.export_user_data(&token).await?)
    }

    fn require_token(&self) -> Result<String, FlowError> {
        self.session.auth_token().ok_or_else(|| {
            tracing::warn!("no access token for authenticated request");
            FlowError::Api(ApiError::MissingToken)
        })
    }

    fn start_session(&self, response: AuthResponse, email: &str) -> UserProfile {
        let mut profile = UserProfile::from(response.user);
        if profile.email.is_none() && !email.is_empty() {
            profile.email = Some(email.to_owned());
        }
        if profile.username.is_none() && !email.is_empty() {
            profile.username = Some(username_from_email(email));
        }
        self.session
            .login_with_refresh(response.access, profile.clone(), response.refresh);
        profile
    }
}

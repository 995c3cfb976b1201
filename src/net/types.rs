//! DTOs for the backend REST API and the cached user profile.
//!
//! DESIGN
//! ======
//! The backend speaks snake_case (`first_name`, `activity_level`) while the
//! persisted profile keeps the camelCase layout older clients wrote to
//! storage (`firstName`, `activityLevel`). [`ApiUser`] is the wire shape and
//! converts into [`UserProfile`]; nothing else crosses that boundary.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Deserializer, Serialize};

/// Cached snapshot of the signed-in user's profile.
///
/// Every field is optional: older clients stored partial profiles and the
/// password-reset endpoint only returns identity fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_opt_id")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Body weight in kilograms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Height in centimeters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    /// `sedentary`, `light`, `moderate`, `active` or `very-active`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_goal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wants_newsletter: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub climate: Option<String>,
    /// Daily water goal in liters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_water_goal: Option<f64>,
}

impl UserProfile {
    /// Profile carrying only a username, the minimum a login screen knows.
    #[must_use]
    pub fn with_username(username: impl Into<String>) -> Self {
        Self { username: Some(username.into()), ..Self::default() }
    }

    /// Overlay every field present in `update`; absent fields keep the cached value.
    pub fn merge(&mut self, update: UserProfile) {
        fn overlay<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }
        overlay(&mut self.id, update.id);
        overlay(&mut self.username, update.username);
        overlay(&mut self.email, update.email);
        overlay(&mut self.first_name, update.first_name);
        overlay(&mut self.last_name, update.last_name);
        overlay(&mut self.weight, update.weight);
        overlay(&mut self.height, update.height);
        overlay(&mut self.gender, update.gender);
        overlay(&mut self.age, update.age);
        overlay(&mut self.activity_level, update.activity_level);
        overlay(&mut self.health_goal, update.health_goal);
        overlay(&mut self.wants_newsletter, update.wants_newsletter);
        overlay(&mut self.climate, update.climate);
        overlay(&mut self.daily_water_goal, update.daily_water_goal);
    }

    /// Best available display name: first/last name, then username, then email.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !full.is_empty() {
            return Some(full);
        }
        self.username
            .clone()
            .filter(|name| !name.is_empty())
            .or_else(|| self.email.clone())
    }
}

/// User object as returned by the auth and settings endpoints.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiUser {
    #[serde(deserialize_with = "deserialize_opt_id")]
    pub id: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub activity_level: Option<String>,
    pub health_goal: Option<String>,
    pub wants_newsletter: Option<bool>,
}

impl From<ApiUser> for UserProfile {
    fn from(user: ApiUser) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            weight: user.weight,
            height: user.height,
            gender: user.gender.filter(|g| !g.is_empty()),
            age: user.age,
            activity_level: user.activity_level.filter(|a| !a.is_empty()),
            health_goal: user.health_goal.filter(|h| !h.is_empty()),
            wants_newsletter: user.wants_newsletter,
            climate: None,
            daily_water_goal: None,
        }
    }
}

/// Session-bearing success payload from login, register and password reset.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AuthResponse {
    /// Bearer access token.
    pub access: String,
    /// Refresh token, used only to invalidate the session on logout.
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub user: ApiUser,
    #[serde(default)]
    pub message: Option<String>,
}

/// Plain `{ "message": ... }` acknowledgement.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MessageResponse {
    pub message: Option<String>,
    pub detail: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResetPasswordRequest {
    pub uid: String,
    pub token: String,
    pub new_password: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LogoutRequest {
    pub refresh: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PasswordChangeRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Partial profile update; only present fields are sent.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_goal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wants_newsletter: Option<bool>,
}

impl ProfilePatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Accept ids as JSON numbers (backend primary keys) or strings (older caches).
fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!("expected string or number id, got {other}"))),
    }
}

//! Core domain types and wire payloads for the Identifo API.

use serde::{Deserialize, Serialize};

/// The authenticated end user as the client tracks them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifoUser {
    pub id: String,
    pub username: String,
    pub is_anonymous: bool,
}

/// Single source of truth for "is the user logged in".
///
/// Exactly one value is current at any time; it transitions to
/// `Authenticated` only through the session manager's token-commit step and
/// to `Deauthenticated` only through its token-clear step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Authenticated {
        user: Option<IdentifoUser>,
        access_token: Option<String>,
    },
    Deauthenticated,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated { .. })
    }
}

// =============================================================================
// Wire payloads
// =============================================================================

/// User payload as the identity service returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPayload {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub anonymous: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user: UserPayload,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: UserPayload,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoneLoginRequest {
    pub phone_number: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoneLoginResponse {
    pub user: UserPayload,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederatedLoginRequest {
    /// Third-party provider name, e.g. "google" or "facebook".
    pub provider: String,
    /// Token issued by the provider, exchanged for an Identifo session.
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederatedLoginResponse {
    pub user: UserPayload,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestPhoneCodeRequest {
    pub phone_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestPhoneCodeResponse {
    #[serde(default)]
    pub result: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordResponse {
    #[serde(default)]
    pub result: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeanonymizeRequest {
    pub old_username: String,
    pub old_password: String,
    pub new_username: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeanonymizeResponse {
    /// The renamed user. Deanonymize does not re-issue tokens; the session
    /// manager treats it as a pass-through.
    #[serde(default)]
    pub user: Option<UserPayload>,
}

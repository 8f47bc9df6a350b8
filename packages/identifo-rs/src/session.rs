//! The authentication session manager.
//!
//! Orchestrates every auth flow against the query gateway, owns the token and
//! user stores, and publishes the single authoritative [`AuthState`].
//!
//! # Ordering
//!
//! Within one operation the steps run strictly request → response →
//! persistence → publish. Persistence precedes publish, so no observer ever
//! sees an `Authenticated` state whose tokens are not yet durable. A failed
//! operation performs no persistence and no publish.
//!
//! # Concurrency
//!
//! Session-mutating operations (register, the three login flavors, logout)
//! serialize on one in-flight lock held for the operation's full duration, so
//! a stale login can never land after a logout and silently re-authenticate
//! the user. Side-flow calls (request_phone_code, reset_password,
//! deanonymize) never touch state and run without the lock.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::config::IdentifoConfig;
use crate::error::Result;
use crate::gateway::{HttpQueryGateway, QueryGateway};
use crate::state::AuthStateStream;
use crate::storage::{FileTokenStore, FileUserStore, TokenStore, UserStore};
use crate::token::{AccessToken, RefreshToken, Tokens};
use crate::types::{
    AuthState, DeanonymizeRequest, DeanonymizeResponse, FederatedLoginRequest,
    FederatedLoginResponse, IdentifoUser, LoginRequest, LoginResponse, PhoneLoginRequest,
    PhoneLoginResponse, RegisterRequest, RegisterResponse, RequestPhoneCodeRequest,
    RequestPhoneCodeResponse, ResetPasswordRequest, ResetPasswordResponse,
};

/// Authentication session manager for one Identifo application.
///
/// Owns the token and user stores (nothing else writes to them) and the
/// auth state stream (nothing else publishes to it).
pub struct IdentifoAuth {
    gateway: Arc<dyn QueryGateway>,
    token_store: Arc<dyn TokenStore>,
    user_store: Arc<dyn UserStore>,
    auth_state: AuthStateStream,
    in_flight: Mutex<()>,
}

impl IdentifoAuth {
    /// Build a session manager from explicit collaborators.
    ///
    /// The initial state is reconstructed from the stores once: a missing or
    /// expired refresh token means `Deauthenticated`; otherwise the stored
    /// user and access token are republished as-is. The access token is not
    /// validated here — it may be stale, and the server stays the authority.
    pub fn new(
        gateway: Arc<dyn QueryGateway>,
        token_store: Arc<dyn TokenStore>,
        user_store: Arc<dyn UserStore>,
    ) -> Self {
        let initial = initial_auth_state(token_store.as_ref(), user_store.as_ref());
        Self {
            gateway,
            token_store,
            user_store,
            auth_state: AuthStateStream::new(initial),
            in_flight: Mutex::new(()),
        }
    }

    /// Composition root for the common case: HTTP gateway plus file stores
    /// under the configured storage directory.
    pub fn connect(config: IdentifoConfig) -> Self {
        let gateway = HttpQueryGateway::new(config.base_url, config.app_id, config.secret);
        Self::new(
            Arc::new(gateway),
            Arc::new(FileTokenStore::new(&config.storage_dir)),
            Arc::new(FileUserStore::new(&config.storage_dir)),
        )
    }

    /// Observable authentication state: current value plus subscriptions.
    pub fn auth_state(&self) -> &AuthStateStream {
        &self.auth_state
    }

    /// Register a new account. On success the returned session is committed
    /// and the state stream publishes `Authenticated`.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        anonymous: bool,
    ) -> Result<RegisterResponse> {
        let _in_flight = self.in_flight.lock().await;
        let request = RegisterRequest {
            username: username.to_string(),
            password: password.to_string(),
            anonymous,
        };
        let response = self.gateway.register(&request).await?;
        let user = IdentifoUser {
            id: response.user.id.clone(),
            username: response.user.username.clone(),
            is_anonymous: anonymous,
        };
        self.save_tokens(&response.access_token, &response.refresh_token, Some(user))?;
        Ok(response)
    }

    /// Log in with username and password.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let _in_flight = self.in_flight.lock().await;
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self.gateway.login(&request).await?;
        let user = IdentifoUser {
            id: response.user.id.clone(),
            username: response.user.username.clone(),
            is_anonymous: false,
        };
        self.save_tokens(&response.access_token, &response.refresh_token, Some(user))?;
        Ok(response)
    }

    /// Log in with a phone number and a previously requested one-time code.
    pub async fn phone_login(&self, phone_number: &str, code: &str) -> Result<PhoneLoginResponse> {
        let _in_flight = self.in_flight.lock().await;
        let request = PhoneLoginRequest {
            phone_number: phone_number.to_string(),
            code: code.to_string(),
        };
        let response = self.gateway.phone_login(&request).await?;
        let user = IdentifoUser {
            id: response.user.id.clone(),
            username: response.user.username.clone(),
            is_anonymous: false,
        };
        self.save_tokens(&response.access_token, &response.refresh_token, Some(user))?;
        Ok(response)
    }

    /// Log in through a federated identity provider, exchanging the
    /// provider's token for an Identifo session.
    pub async fn federated_login(
        &self,
        provider: &str,
        token: &str,
    ) -> Result<FederatedLoginResponse> {
        let _in_flight = self.in_flight.lock().await;
        let request = FederatedLoginRequest {
            provider: provider.to_string(),
            access_token: token.to_string(),
        };
        let response = self.gateway.federated_login(&request).await?;
        let user = IdentifoUser {
            id: response.user.id.clone(),
            username: response.user.username.clone(),
            is_anonymous: false,
        };
        self.save_tokens(&response.access_token, &response.refresh_token, Some(user))?;
        Ok(response)
    }

    /// Ask the service to send a one-time code to the given phone number.
    /// Pass-through: no state mutation regardless of outcome.
    pub async fn request_phone_code(&self, phone_number: &str) -> Result<RequestPhoneCodeResponse> {
        let request = RequestPhoneCodeRequest {
            phone_number: phone_number.to_string(),
        };
        self.gateway.request_phone_code(&request).await
    }

    /// Ask the service to send a password reset email.
    /// Pass-through: no state mutation regardless of outcome.
    pub async fn reset_password(&self, email: &str) -> Result<ResetPasswordResponse> {
        let request = ResetPasswordRequest {
            email: email.to_string(),
        };
        self.gateway.reset_password(&request).await
    }

    /// Convert an anonymous account into a named one.
    ///
    /// Pass-through: the renamed account is NOT logged in automatically and
    /// neither the stores nor the state stream change. Callers who want the
    /// new identity live must follow up with [`login`](Self::login).
    pub async fn deanonymize(
        &self,
        old_username: &str,
        old_password: &str,
        new_username: &str,
        new_password: &str,
    ) -> Result<DeanonymizeResponse> {
        let request = DeanonymizeRequest {
            old_username: old_username.to_string(),
            old_password: old_password.to_string(),
            new_username: new_username.to_string(),
            new_password: new_password.to_string(),
        };
        self.gateway.deanonymize(&request).await
    }

    /// Log out server-side, then tear down the local session.
    ///
    /// If the remote call fails the local session stays intact — the client
    /// remains authenticated until the server confirms the logout, so no
    /// session is orphaned server-side while forgotten locally.
    pub async fn logout(&self) -> Result<()> {
        let _in_flight = self.in_flight.lock().await;
        let access = self.token_store.tokens().access;
        self.gateway
            .logout(access.as_ref().map(AccessToken::encoded))
            .await?;
        self.clear_tokens()?;
        Ok(())
    }

    /// Token-commit step: persist tokens and user, then publish
    /// `Authenticated`. The only path into the authenticated state.
    fn save_tokens(&self, access: &str, refresh: &str, user: Option<IdentifoUser>) -> Result<()> {
        let user = user.or_else(|| self.user_store.user());
        let tokens = Tokens {
            access: Some(AccessToken::new(access)),
            refresh: Some(RefreshToken::from_encoded(refresh)),
        };
        self.token_store.set_tokens(&tokens)?;
        if let Some(user) = &user {
            self.user_store.set_user(user)?;
        }
        self.auth_state.publish(AuthState::Authenticated {
            user,
            access_token: Some(access.to_string()),
        });
        debug!("session committed");
        Ok(())
    }

    /// Token-clear step: wipe both stores, then publish `Deauthenticated`.
    fn clear_tokens(&self) -> Result<()> {
        self.token_store.clear()?;
        self.user_store.clear()?;
        self.auth_state.publish(AuthState::Deauthenticated);
        debug!("session cleared");
        Ok(())
    }
}

/// Reconstruct the state persisted by a previous process, applying the
/// refresh expiry rule.
fn initial_auth_state(token_store: &dyn TokenStore, user_store: &dyn UserStore) -> AuthState {
    let tokens = token_store.tokens();
    let refresh_live = tokens
        .refresh
        .as_ref()
        .map(|refresh| !refresh.is_expired())
        .unwrap_or(false);
    if !refresh_live {
        return AuthState::Deauthenticated;
    }
    AuthState::Authenticated {
        user: user_store.user(),
        access_token: tokens.access.map(|access| access.encoded().to_string()),
    }
}

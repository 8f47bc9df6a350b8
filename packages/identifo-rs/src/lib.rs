//! Rust client SDK for the Identifo identity provider.
//!
//! Offers username/password, phone-OTP, federated (social), and
//! anonymous-to-named ("deanonymize") login flows, persists session tokens
//! durably, and exposes an observable authentication state with a single
//! current value.
//!
//! # Example
//!
//! ```rust,ignore
//! use identifo::{IdentifoAuth, IdentifoConfig};
//!
//! let auth = IdentifoAuth::connect(IdentifoConfig::from_env()?);
//!
//! // Observe the authentication state; the current value arrives first.
//! let mut states = auth.auth_state().subscribe();
//! tokio::spawn(async move {
//!     while let Some(state) = states.next().await {
//!         println!("auth state: {state:?}");
//!     }
//! });
//!
//! auth.login("alice", "correct horse").await?;
//! auth.logout().await?;
//! ```
//!
//! # Architecture
//!
//! - [`session::IdentifoAuth`] — the session manager. Orchestrates each auth
//!   flow, owns the stores, publishes the state. The only writer of either.
//! - [`gateway::QueryGateway`] — one request/response call per auth
//!   operation; [`gateway::HttpQueryGateway`] is the REST implementation.
//! - [`storage`] — durable token/user persistence behind small sync traits.
//! - [`state::AuthStateStream`] — single-slot broadcast of the current
//!   [`types::AuthState`]; late subscribers receive the current value
//!   immediately.

pub mod config;
pub mod error;
pub mod gateway;
pub mod session;
pub mod state;
pub mod storage;
pub mod token;
pub mod types;

pub use config::IdentifoConfig;
pub use error::{ErrorResponse, Result, StorageError};
pub use gateway::{HttpQueryGateway, QueryGateway};
pub use session::IdentifoAuth;
pub use state::{AuthStateStream, AuthStateSubscription};
pub use storage::{FileTokenStore, FileUserStore, TokenStore, UserStore};
pub use token::{AccessToken, RefreshToken, Tokens};
pub use types::*;

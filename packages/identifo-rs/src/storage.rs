//! Durable persistence of session tokens and the last-known user profile.
//!
//! Stores are synchronous, local, and exclusively owned by the session
//! manager — nothing else writes to them. Reads never fail: a missing or
//! unreadable record is indistinguishable from "nothing persisted".
//!
//! The file-backed implementations write a temp file and rename it into
//! place, so a crash mid-write never leaves a half-written record.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::token::{AccessToken, RefreshToken, Tokens};
use crate::types::IdentifoUser;

/// Durable store for the session token pair.
pub trait TokenStore: Send + Sync {
    /// The current token pair. Empty when nothing is persisted.
    fn tokens(&self) -> Tokens;

    /// Overwrite the stored pair. Durable before return.
    fn set_tokens(&self, tokens: &Tokens) -> Result<(), StorageError>;

    /// Remove all persisted token data. Durable before return.
    fn clear(&self) -> Result<(), StorageError>;
}

/// Durable store for the last-known authenticated user profile.
pub trait UserStore: Send + Sync {
    fn user(&self) -> Option<IdentifoUser>;

    /// Overwrite the stored profile. Durable before return.
    fn set_user(&self, user: &IdentifoUser) -> Result<(), StorageError>;

    fn clear(&self) -> Result<(), StorageError>;
}

/// On-disk token record. The refresh expiry is denormalized so reloading
/// does not depend on re-decoding the token.
#[derive(Debug, Default, Serialize, Deserialize)]
struct TokenRecord {
    access_token: Option<String>,
    refresh_token: Option<String>,
    /// Unix seconds.
    refresh_expiry: Option<i64>,
}

/// Token store backed by a JSON file (`tokens.json` under the given directory).
pub struct FileTokenStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join("tokens.json"),
            write_lock: Mutex::new(()),
        }
    }
}

impl TokenStore for FileTokenStore {
    fn tokens(&self) -> Tokens {
        let record: TokenRecord = match read_record(&self.path) {
            Some(record) => record,
            None => return Tokens::default(),
        };
        let expires_at = record
            .refresh_expiry
            .and_then(|seconds| Utc.timestamp_opt(seconds, 0).single());
        Tokens {
            access: record.access_token.map(AccessToken::new),
            refresh: record
                .refresh_token
                .map(|encoded| RefreshToken::with_expiry(encoded, expires_at)),
        }
    }

    fn set_tokens(&self, tokens: &Tokens) -> Result<(), StorageError> {
        let record = TokenRecord {
            access_token: tokens.access.as_ref().map(|t| t.encoded().to_string()),
            refresh_token: tokens.refresh.as_ref().map(|t| t.encoded().to_string()),
            refresh_expiry: tokens
                .refresh
                .as_ref()
                .and_then(|t| t.expires_at())
                .map(|t| t.timestamp()),
        };
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        write_record(&self.path, &record)
    }

    fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        remove_record(&self.path)
    }
}

/// User store backed by a JSON file (`user.json` under the given directory).
pub struct FileUserStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileUserStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join("user.json"),
            write_lock: Mutex::new(()),
        }
    }
}

impl UserStore for FileUserStore {
    fn user(&self) -> Option<IdentifoUser> {
        read_record(&self.path)
    }

    fn set_user(&self, user: &IdentifoUser) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        write_record(&self.path, user)
    }

    fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        remove_record(&self.path)
    }
}

fn read_record<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = fs::read(path).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn write_record<T: Serialize>(path: &Path, record: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let bytes = serde_json::to_vec_pretty(record)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn remove_record(path: &Path) -> Result<(), StorageError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(any(test, feature = "testing"))]
pub use testing::{MemoryTokenStore, MemoryUserStore};

/// In-memory stores for exercising the session manager without disk.
#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use super::*;

    #[derive(Default)]
    pub struct MemoryTokenStore {
        inner: Mutex<Tokens>,
    }

    impl TokenStore for MemoryTokenStore {
        fn tokens(&self) -> Tokens {
            self.inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        fn set_tokens(&self, tokens: &Tokens) -> Result<(), StorageError> {
            *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = tokens.clone();
            Ok(())
        }

        fn clear(&self) -> Result<(), StorageError> {
            *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = Tokens::default();
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct MemoryUserStore {
        inner: Mutex<Option<IdentifoUser>>,
    }

    impl UserStore for MemoryUserStore {
        fn user(&self) -> Option<IdentifoUser> {
            self.inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        fn set_user(&self, user: &IdentifoUser) -> Result<(), StorageError> {
            *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = Some(user.clone());
            Ok(())
        }

        fn clear(&self) -> Result<(), StorageError> {
            *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = None;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_tokens() -> Tokens {
        Tokens {
            access: Some(AccessToken::new("AT1")),
            refresh: Some(RefreshToken::with_expiry(
                "RT1",
                Some(Utc::now() + Duration::days(7)),
            )),
        }
    }

    fn sample_user() -> IdentifoUser {
        IdentifoUser {
            id: "u1".to_string(),
            username: "alice".to_string(),
            is_anonymous: false,
        }
    }

    #[test]
    fn test_token_store_empty_when_nothing_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());

        assert!(store.tokens().is_empty());
    }

    #[test]
    fn test_token_store_roundtrip_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let tokens = sample_tokens();

        FileTokenStore::new(dir.path()).set_tokens(&tokens).unwrap();

        // A fresh instance reads what the first one wrote.
        let reloaded = FileTokenStore::new(dir.path()).tokens();
        assert_eq!(reloaded.access.as_ref().unwrap().encoded(), "AT1");
        let refresh = reloaded.refresh.unwrap();
        assert_eq!(refresh.encoded(), "RT1");
        assert!(!refresh.is_expired());
    }

    #[test]
    fn test_token_store_clear_is_durable() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());
        store.set_tokens(&sample_tokens()).unwrap();

        store.clear().unwrap();

        assert!(store.tokens().is_empty());
        assert!(FileTokenStore::new(dir.path()).tokens().is_empty());
    }

    #[test]
    fn test_clear_without_record_is_ok() {
        let dir = tempfile::tempdir().unwrap();

        FileTokenStore::new(dir.path()).clear().unwrap();
        FileUserStore::new(dir.path()).clear().unwrap();
    }

    #[test]
    fn test_corrupt_record_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("tokens.json"), b"{not json").unwrap();
        fs::write(dir.path().join("user.json"), b"{not json").unwrap();

        assert!(FileTokenStore::new(dir.path()).tokens().is_empty());
        assert!(FileUserStore::new(dir.path()).user().is_none());
    }

    #[test]
    fn test_user_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileUserStore::new(dir.path());

        store.set_user(&sample_user()).unwrap();
        assert_eq!(store.user().unwrap(), sample_user());

        store.clear().unwrap();
        assert!(store.user().is_none());
    }

    #[test]
    fn test_set_tokens_overwrites_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());
        store.set_tokens(&sample_tokens()).unwrap();

        let replacement = Tokens {
            access: None,
            refresh: Some(RefreshToken::with_expiry("RT2", None)),
        };
        store.set_tokens(&replacement).unwrap();

        let reloaded = store.tokens();
        assert!(reloaded.access.is_none());
        assert_eq!(reloaded.refresh.unwrap().encoded(), "RT2");
    }

    #[test]
    fn test_memory_stores_roundtrip() {
        let tokens = MemoryTokenStore::default();
        let sample = sample_tokens();
        tokens.set_tokens(&sample).unwrap();
        assert_eq!(tokens.tokens(), sample);
        tokens.clear().unwrap();
        assert!(tokens.tokens().is_empty());

        let users = MemoryUserStore::default();
        users.set_user(&sample_user()).unwrap();
        assert_eq!(users.user().unwrap(), sample_user());
        users.clear().unwrap();
        assert!(users.user().is_none());
    }
}

use crate::{Error, ErrorContext, Result};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Key holding the bearer credential.
pub const TOKEN_KEY: &str = "token";
/// Key holding the cached user profile JSON.
pub const USER_KEY: &str = "user";

/// Key/value storage for session credentials.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn name(&self) -> &'static str;

    fn token(&self) -> Option<String> {
        self.get(TOKEN_KEY).filter(|t| !t.trim().is_empty())
    }

    fn set_token(&self, token: &str) -> Result<()> {
        self.set(TOKEN_KEY, token)
    }

    /// Drop both the token and the cached profile.
    fn clear_session(&self) -> Result<()> {
        self.remove(TOKEN_KEY)?;
        self.remove(USER_KEY)
    }
}

/// Process-local store; lives as long as the client.
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store
            .values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TOKEN_KEY.to_string(), token.into());
        store
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Store backed by the OS keyring, one entry per key under a shared service name.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, key).map_err(|e| Self::keyring_error(key, e))
    }

    fn keyring_error(key: &str, e: keyring::Error) -> Error {
        Error::runtime_with_context(
            "keyring access failed",
            ErrorContext::new()
                .with_field_path(key)
                .with_details(e.to_string())
                .with_source("keyring_store"),
        )
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new("classdesk")
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entry(key).ok()?.get_password().ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .map_err(|e| Self::keyring_error(key, e))
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Self::keyring_error(key, e)),
        }
    }

    fn name(&self) -> &'static str {
        "keyring"
    }
}

//! Token Store
//!
//! Pluggable credential persistence. Embedding applications bring their own
//! store (database, distributed cache); the in-memory implementation is for
//! development and tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::warn;

use crate::error::{StorageError, WechatResult};
use crate::types::Credential;

/// Store key for the component access token.
pub fn component_key(component_appid: &str) -> String {
    format!("component:{component_appid}")
}

/// Store key for an authorizer credential.
pub fn authorizer_key(component_appid: &str, authorizer_appid: &str) -> String {
    format!("authorizer:{component_appid}:{authorizer_appid}")
}

/// Store key for an end-user credential.
pub fn user_key(authorizer_appid: &str, openid: &str) -> String {
    format!("user:{authorizer_appid}:{openid}")
}

/// Credential persistence interface.
///
/// Keys are namespaced by credential kind so one store can serve every level.
/// A save replaces the previous value wholesale. Cross-process coordination
/// is the store's concern; last-write-wins is acceptable because any stored
/// credential of an identity is usable until it expires.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Load the credential for a key. Absent is a normal outcome.
    async fn get(&self, key: &str) -> WechatResult<Option<Credential>>;

    /// Persist the credential for a key.
    async fn save(&self, key: &str, credential: &Credential) -> WechatResult<()>;
}

/// In-memory token store.
pub struct InMemoryTokenStore {
    credentials: Mutex<HashMap<String, Credential>>,
    warned: AtomicBool,
}

impl InMemoryTokenStore {
    /// Create a new in-memory token store.
    pub fn new() -> Self {
        Self {
            credentials: Mutex::new(HashMap::new()),
            warned: AtomicBool::new(false),
        }
    }

    fn warn_once(&self) {
        if !self.warned.swap(true, Ordering::Relaxed) {
            warn!(
                "in-memory token store keeps credentials in process memory; \
                 clustered or multi-host deployments need a shared store"
            );
        }
    }
}

impl Default for InMemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn get(&self, key: &str) -> WechatResult<Option<Credential>> {
        Ok(self.credentials.lock().unwrap().get(key).cloned())
    }

    async fn save(&self, key: &str, credential: &Credential) -> WechatResult<()> {
        self.warn_once();
        self.credentials
            .lock()
            .unwrap()
            .insert(key.to_string(), credential.clone());
        Ok(())
    }
}

/// Mock token store for testing.
#[derive(Default)]
pub struct MockTokenStore {
    credentials: Mutex<HashMap<String, Credential>>,
    save_history: Mutex<Vec<(String, Credential)>>,
    get_history: Mutex<Vec<String>>,
    should_fail: Mutex<bool>,
}

impl MockTokenStore {
    /// Create a new mock token store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a credential.
    pub fn seed(&self, key: &str, credential: Credential) -> &Self {
        self.credentials
            .lock()
            .unwrap()
            .insert(key.to_string(), credential);
        self
    }

    /// Make every operation fail.
    pub fn set_should_fail(&self, should_fail: bool) -> &Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    /// Get save history.
    pub fn get_save_history(&self) -> Vec<(String, Credential)> {
        self.save_history.lock().unwrap().clone()
    }

    /// Get read history.
    pub fn get_read_history(&self) -> Vec<String> {
        self.get_history.lock().unwrap().clone()
    }

    fn check_failure(&self) -> WechatResult<()> {
        if *self.should_fail.lock().unwrap() {
            return Err(StorageError::ReadFailed {
                message: "Mock store failure".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl TokenStore for MockTokenStore {
    async fn get(&self, key: &str) -> WechatResult<Option<Credential>> {
        self.check_failure()?;
        self.get_history.lock().unwrap().push(key.to_string());
        Ok(self.credentials.lock().unwrap().get(key).cloned())
    }

    async fn save(&self, key: &str, credential: &Credential) -> WechatResult<()> {
        self.check_failure()?;
        self.save_history
            .lock()
            .unwrap()
            .push((key.to_string(), credential.clone()));
        self.credentials
            .lock()
            .unwrap()
            .insert(key.to_string(), credential.clone());
        Ok(())
    }
}

//! Token Management
//!
//! Credential managers for the three levels of the delegation chain, and the
//! store they persist through.

pub mod authorizer;
pub mod component;
pub mod store;
pub mod user;

pub use authorizer::{store_authorization, AuthorizerTokenManager};
pub use component::{ComponentTokenManager, TicketCell, TicketProvider};
pub use store::{
    authorizer_key, component_key, user_key, InMemoryTokenStore, MockTokenStore, TokenStore,
};
pub use user::{store_user_grant, UserTokenManager};

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{TransportError, WechatError, WechatResult};
use crate::types::Credential;

/// Credential source consumed by the dispatcher.
///
/// `get_cached_token` is a store read with no side effects.
/// `get_access_token` mints over the network and writes through the store;
/// the dispatcher calls it when the cache is invalid or after an upstream
/// credential rejection.
#[async_trait]
pub trait TokenManager: Send + Sync {
    /// Current stored credential, valid or not. Absent is a normal outcome.
    async fn get_cached_token(&self) -> WechatResult<Option<Credential>>;

    /// Mint a fresh credential, persist it and return it.
    async fn get_access_token(&self) -> WechatResult<Credential>;
}

/// Mock token manager for testing.
///
/// Minted credentials are scripted; a mint also replaces the cached value,
/// like the real managers writing through their store.
#[derive(Default)]
pub struct MockTokenManager {
    cached: Mutex<Option<Credential>>,
    minted: Mutex<VecDeque<Credential>>,
    mint_history: Mutex<Vec<Credential>>,
    next_mint_error: Mutex<Option<WechatError>>,
}

impl MockTokenManager {
    /// Create a new mock token manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cached credential.
    pub fn set_cached(&self, credential: Credential) -> &Self {
        *self.cached.lock().unwrap() = Some(credential);
        self
    }

    /// Queue a credential for the next mint.
    pub fn queue_minted(&self, credential: Credential) -> &Self {
        self.minted.lock().unwrap().push_back(credential);
        self
    }

    /// Make the next mint fail with the given error.
    pub fn fail_next_mint(&self, error: WechatError) -> &Self {
        *self.next_mint_error.lock().unwrap() = Some(error);
        self
    }

    /// Number of mints performed.
    pub fn mint_count(&self) -> usize {
        self.mint_history.lock().unwrap().len()
    }
}

#[async_trait]
impl TokenManager for MockTokenManager {
    async fn get_cached_token(&self) -> WechatResult<Option<Credential>> {
        Ok(self.cached.lock().unwrap().clone())
    }

    async fn get_access_token(&self) -> WechatResult<Credential> {
        if let Some(error) = self.next_mint_error.lock().unwrap().take() {
            return Err(error);
        }

        let credential = self.minted.lock().unwrap().pop_front().ok_or_else(|| {
            WechatError::Transport(TransportError::ConnectionFailed {
                message: "No minted credential queued".to_string(),
            })
        })?;

        self.mint_history.lock().unwrap().push(credential.clone());
        *self.cached.lock().unwrap() = Some(credential.clone());
        Ok(credential)
    }
}

//! Component Access Token
//!
//! The root of the credential chain: minted from the pushed verify ticket
//! plus the component secret, persisted through the store, consumed by every
//! component-authenticated call.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, instrument};

use crate::core::envelope::parse_payload;
use crate::core::transport::{HttpMethod, HttpRequest, HttpTransport};
use crate::error::{ResponseError, WechatError, WechatResult};
use crate::token::store::{component_key, TokenStore};
use crate::token::TokenManager;
use crate::types::{ComponentConfig, ComponentTokenResponse, Credential, VerifyTicket};

/// Source of the verify ticket the platform pushes out of band.
#[async_trait]
pub trait TicketProvider: Send + Sync {
    /// Current verify ticket.
    async fn verify_ticket(&self) -> WechatResult<VerifyTicket>;
}

/// Holds the most recently pushed verify ticket.
///
/// Wire the platform's push callback to [`TicketCell::store`]; minting reads
/// whatever arrived last.
#[derive(Default)]
pub struct TicketCell {
    ticket: RwLock<Option<VerifyTicket>>,
}

impl TicketCell {
    /// Create an empty cell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held ticket.
    pub async fn store(&self, ticket: VerifyTicket) {
        *self.ticket.write().await = Some(ticket);
    }
}

#[async_trait]
impl TicketProvider for TicketCell {
    async fn verify_ticket(&self) -> WechatResult<VerifyTicket> {
        self.ticket
            .read()
            .await
            .clone()
            .ok_or_else(|| WechatError::TicketUnavailable {
                message: "no verify ticket has been pushed yet".to_string(),
            })
    }
}

/// Manages the component's own access token.
///
/// `get_access_token` always mints; validity-based reuse is the dispatcher's
/// job via `get_cached_token`. Concurrent mints for the same component are
/// coalesced behind a refresh gate.
pub struct ComponentTokenManager {
    config: Arc<ComponentConfig>,
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn TokenStore>,
    ticket_provider: Arc<dyn TicketProvider>,
    store_key: String,
    refresh_gate: Mutex<()>,
}

impl ComponentTokenManager {
    /// Create a manager for the configured component identity.
    pub fn new(
        config: Arc<ComponentConfig>,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn TokenStore>,
        ticket_provider: Arc<dyn TicketProvider>,
    ) -> Self {
        let store_key = component_key(&config.component_appid);
        Self {
            config,
            transport,
            store,
            ticket_provider,
            store_key,
            refresh_gate: Mutex::new(()),
        }
    }

    /// Fetch the current verify ticket.
    ///
    /// Any provider failure surfaces as `TicketUnavailable`.
    pub async fn fetch_ticket(&self) -> WechatResult<VerifyTicket> {
        self.ticket_provider.verify_ticket().await.map_err(|e| match e {
            e @ WechatError::TicketUnavailable { .. } => e,
            other => WechatError::TicketUnavailable {
                message: other.to_string(),
            },
        })
    }

    async fn mint(&self) -> WechatResult<Credential> {
        let ticket = self.fetch_ticket().await?;
        debug!("minting component access token");

        let body = json!({
            "component_appid": self.config.component_appid,
            "component_appsecret": self.config.component_secret.expose_secret(),
            "component_verify_ticket": ticket.as_str(),
        });

        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());

        let request = HttpRequest {
            method: HttpMethod::Post,
            url: format!(
                "{}/api_component_token",
                self.config.endpoints.component_api_base
            ),
            headers,
            body: Some(body.to_string()),
            timeout: Some(self.config.timeout),
        };

        let response = self.transport.send(request).await?.ensure_success()?;
        let payload = parse_payload(&response.body)?;
        let minted: ComponentTokenResponse =
            serde_json::from_value(payload).map_err(|e| ResponseError::Decode {
                message: e.to_string(),
            })?;

        let credential = Credential::new(minted.component_access_token, minted.expires_in);
        self.store.save(&self.store_key, &credential).await?;
        debug!(expire_at = credential.expire_at, "component access token minted");
        Ok(credential)
    }
}

#[async_trait]
impl TokenManager for ComponentTokenManager {
    async fn get_cached_token(&self) -> WechatResult<Option<Credential>> {
        self.store.get(&self.store_key).await
    }

    #[instrument(skip(self), fields(component_appid = %self.config.component_appid))]
    async fn get_access_token(&self) -> WechatResult<Credential> {
        let observed = self
            .store
            .get(&self.store_key)
            .await?
            .map(|c| c.access_token);

        let _guard = self.refresh_gate.lock().await;

        // A refresh that finished while we waited for the gate is shared
        // instead of minting again. A token rejected upstream never satisfies
        // this check: it is still the stored one when its caller arrives here.
        if let Some(current) = self.store.get(&self.store_key).await? {
            if current.is_valid() && observed.as_ref() != Some(&current.access_token) {
                debug!("using component token minted by a concurrent refresh");
                return Ok(current);
            }
        }

        self.mint().await
    }
}

//! Authorizer Access Token
//!
//! Second level of the delegation chain: an authorizer's short-lived access
//! token is re-derived from its long-lived refresh token, through a call the
//! component token authenticates.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::dispatch::RequestDispatcher;
use crate::error::{WechatError, WechatResult};
use crate::token::store::{authorizer_key, TokenStore};
use crate::token::TokenManager;
use crate::types::{
    ApiRequest, AuthorizationInfo, AuthorizerTokenResponse, ComponentConfig, Credential,
};

/// Persist the credential carried by a completed authorization grant.
///
/// Seeds the store so the authorizer's manager can refresh from the grant's
/// refresh token from then on.
pub async fn store_authorization(
    store: &dyn TokenStore,
    component_appid: &str,
    info: &AuthorizationInfo,
) -> WechatResult<Credential> {
    let credential = Credential::new(&info.authorizer_access_token, info.expires_in)
        .with_refresh_token(&info.authorizer_refresh_token);
    let key = authorizer_key(component_appid, &info.authorizer_appid);
    store.save(&key, &credential).await?;
    Ok(credential)
}

/// Manages one authorizer's access token.
///
/// The dispatcher passed in must be component-authenticated; an expired
/// component token is refreshed inside it, independently of this manager's
/// own retry handling.
pub struct AuthorizerTokenManager {
    config: Arc<ComponentConfig>,
    dispatcher: Arc<RequestDispatcher>,
    store: Arc<dyn TokenStore>,
    authorizer_appid: String,
    store_key: String,
    refresh_gate: Mutex<()>,
}

impl AuthorizerTokenManager {
    /// Create a manager for one authorizer.
    pub fn new(
        config: Arc<ComponentConfig>,
        dispatcher: Arc<RequestDispatcher>,
        store: Arc<dyn TokenStore>,
        authorizer_appid: impl Into<String>,
    ) -> Self {
        let authorizer_appid = authorizer_appid.into();
        let store_key = authorizer_key(&config.component_appid, &authorizer_appid);
        Self {
            config,
            dispatcher,
            store,
            authorizer_appid,
            store_key,
            refresh_gate: Mutex::new(()),
        }
    }

    /// The authorizer this manager serves.
    pub fn authorizer_appid(&self) -> &str {
        &self.authorizer_appid
    }

    async fn mint(&self) -> WechatResult<Credential> {
        let refresh_token = self
            .store
            .get(&self.store_key)
            .await?
            .and_then(|c| c.refresh_token)
            .filter(|rt| !rt.is_empty())
            .ok_or_else(|| WechatError::MissingRefreshToken {
                identity: self.store_key.clone(),
            })?;

        debug!(authorizer_appid = %self.authorizer_appid, "refreshing authorizer access token");

        let request = ApiRequest::post(
            format!(
                "{}/api_authorizer_token",
                self.config.endpoints.component_api_base
            ),
            json!({
                "component_appid": self.config.component_appid,
                "authorizer_appid": self.authorizer_appid,
                "authorizer_refresh_token": refresh_token,
            }),
        );
        let response: AuthorizerTokenResponse = self.dispatcher.execute_as(request).await?;

        // Keep the previous refresh token when upstream does not rotate it.
        let refresh_token = response.authorizer_refresh_token.unwrap_or(refresh_token);
        let credential = Credential::new(response.authorizer_access_token, response.expires_in)
            .with_refresh_token(refresh_token);
        self.store.save(&self.store_key, &credential).await?;
        Ok(credential)
    }
}

#[async_trait]
impl TokenManager for AuthorizerTokenManager {
    async fn get_cached_token(&self) -> WechatResult<Option<Credential>> {
        self.store.get(&self.store_key).await
    }

    #[instrument(skip(self), fields(authorizer_appid = %self.authorizer_appid))]
    async fn get_access_token(&self) -> WechatResult<Credential> {
        let observed = self
            .store
            .get(&self.store_key)
            .await?
            .map(|c| c.access_token);

        let _guard = self.refresh_gate.lock().await;

        if let Some(current) = self.store.get(&self.store_key).await? {
            if current.is_valid() && observed.as_ref() != Some(&current.access_token) {
                debug!("using authorizer token minted by a concurrent refresh");
                return Ok(current);
            }
        }

        self.mint().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::MockTransport;
    use crate::token::component::{ComponentTokenManager, TicketCell};
    use crate::token::store::MockTokenStore;
    use crate::types::VerifyTicket;

    async fn chain(
        transport: &Arc<MockTransport>,
    ) -> (AuthorizerTokenManager, Arc<MockTokenStore>, Arc<MockTokenStore>) {
        let config = Arc::new(ComponentConfig::new("wx1", "secret-1"));
        let ticket = Arc::new(TicketCell::new());
        ticket.store(VerifyTicket::new("ticket-1")).await;

        let component_store = Arc::new(MockTokenStore::new());
        let component_manager = Arc::new(ComponentTokenManager::new(
            config.clone(),
            transport.clone(),
            component_store.clone(),
            ticket,
        ));
        let dispatcher = Arc::new(RequestDispatcher::new(
            transport.clone(),
            component_manager,
        ));

        let authorizer_store = Arc::new(MockTokenStore::new());
        let manager = AuthorizerTokenManager::new(
            config,
            dispatcher,
            authorizer_store.clone(),
            "wxa",
        );
        (manager, component_store, authorizer_store)
    }

    #[tokio::test]
    async fn test_missing_refresh_token_fails_without_network() {
        let transport = Arc::new(MockTransport::new());
        let (manager, _, authorizer_store) = chain(&transport).await;

        let error = manager.get_access_token().await.unwrap_err();
        match error {
            WechatError::MissingRefreshToken { identity } => {
                assert_eq!(identity, "authorizer:wx1:wxa");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transport.request_count(), 0);

        // An empty refresh token is as unusable as a missing one.
        authorizer_store.seed("authorizer:wx1:wxa", Credential::from_refresh_token(""));
        let error = manager.get_access_token().await.unwrap_err();
        assert_eq!(error.error_code(), "WECHAT_REFRESH_TOKEN");
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_mint_goes_through_the_component_authenticated_call() {
        let transport = Arc::new(MockTransport::new());
        transport.queue_json_response(
            200,
            &json!({
                "authorizer_access_token": "at-1",
                "expires_in": 7200,
                "authorizer_refresh_token": "rt-1"
            }),
        );
        let (manager, component_store, authorizer_store) = chain(&transport).await;
        component_store.seed("component:wx1", Credential::new("ct-valid", 7200));
        authorizer_store.seed("authorizer:wx1:wxa", Credential::from_refresh_token("rt-0"));

        let credential = manager.get_access_token().await.unwrap();
        assert_eq!(credential.access_token, "at-1");
        assert_eq!(credential.refresh_token.as_deref(), Some("rt-1"));

        assert_eq!(transport.request_count(), 1);
        let request = transport.get_last_request().unwrap();
        assert!(request.url.starts_with(
            "https://api.weixin.qq.com/cgi-bin/component/api_authorizer_token"
        ));
        assert!(request.url.contains("component_access_token=ct-valid"));
        let body: serde_json::Value =
            serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["component_appid"], "wx1");
        assert_eq!(body["authorizer_appid"], "wxa");
        assert_eq!(body["authorizer_refresh_token"], "rt-0");

        let saved = &authorizer_store.get_save_history()[0];
        assert_eq!(saved.0, "authorizer:wx1:wxa");
        assert_eq!(saved.1.refresh_token.as_deref(), Some("rt-1"));
    }

    #[tokio::test]
    async fn test_refresh_token_is_preserved_when_not_rotated() {
        let transport = Arc::new(MockTransport::new());
        transport.queue_json_response(
            200,
            &json!({ "authorizer_access_token": "at-1", "expires_in": 7200 }),
        );
        let (manager, component_store, authorizer_store) = chain(&transport).await;
        component_store.seed("component:wx1", Credential::new("ct-valid", 7200));
        authorizer_store.seed("authorizer:wx1:wxa", Credential::from_refresh_token("rt-0"));

        let credential = manager.get_access_token().await.unwrap();
        assert_eq!(credential.refresh_token.as_deref(), Some("rt-0"));
    }

    #[tokio::test]
    async fn test_expired_component_token_refreshes_before_the_authorizer_call() {
        let transport = Arc::new(MockTransport::new());
        transport.queue_json_response(
            200,
            &json!({ "component_access_token": "ct-new", "expires_in": 7200 }),
        );
        transport.queue_json_response(
            200,
            &json!({
                "authorizer_access_token": "at-1",
                "expires_in": 7200,
                "authorizer_refresh_token": "rt-1"
            }),
        );
        let (manager, _, authorizer_store) = chain(&transport).await;
        authorizer_store.seed("authorizer:wx1:wxa", Credential::from_refresh_token("rt-0"));

        let credential = manager.get_access_token().await.unwrap();
        assert_eq!(credential.access_token, "at-1");

        let requests = transport.get_requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].url.ends_with("/api_component_token"));
        assert!(requests[1].url.contains("api_authorizer_token"));
        assert!(requests[1].url.contains("component_access_token=ct-new"));
    }

    #[tokio::test]
    async fn test_component_rejection_during_the_mint_recovers_once() {
        let transport = Arc::new(MockTransport::new());
        transport.queue_upstream_error(40001, "invalid credential");
        transport.queue_json_response(
            200,
            &json!({ "component_access_token": "ct-new", "expires_in": 7200 }),
        );
        transport.queue_json_response(
            200,
            &json!({
                "authorizer_access_token": "at-1",
                "expires_in": 7200,
                "authorizer_refresh_token": "rt-1"
            }),
        );
        let (manager, component_store, authorizer_store) = chain(&transport).await;
        component_store.seed("component:wx1", Credential::new("ct-revoked", 7200));
        authorizer_store.seed("authorizer:wx1:wxa", Credential::from_refresh_token("rt-0"));

        let credential = manager.get_access_token().await.unwrap();
        assert_eq!(credential.access_token, "at-1");

        let requests = transport.get_requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[0].url.contains("component_access_token=ct-revoked"));
        assert!(requests[1].url.ends_with("/api_component_token"));
        assert!(requests[2].url.contains("component_access_token=ct-new"));
    }

    #[tokio::test]
    async fn test_store_authorization_seeds_the_store() {
        let store = MockTokenStore::new();
        let info = AuthorizationInfo {
            authorizer_appid: "wxa".to_string(),
            authorizer_access_token: "at-1".to_string(),
            expires_in: 7200,
            authorizer_refresh_token: "rt-1".to_string(),
            func_info: Vec::new(),
        };

        let credential = store_authorization(&store, "wx1", &info).await.unwrap();
        assert!(credential.is_valid());

        let saved = store.get("authorizer:wx1:wxa").await.unwrap().unwrap();
        assert_eq!(saved.access_token, "at-1");
        assert_eq!(saved.refresh_token.as_deref(), Some("rt-1"));
    }
}

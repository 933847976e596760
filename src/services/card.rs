//! Card Delegation Service
//!
//! Third-party card qualification and merchant calls. The whole family reads
//! the component token from the plain `access_token` query key.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::instrument;

use crate::dispatch::RequestDispatcher;
use crate::error::WechatResult;
use crate::types::{ApiRequest, ComponentConfig, TokenQueryKey};

/// Card service operations.
#[async_trait]
pub trait CardServiceTrait: Send + Sync {
    /// Upload the component's card agent qualification material.
    async fn upload_agent_qualification(&self, body: Value) -> WechatResult<Value>;

    /// Check the audit state of the agent qualification.
    async fn check_agent_qualification(&self) -> WechatResult<Value>;

    /// Upload a merchant's card qualification material.
    async fn upload_merchant_qualification(&self, body: Value) -> WechatResult<Value>;

    /// Check the audit state of a merchant qualification.
    async fn check_merchant_qualification(&self, body: Value) -> WechatResult<Value>;

    /// Fetch one card merchant by authorizer appid.
    async fn get_merchant(&self, authorizer_appid: &str) -> WechatResult<Value>;

    /// Page through card merchants; `next_get` is the cursor from the
    /// previous page, empty on the first call.
    async fn batch_get_merchants(&self, next_get: Option<&str>) -> WechatResult<Value>;
}

/// Card service implementation.
#[derive(Clone)]
pub struct CardService {
    config: Arc<ComponentConfig>,
    dispatcher: Arc<RequestDispatcher>,
}

impl CardService {
    /// Create a new card service.
    pub fn new(config: Arc<ComponentConfig>, dispatcher: Arc<RequestDispatcher>) -> Self {
        Self { config, dispatcher }
    }

    fn build_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.endpoints.component_api_base.trim_end_matches('/'),
            endpoint
        )
    }
}

#[async_trait]
impl CardServiceTrait for CardService {
    #[instrument(skip(self, body))]
    async fn upload_agent_qualification(&self, body: Value) -> WechatResult<Value> {
        let request = ApiRequest::post(self.build_url("upload_card_agent_qualification"), body)
            .with_token_key(TokenQueryKey::AccessToken);
        self.dispatcher.execute(request).await
    }

    #[instrument(skip(self))]
    async fn check_agent_qualification(&self) -> WechatResult<Value> {
        let request = ApiRequest::post_empty(self.build_url("check_card_agent_qualification"))
            .with_token_key(TokenQueryKey::AccessToken);
        self.dispatcher.execute(request).await
    }

    #[instrument(skip(self, body))]
    async fn upload_merchant_qualification(&self, body: Value) -> WechatResult<Value> {
        let request = ApiRequest::post(self.build_url("upload_card_merchant_qualification"), body)
            .with_token_key(TokenQueryKey::AccessToken);
        self.dispatcher.execute(request).await
    }

    #[instrument(skip(self, body))]
    async fn check_merchant_qualification(&self, body: Value) -> WechatResult<Value> {
        let request = ApiRequest::post(self.build_url("check_card_merchant_qualification"), body)
            .with_token_key(TokenQueryKey::AccessToken);
        self.dispatcher.execute(request).await
    }

    #[instrument(skip(self), fields(authorizer_appid = %authorizer_appid))]
    async fn get_merchant(&self, authorizer_appid: &str) -> WechatResult<Value> {
        let request = ApiRequest::post(
            self.build_url("get_card_merchant"),
            json!({ "appid": authorizer_appid }),
        )
        .with_token_key(TokenQueryKey::AccessToken);
        self.dispatcher.execute(request).await
    }

    #[instrument(skip(self))]
    async fn batch_get_merchants(&self, next_get: Option<&str>) -> WechatResult<Value> {
        let request = ApiRequest::post(
            self.build_url("batchget_card_merchant"),
            json!({ "next_get": next_get.unwrap_or("") }),
        )
        .with_token_key(TokenQueryKey::AccessToken);
        self.dispatcher.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::MockTransport;
    use crate::token::MockTokenManager;
    use crate::types::Credential;

    fn service() -> (CardService, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let manager = Arc::new(MockTokenManager::new());
        manager.set_cached(Credential::new("ct-1", 7200));
        let dispatcher = Arc::new(RequestDispatcher::new(transport.clone(), manager));
        let config = Arc::new(ComponentConfig::new("wx1", "secret-1"));
        (CardService::new(config, dispatcher), transport)
    }

    #[tokio::test]
    async fn test_agent_qualification_calls() {
        let (service, transport) = service();
        transport.queue_json_response(200, &json!({ "errcode": 0, "errmsg": "ok" }));
        transport.queue_json_response(200, &json!({ "result": 1 }));

        service
            .upload_agent_qualification(json!({ "agent_name": "Acme" }))
            .await
            .unwrap();
        let check = service.check_agent_qualification().await.unwrap();
        assert_eq!(check["result"], 1);

        let requests = transport.get_requests();
        assert!(requests[0]
            .url
            .contains("/upload_card_agent_qualification?access_token=ct-1"));
        assert!(!requests[0].url.contains("component_access_token"));
        let body: Value = serde_json::from_str(requests[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["agent_name"], "Acme");

        assert!(requests[1]
            .url
            .contains("/check_card_agent_qualification?access_token=ct-1"));
        assert!(requests[1].body.is_none());
    }

    #[tokio::test]
    async fn test_merchant_qualification_bodies_pass_through() {
        let (service, transport) = service();
        transport.queue_json_response(200, &json!({ "errcode": 0, "errmsg": "ok" }));
        transport.queue_json_response(200, &json!({ "errcode": 0, "errmsg": "ok" }));

        service
            .upload_merchant_qualification(json!({ "appid": "wxa", "name": "Shop" }))
            .await
            .unwrap();
        service
            .check_merchant_qualification(json!({ "appid": "wxa" }))
            .await
            .unwrap();

        let requests = transport.get_requests();
        assert!(requests[0].url.contains("/upload_card_merchant_qualification"));
        assert!(requests[1].url.contains("/check_card_merchant_qualification"));
        let body: Value = serde_json::from_str(requests[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({ "appid": "wxa" }));
    }

    #[tokio::test]
    async fn test_get_merchant_wraps_the_appid() {
        let (service, transport) = service();
        transport.queue_json_response(200, &json!({ "appid": "wxa", "status": "passed" }));

        let merchant = service.get_merchant("wxa").await.unwrap();
        assert_eq!(merchant["status"], "passed");

        let request = transport.get_last_request().unwrap();
        assert!(request.url.contains("/get_card_merchant"));
        let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({ "appid": "wxa" }));
    }

    #[tokio::test]
    async fn test_batch_get_merchants_defaults_the_cursor() {
        let (service, transport) = service();
        transport.queue_json_response(200, &json!({ "info": [] }));
        transport.queue_json_response(200, &json!({ "info": [] }));

        service.batch_get_merchants(None).await.unwrap();
        service.batch_get_merchants(Some("cursor-1")).await.unwrap();

        let requests = transport.get_requests();
        let first: Value = serde_json::from_str(requests[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(first, json!({ "next_get": "" }));
        let second: Value = serde_json::from_str(requests[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(second, json!({ "next_get": "cursor-1" }));
    }
}

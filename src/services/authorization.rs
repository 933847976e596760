//! Authorization Lifecycle Service
//!
//! Pre-authorization codes, authorization grants and authorizer management
//! calls on the component API.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::instrument;

use crate::dispatch::RequestDispatcher;
use crate::error::WechatResult;
use crate::types::{
    ApiRequest, AuthorizerOptionResponse, ComponentConfig, PreAuthCodeResponse, QueryAuthResponse,
    TokenQueryKey,
};

/// Authorization service operations.
#[async_trait]
pub trait AuthorizationServiceTrait: Send + Sync {
    /// Create a pre-authorization code for the component login page.
    async fn create_pre_auth_code(&self) -> WechatResult<PreAuthCodeResponse>;

    /// Exchange an authorization code for the authorizer's grant.
    async fn query_auth(&self, authorization_code: &str) -> WechatResult<QueryAuthResponse>;

    /// Fetch an authorizer's account information.
    async fn get_authorizer_info(&self, authorizer_appid: &str) -> WechatResult<Value>;

    /// Read one authorizer option.
    async fn get_authorizer_option(
        &self,
        authorizer_appid: &str,
        option_name: &str,
    ) -> WechatResult<AuthorizerOptionResponse>;

    /// Set one authorizer option.
    async fn set_authorizer_option(
        &self,
        authorizer_appid: &str,
        option_name: &str,
        option_value: &str,
    ) -> WechatResult<Value>;

    /// Reset the component's API call quota.
    async fn clear_quota(&self) -> WechatResult<Value>;

    /// Confirm or cancel an authorization for one function scope.
    async fn confirm_authorization(
        &self,
        authorizer_appid: &str,
        funcscope_category_id: i64,
        confirm_value: i64,
    ) -> WechatResult<Value>;
}

/// Authorization service implementation.
#[derive(Clone)]
pub struct AuthorizationService {
    config: Arc<ComponentConfig>,
    dispatcher: Arc<RequestDispatcher>,
}

impl AuthorizationService {
    /// Create a new authorization service.
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
impl AuthorizationServiceTrait for AuthorizationService {
    #[instrument(skip(self))]
    async fn create_pre_auth_code(&self) -> WechatResult<PreAuthCodeResponse> {
        let request = ApiRequest::post(
            self.build_url("api_create_preauthcode"),
            json!({ "component_appid": self.config.component_appid }),
        );
        self.dispatcher.execute_as(request).await
    }

    #[instrument(skip(self, authorization_code))]
    async fn query_auth(&self, authorization_code: &str) -> WechatResult<QueryAuthResponse> {
        let request = ApiRequest::post(
            self.build_url("api_query_auth"),
            json!({
                "component_appid": self.config.component_appid,
                "authorization_code": authorization_code,
            }),
        );
        self.dispatcher.execute_as(request).await
    }

    #[instrument(skip(self), fields(authorizer_appid = %authorizer_appid))]
    async fn get_authorizer_info(&self, authorizer_appid: &str) -> WechatResult<Value> {
        let request = ApiRequest::post(
            self.build_url("api_get_authorizer_info"),
            json!({
                "component_appid": self.config.component_appid,
                "authorizer_appid": authorizer_appid,
            }),
        );
        self.dispatcher.execute(request).await
    }

    #[instrument(skip(self), fields(authorizer_appid = %authorizer_appid, option_name = %option_name))]
    async fn get_authorizer_option(
        &self,
        authorizer_appid: &str,
        option_name: &str,
    ) -> WechatResult<AuthorizerOptionResponse> {
        let request = ApiRequest::post(
            self.build_url("api_get_authorizer_option"),
            json!({
                "component_appid": self.config.component_appid,
                "authorizer_appid": authorizer_appid,
                "option_name": option_name,
            }),
        );
        self.dispatcher.execute_as(request).await
    }

    #[instrument(skip(self), fields(authorizer_appid = %authorizer_appid, option_name = %option_name))]
    async fn set_authorizer_option(
        &self,
        authorizer_appid: &str,
        option_name: &str,
        option_value: &str,
    ) -> WechatResult<Value> {
        let request = ApiRequest::post(
            self.build_url("api_set_authorizer_option"),
            json!({
                "component_appid": self.config.component_appid,
                "authorizer_appid": authorizer_appid,
                "option_name": option_name,
                "option_value": option_value,
            }),
        );
        self.dispatcher.execute(request).await
    }

    #[instrument(skip(self))]
    async fn clear_quota(&self) -> WechatResult<Value> {
        let request = ApiRequest::post(
            self.build_url("clear_quota"),
            json!({ "component_appid": self.config.component_appid }),
        );
        self.dispatcher.execute(request).await
    }

    #[instrument(skip(self), fields(authorizer_appid = %authorizer_appid))]
    async fn confirm_authorization(
        &self,
        authorizer_appid: &str,
        funcscope_category_id: i64,
        confirm_value: i64,
    ) -> WechatResult<Value> {
        let request = ApiRequest::post(
            self.build_url("api_confirm_authorization"),
            json!({
                "component_appid": self.config.component_appid,
                "authorizer_appid": authorizer_appid,
                "funcscope_category_id": funcscope_category_id,
                "confirm_value": confirm_value,
            }),
        )
        .with_token_key(TokenQueryKey::AccessToken);
        self.dispatcher.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::{HttpMethod, MockTransport};
    use crate::token::MockTokenManager;
    use crate::types::Credential;

    fn service() -> (AuthorizationService, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let manager = Arc::new(MockTokenManager::new());
        manager.set_cached(Credential::new("ct-1", 7200));
        let dispatcher = Arc::new(RequestDispatcher::new(transport.clone(), manager));
        let config = Arc::new(ComponentConfig::new("wx1", "secret-1"));
        (AuthorizationService::new(config, dispatcher), transport)
    }

    #[tokio::test]
    async fn test_create_pre_auth_code_shapes_the_call() {
        let (service, transport) = service();
        transport.queue_json_response(
            200,
            &json!({ "pre_auth_code": "pre-1", "expires_in": 600 }),
        );

        let response = service.create_pre_auth_code().await.unwrap();
        assert_eq!(response.pre_auth_code, "pre-1");
        assert_eq!(response.expires_in, 600);

        let request = transport.get_last_request().unwrap();
        assert_eq!(request.method, HttpMethod::Post);
        assert!(request.url.starts_with(
            "https://api.weixin.qq.com/cgi-bin/component/api_create_preauthcode"
        ));
        assert!(request.url.contains("component_access_token=ct-1"));
        let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({ "component_appid": "wx1" }));
    }

    #[tokio::test]
    async fn test_query_auth_returns_the_grant() {
        let (service, transport) = service();
        transport.queue_json_response(
            200,
            &json!({
                "authorization_info": {
                    "authorizer_appid": "wxa",
                    "authorizer_access_token": "at-1",
                    "expires_in": 7200,
                    "authorizer_refresh_token": "rt-1",
                    "func_info": []
                }
            }),
        );

        let response = service.query_auth("auth-code-1").await.unwrap();
        assert_eq!(response.authorization_info.authorizer_appid, "wxa");
        assert_eq!(response.authorization_info.authorizer_refresh_token, "rt-1");

        let request = transport.get_last_request().unwrap();
        assert!(request.url.contains("/api_query_auth"));
        let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["authorization_code"], "auth-code-1");
        assert_eq!(body["component_appid"], "wx1");
    }

    #[tokio::test]
    async fn test_get_authorizer_info_returns_the_stripped_payload() {
        let (service, transport) = service();
        transport.queue_json_response(
            200,
            &json!({
                "errcode": 0,
                "errmsg": "ok",
                "authorizer_info": { "nick_name": "Test Account" },
                "authorization_info": { "authorizer_appid": "wxa" }
            }),
        );

        let value = service.get_authorizer_info("wxa").await.unwrap();
        assert_eq!(value["authorizer_info"]["nick_name"], "Test Account");
        assert!(value.get("errcode").is_none());

        let request = transport.get_last_request().unwrap();
        assert!(request.url.contains("/api_get_authorizer_info"));
        let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["authorizer_appid"], "wxa");
    }

    #[tokio::test]
    async fn test_authorizer_option_read_and_write() {
        let (service, transport) = service();
        transport.queue_json_response(
            200,
            &json!({
                "authorizer_appid": "wxa",
                "option_name": "location_report",
                "option_value": "1"
            }),
        );
        transport.queue_json_response(200, &json!({ "errcode": 0, "errmsg": "ok" }));

        let option = service
            .get_authorizer_option("wxa", "location_report")
            .await
            .unwrap();
        assert_eq!(option.option_value, "1");

        service
            .set_authorizer_option("wxa", "location_report", "2")
            .await
            .unwrap();

        let requests = transport.get_requests();
        assert!(requests[0].url.contains("/api_get_authorizer_option"));
        assert!(requests[1].url.contains("/api_set_authorizer_option"));
        let body: Value = serde_json::from_str(requests[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["option_name"], "location_report");
        assert_eq!(body["option_value"], "2");
    }

    #[tokio::test]
    async fn test_clear_quota_uses_the_component_token_key() {
        let (service, transport) = service();
        transport.queue_json_response(200, &json!({ "errcode": 0, "errmsg": "ok" }));

        service.clear_quota().await.unwrap();

        let request = transport.get_last_request().unwrap();
        assert!(request.url.contains("/clear_quota"));
        assert!(request.url.contains("component_access_token=ct-1"));
    }

    #[tokio::test]
    async fn test_confirm_authorization_uses_the_plain_token_key() {
        let (service, transport) = service();
        transport.queue_json_response(200, &json!({ "errcode": 0, "errmsg": "ok" }));

        service.confirm_authorization("wxa", 1, 1).await.unwrap();

        let request = transport.get_last_request().unwrap();
        assert!(request.url.contains("/api_confirm_authorization"));
        assert!(request.url.contains("access_token=ct-1"));
        assert!(!request.url.contains("component_access_token"));
        let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["funcscope_category_id"], 1);
        assert_eq!(body["confirm_value"], 1);
    }
}

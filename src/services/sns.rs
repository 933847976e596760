//! Sns OAuth Service
//!
//! End-user OAuth grants performed on behalf of an authorizer: web
//! authorization code exchange, refresh, and mini-program session exchange.
//! All three are GET calls authenticated by the component token.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

use crate::dispatch::RequestDispatcher;
use crate::error::WechatResult;
use crate::types::{ApiRequest, ComponentConfig, SessionResponse, UserTokenResponse};

/// Sns service operations.
#[async_trait]
pub trait SnsServiceTrait: Send + Sync {
    /// Exchange a web authorization code for an end-user token.
    async fn oauth_access_token(&self, appid: &str, code: &str)
        -> WechatResult<UserTokenResponse>;

    /// Refresh an end-user token from its refresh token.
    async fn refresh_oauth_token(
        &self,
        appid: &str,
        refresh_token: &str,
    ) -> WechatResult<UserTokenResponse>;

    /// Exchange a mini-program login code for a session key.
    async fn jscode_to_session(&self, appid: &str, js_code: &str)
        -> WechatResult<SessionResponse>;
}

/// Sns service implementation.
#[derive(Clone)]
pub struct SnsService {
    config: Arc<ComponentConfig>,
    dispatcher: Arc<RequestDispatcher>,
}

impl SnsService {
    /// Create a new sns service.
    pub fn new(config: Arc<ComponentConfig>, dispatcher: Arc<RequestDispatcher>) -> Self {
        Self { config, dispatcher }
    }

    fn oauth_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.endpoints.sns_oauth_base.trim_end_matches('/'),
            endpoint
        )
    }
}

#[async_trait]
impl SnsServiceTrait for SnsService {
    #[instrument(skip(self, code), fields(appid = %appid))]
    async fn oauth_access_token(
        &self,
        appid: &str,
        code: &str,
    ) -> WechatResult<UserTokenResponse> {
        let request = ApiRequest::get(self.oauth_url("access_token"))
            .with_query("component_appid", &self.config.component_appid)
            .with_query("appid", appid)
            .with_query("code", code)
            .with_query("grant_type", "authorization_code");
        self.dispatcher.execute_as(request).await
    }

    #[instrument(skip(self, refresh_token), fields(appid = %appid))]
    async fn refresh_oauth_token(
        &self,
        appid: &str,
        refresh_token: &str,
    ) -> WechatResult<UserTokenResponse> {
        let request = ApiRequest::get(self.oauth_url("refresh_token"))
            .with_query("component_appid", &self.config.component_appid)
            .with_query("appid", appid)
            .with_query("grant_type", "refresh_token")
            .with_query("refresh_token", refresh_token);
        self.dispatcher.execute_as(request).await
    }

    #[instrument(skip(self, js_code), fields(appid = %appid))]
    async fn jscode_to_session(
        &self,
        appid: &str,
        js_code: &str,
    ) -> WechatResult<SessionResponse> {
        let request = ApiRequest::get(format!(
            "{}/jscode2session",
            self.config.endpoints.sns_base.trim_end_matches('/')
        ))
        .with_query("component_appid", &self.config.component_appid)
        .with_query("appid", appid)
        .with_query("js_code", js_code)
        .with_query("grant_type", "authorization_code");
        self.dispatcher.execute_as(request).await
    }
}

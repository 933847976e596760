//! API Request/Response Types
//!
//! The request shape services hand to the dispatcher, and the typed payloads
//! the platform answers with.

use serde::Deserialize;
use serde_json::Value;

use crate::core::transport::HttpMethod;

/// Query-string key under which the access token is injected.
///
/// Most component endpoints read `component_access_token`; the card and
/// merchant family reads `access_token`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TokenQueryKey {
    #[default]
    ComponentAccessToken,
    AccessToken,
}

impl TokenQueryKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ComponentAccessToken => "component_access_token",
            Self::AccessToken => "access_token",
        }
    }
}

/// An upstream call before credential injection.
///
/// Services build these; the dispatcher validates the credential, injects it
/// under `token_key` and executes.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Full endpoint URL without the token parameter.
    pub url: String,
    /// Query parameters beyond the token.
    pub query: Vec<(String, String)>,
    /// JSON body for POST calls.
    pub body: Option<Value>,
    /// Key the token is injected under.
    pub token_key: TokenQueryKey,
}

impl ApiRequest {
    /// Create a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            query: Vec::new(),
            body: None,
            token_key: TokenQueryKey::default(),
        }
    }

    /// Create a POST request with a JSON body.
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            query: Vec::new(),
            body: Some(body),
            token_key: TokenQueryKey::default(),
        }
    }

    /// Create a POST request without a body.
    pub fn post_empty(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            query: Vec::new(),
            body: None,
            token_key: TokenQueryKey::default(),
        }
    }

    /// Append a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Override the token query key.
    pub fn with_token_key(mut self, token_key: TokenQueryKey) -> Self {
        self.token_key = token_key;
        self
    }
}

/// Component access token mint response.
#[derive(Clone, Debug, Deserialize)]
pub struct ComponentTokenResponse {
    pub component_access_token: String,
    pub expires_in: i64,
}

/// Authorizer access token mint response.
#[derive(Clone, Debug, Deserialize)]
pub struct AuthorizerTokenResponse {
    pub authorizer_access_token: String,
    pub expires_in: i64,
    /// Rotated refresh token. Absent means keep the previous one.
    #[serde(default)]
    pub authorizer_refresh_token: Option<String>,
}

/// End-user OAuth token response (code exchange and refresh).
#[derive(Clone, Debug, Deserialize)]
pub struct UserTokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub openid: String,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Pre-authorization code response.
#[derive(Clone, Debug, Deserialize)]
pub struct PreAuthCodeResponse {
    pub pre_auth_code: String,
    pub expires_in: i64,
}

/// `api_query_auth` response.
#[derive(Clone, Debug, Deserialize)]
pub struct QueryAuthResponse {
    pub authorization_info: AuthorizationInfo,
}

/// Authorization grant detail inside a `query_auth` response.
#[derive(Clone, Debug, Deserialize)]
pub struct AuthorizationInfo {
    pub authorizer_appid: String,
    pub authorizer_access_token: String,
    pub expires_in: i64,
    pub authorizer_refresh_token: String,
    #[serde(default)]
    pub func_info: Vec<Value>,
}

/// Authorizer option read response.
#[derive(Clone, Debug, Deserialize)]
pub struct AuthorizerOptionResponse {
    #[serde(default)]
    pub authorizer_appid: Option<String>,
    pub option_name: String,
    pub option_value: String,
}

/// Mini-program `jscode2session` response.
#[derive(Clone, Debug, Deserialize)]
pub struct SessionResponse {
    pub openid: String,
    pub session_key: String,
    #[serde(default)]
    pub unionid: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_token_query_keys() {
        assert_eq!(
            TokenQueryKey::ComponentAccessToken.as_str(),
            "component_access_token"
        );
        assert_eq!(TokenQueryKey::AccessToken.as_str(), "access_token");
        assert_eq!(TokenQueryKey::default(), TokenQueryKey::ComponentAccessToken);
    }

    #[test]
    fn test_request_constructors() {
        let request = ApiRequest::get("https://api.weixin.qq.com/sns/component/jscode2session")
            .with_query("appid", "wxa")
            .with_query("grant_type", "authorization_code");
        assert_eq!(request.method, HttpMethod::Get);
        assert!(request.body.is_none());
        assert_eq!(request.query.len(), 2);

        let request = ApiRequest::post(
            "https://api.weixin.qq.com/cgi-bin/component/clear_quota",
            json!({ "component_appid": "wx1" }),
        )
        .with_token_key(TokenQueryKey::AccessToken);
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.token_key, TokenQueryKey::AccessToken);
    }

    #[test]
    fn test_component_token_response_parsing() {
        let json = r#"{"component_access_token":"ct-1","expires_in":7200}"#;
        let response: ComponentTokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.component_access_token, "ct-1");
        assert_eq!(response.expires_in, 7200);
    }

    #[test]
    fn test_authorizer_token_response_tolerates_missing_refresh_token() {
        let json = r#"{"authorizer_access_token":"at-1","expires_in":7200}"#;
        let response: AuthorizerTokenResponse = serde_json::from_str(json).unwrap();
        assert!(response.authorizer_refresh_token.is_none());
    }

    #[test]
    fn test_query_auth_response_parsing() {
        let json = r#"{
            "authorization_info": {
                "authorizer_appid": "wxa",
                "authorizer_access_token": "at-1",
                "expires_in": 7200,
                "authorizer_refresh_token": "rt-1",
                "func_info": [{"funcscope_category": {"id": 1}}]
            }
        }"#;
        let response: QueryAuthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.authorization_info.authorizer_appid, "wxa");
        assert_eq!(response.authorization_info.func_info.len(), 1);
    }
}

//! Configuration Types
//!
//! Component identity and endpoint configuration.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default HTTP timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30000;

/// Component client configuration.
#[derive(Clone)]
pub struct ComponentConfig {
    /// Component (third-party platform) appid.
    pub component_appid: String,
    /// Component appsecret.
    pub component_secret: SecretString,
    /// Upstream endpoint bases.
    pub endpoints: Endpoints,
    /// HTTP timeout.
    pub timeout: Duration,
}

impl ComponentConfig {
    /// Create a configuration with production endpoints.
    pub fn new(component_appid: impl Into<String>, component_secret: impl Into<String>) -> Self {
        Self {
            component_appid: component_appid.into(),
            component_secret: SecretString::new(component_secret.into()),
            endpoints: Endpoints::default(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl std::fmt::Debug for ComponentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentConfig")
            .field("component_appid", &self.component_appid)
            .field("component_secret", &"[REDACTED]")
            .field("endpoints", &self.endpoints)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Upstream endpoint bases.
///
/// Defaults point at production; overriding them is how tests aim the client
/// at a local server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Endpoints {
    /// Component API base (`api_component_token`, `api_query_auth`, ...).
    #[serde(default = "default_component_api_base")]
    pub component_api_base: String,
    /// End-user OAuth token base (`access_token`, `refresh_token`).
    #[serde(default = "default_sns_oauth_base")]
    pub sns_oauth_base: String,
    /// Mini-program session base (`jscode2session`).
    #[serde(default = "default_sns_base")]
    pub sns_base: String,
    /// Component login page shown to authorizer admins.
    #[serde(default = "default_login_page")]
    pub login_page: String,
    /// End-user OAuth consent page.
    #[serde(default = "default_oauth_authorize")]
    pub oauth_authorize: String,
}

fn default_component_api_base() -> String {
    "https://api.weixin.qq.com/cgi-bin/component".to_string()
}

fn default_sns_oauth_base() -> String {
    "https://api.weixin.qq.com/sns/oauth2/component".to_string()
}

fn default_sns_base() -> String {
    "https://api.weixin.qq.com/sns/component".to_string()
}

fn default_login_page() -> String {
    "https://mp.weixin.qq.com/cgi-bin/componentloginpage".to_string()
}

fn default_oauth_authorize() -> String {
    "https://open.weixin.qq.com/connect/oauth2/authorize".to_string()
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            component_api_base: default_component_api_base(),
            sns_oauth_base: default_sns_oauth_base(),
            sns_base: default_sns_base(),
            login_page: default_login_page(),
            oauth_authorize: default_oauth_authorize(),
        }
    }
}

//! Configuration Builder
//!
//! Fluent builder for component configuration.

use secrecy::SecretString;
use std::time::Duration;

use crate::error::{ConfigurationError, WechatError};
use crate::types::{ComponentConfig, Endpoints, DEFAULT_TIMEOUT_MS};

/// Component configuration builder.
#[derive(Default)]
pub struct ComponentConfigBuilder {
    component_appid: Option<String>,
    component_secret: Option<SecretString>,
    endpoints: Endpoints,
    timeout: Duration,
}

impl ComponentConfigBuilder {
    /// Create a new configuration builder.
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            ..Default::default()
        }
    }

    /// Set the component appid.
    pub fn component_appid(mut self, component_appid: impl Into<String>) -> Self {
        self.component_appid = Some(component_appid.into());
        self
    }

    /// Set the component appsecret.
    pub fn component_secret(mut self, component_secret: impl Into<String>) -> Self {
        self.component_secret = Some(SecretString::new(component_secret.into()));
        self
    }

    /// Replace all endpoint bases at once.
    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Set the component API base.
    pub fn component_api_base(mut self, base: impl Into<String>) -> Self {
        self.endpoints.component_api_base = base.into();
        self
    }

    /// Set the end-user OAuth token base.
    pub fn sns_oauth_base(mut self, base: impl Into<String>) -> Self {
        self.endpoints.sns_oauth_base = base.into();
        self
    }

    /// Set the mini-program session base.
    pub fn sns_base(mut self, base: impl Into<String>) -> Self {
        self.endpoints.sns_base = base.into();
        self
    }

    /// Set the component login page.
    pub fn login_page(mut self, url: impl Into<String>) -> Self {
        self.endpoints.login_page = url.into();
        self
    }

    /// Set the end-user OAuth consent page.
    pub fn oauth_authorize(mut self, url: impl Into<String>) -> Self {
        self.endpoints.oauth_authorize = url.into();
        self
    }

    /// Set the HTTP timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the component configuration.
    pub fn build(self) -> Result<ComponentConfig, WechatError> {
        let component_appid = self.component_appid.ok_or_else(|| {
            WechatError::Configuration(ConfigurationError::MissingField {
                field: "component_appid".to_string(),
            })
        })?;

        let component_secret = self.component_secret.ok_or_else(|| {
            WechatError::Configuration(ConfigurationError::MissingField {
                field: "component_secret".to_string(),
            })
        })?;

        Ok(ComponentConfig {
            component_appid,
            component_secret,
            endpoints: self.endpoints,
            timeout: self.timeout,
        })
    }
}

/// Create a new component configuration builder.
pub fn component_config() -> ComponentConfigBuilder {
    ComponentConfigBuilder::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_success() {
        let config = ComponentConfigBuilder::new()
            .component_appid("wx1")
            .component_secret("secret-1")
            .component_api_base("http://127.0.0.1:9000/cgi-bin/component")
            .build()
            .unwrap();

        assert_eq!(config.component_appid, "wx1");
        assert_eq!(
            config.endpoints.component_api_base,
            "http://127.0.0.1:9000/cgi-bin/component"
        );
        assert_eq!(
            config.endpoints.sns_base,
            "https://api.weixin.qq.com/sns/component"
        );
        assert_eq!(config.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
    }

    #[test]
    fn test_builder_missing_component_appid() {
        let result = ComponentConfigBuilder::new()
            .component_secret("secret-1")
            .build();

        match result {
            Err(WechatError::Configuration(ConfigurationError::MissingField { field })) => {
                assert_eq!(field, "component_appid");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_builder_missing_component_secret() {
        let result = ComponentConfigBuilder::new().component_appid("wx1").build();
        assert!(result.is_err());
    }
}

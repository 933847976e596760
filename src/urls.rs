//! Browser-Facing URL Builders
//!
//! The two URLs a component hands to browsers: the authorization login page
//! for account owners, and the OAuth consent page for end users. Neither
//! performs I/O; the pre-auth code for the login page comes from
//! `AuthorizationService::create_pre_auth_code`.

use url::form_urlencoded;

use crate::error::{WechatError, WechatResult};
use crate::types::ComponentConfig;

fn require(name: &str, value: &str) -> WechatResult<()> {
    if value.is_empty() {
        return Err(WechatError::InvalidArgument {
            message: format!("{name} must not be empty"),
        });
    }
    Ok(())
}

/// Build the component login page URL an account owner visits to authorize.
///
/// `auth_type` narrows which account kinds the page offers; 3 (both official
/// accounts and mini programs) when unset. The redirect target is
/// interpolated un-encoded, which is what the login page expects.
pub fn component_login_url(
    config: &ComponentConfig,
    pre_auth_code: &str,
    redirect_uri: &str,
    auth_type: Option<u8>,
) -> WechatResult<String> {
    require("component_appid", &config.component_appid)?;
    require("pre_auth_code", pre_auth_code)?;
    require("redirect_uri", redirect_uri)?;

    Ok(format!(
        "{}?component_appid={}&pre_auth_code={}&redirect_uri={}&auth_type={}",
        config.endpoints.login_page,
        config.component_appid,
        pre_auth_code,
        redirect_uri,
        auth_type.unwrap_or(3),
    ))
}

/// Build the OAuth consent URL for an end user of one authorizer.
///
/// `scope` defaults to `snsapi_base`. The `#wechat_redirect` fragment is
/// required by the consent page.
pub fn oauth_authorize_url(
    config: &ComponentConfig,
    appid: &str,
    redirect_uri: &str,
    scope: Option<&str>,
    state: Option<&str>,
) -> WechatResult<String> {
    require("component_appid", &config.component_appid)?;
    require("appid", appid)?;
    require("redirect_uri", redirect_uri)?;

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    serializer
        .append_pair("appid", appid)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", scope.unwrap_or("snsapi_base"))
        .append_pair("state", state.unwrap_or(""))
        .append_pair("component_appid", &config.component_appid);
    let query = serializer.finish();

    Ok(format!(
        "{}?{}#wechat_redirect",
        config.endpoints.oauth_authorize, query
    ))
}

//! End-User OAuth Token
//!
//! Third credential family: per-user OAuth tokens obtained on behalf of an
//! authorizer, keyed by openid. Exchange and refresh go through the sns
//! endpoints, authenticated by the component token.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::error::{WechatError, WechatResult};
use crate::services::sns::{SnsService, SnsServiceTrait};
use crate::token::store::{user_key, TokenStore};
use crate::token::TokenManager;
use crate::types::{Credential, UserTokenResponse};

/// Persist the credential carried by a user token grant.
///
/// Keys by the openid the response names, which is how the grant first ties
/// a token to a user.
pub async fn store_user_grant(
    store: &dyn TokenStore,
    authorizer_appid: &str,
    response: &UserTokenResponse,
) -> WechatResult<Credential> {
    let mut credential = Credential::new(&response.access_token, response.expires_in);
    if let Some(refresh_token) = &response.refresh_token {
        credential = credential.with_refresh_token(refresh_token);
    }
    let key = user_key(authorizer_appid, &response.openid);
    store.save(&key, &credential).await?;
    Ok(credential)
}

/// Manages one end-user's OAuth token under one authorizer.
pub struct UserTokenManager {
    sns: SnsService,
    store: Arc<dyn TokenStore>,
    authorizer_appid: String,
    openid: String,
    store_key: String,
    refresh_gate: Mutex<()>,
}

impl UserTokenManager {
    /// Create a manager for one (authorizer, openid) pair.
    pub fn new(
        sns: SnsService,
        store: Arc<dyn TokenStore>,
        authorizer_appid: impl Into<String>,
        openid: impl Into<String>,
    ) -> Self {
        let authorizer_appid = authorizer_appid.into();
        let openid = openid.into();
        let store_key = user_key(&authorizer_appid, &openid);
        Self {
            sns,
            store,
            authorizer_appid,
            openid,
            store_key,
            refresh_gate: Mutex::new(()),
        }
    }

    /// The authorizer this user belongs to.
    pub fn authorizer_appid(&self) -> &str {
        &self.authorizer_appid
    }

    /// The user this manager serves.
    pub fn openid(&self) -> &str {
        &self.openid
    }

    /// Exchange a web authorization code and persist the resulting grant.
    ///
    /// The credential is saved under the openid the response names.
    #[instrument(skip(self, code), fields(authorizer_appid = %self.authorizer_appid))]
    pub async fn exchange_code(&self, code: &str) -> WechatResult<UserTokenResponse> {
        let response = self.sns.oauth_access_token(&self.authorizer_appid, code).await?;
        store_user_grant(self.store.as_ref(), &self.authorizer_appid, &response).await?;
        Ok(response)
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

        debug!(openid = %self.openid, "refreshing user access token");

        let response = self
            .sns
            .refresh_oauth_token(&self.authorizer_appid, &refresh_token)
            .await?;

        // Keep the previous refresh token when upstream does not rotate it.
        let refresh_token = response
            .refresh_token
            .filter(|rt| !rt.is_empty())
            .unwrap_or(refresh_token);
        let credential = Credential::new(response.access_token, response.expires_in)
            .with_refresh_token(refresh_token);
        self.store.save(&self.store_key, &credential).await?;
        Ok(credential)
    }
}

#[async_trait]
impl TokenManager for UserTokenManager {
    async fn get_cached_token(&self) -> WechatResult<Option<Credential>> {
        self.store.get(&self.store_key).await
    }

    #[instrument(skip(self), fields(openid = %self.openid))]
    async fn get_access_token(&self) -> WechatResult<Credential> {
        let observed = self
            .store
            .get(&self.store_key)
            .await?
            .map(|c| c.access_token);

        let _guard = self.refresh_gate.lock().await;

        if let Some(current) = self.store.get(&self.store_key).await? {
            if current.is_valid() && observed.as_ref() != Some(&current.access_token) {
                debug!("using user token minted by a concurrent refresh");
                return Ok(current);
            }
        }

        self.mint().await
    }
}

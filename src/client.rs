//! Component Client
//!
//! Facade wiring the transport, the token store and the credential managers
//! behind one entry point. Most applications build one of these at startup,
//! feed it verify tickets as the platform pushes them, and reach the API
//! through the service accessors.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::core::transport::{HttpTransport, ReqwestTransport};
use crate::dispatch::RequestDispatcher;
use crate::error::WechatResult;
use crate::services::{
    AuthorizationService, AuthorizationServiceTrait, CardService, SnsService, SnsServiceTrait,
};
use crate::token::{
    store_authorization, store_user_grant, AuthorizerTokenManager, ComponentTokenManager,
    InMemoryTokenStore, TicketCell, TokenStore, UserTokenManager,
};
use crate::types::{
    AuthorizationInfo, ComponentConfig, Credential, QueryAuthResponse, UserTokenResponse,
    VerifyTicket,
};
use crate::urls;

/// Client for a third-party platform component.
pub struct ComponentClient {
    config: Arc<ComponentConfig>,
    store: Arc<dyn TokenStore>,
    ticket_cell: Arc<TicketCell>,
    component_manager: Arc<ComponentTokenManager>,
    dispatcher: Arc<RequestDispatcher>,
    authorization: AuthorizationService,
    cards: CardService,
    sns: SnsService,
    authorizer_managers: Mutex<HashMap<String, Arc<AuthorizerTokenManager>>>,
}

impl ComponentClient {
    /// Create a client with the default transport and an in-memory store.
    pub fn new(config: ComponentConfig) -> WechatResult<Self> {
        let transport = Arc::new(ReqwestTransport::new(config.timeout)?);
        Ok(Self::with_components(
            config,
            transport,
            Arc::new(InMemoryTokenStore::new()),
        ))
    }

    /// Create a client from injected transport and store.
    pub fn with_components(
        config: ComponentConfig,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        let config = Arc::new(config);
        let ticket_cell = Arc::new(TicketCell::new());
        let component_manager = Arc::new(ComponentTokenManager::new(
            config.clone(),
            transport.clone(),
            store.clone(),
            ticket_cell.clone(),
        ));
        let dispatcher = Arc::new(RequestDispatcher::new(
            transport,
            component_manager.clone(),
        ));
        let authorization = AuthorizationService::new(config.clone(), dispatcher.clone());
        let cards = CardService::new(config.clone(), dispatcher.clone());
        let sns = SnsService::new(config.clone(), dispatcher.clone());

        Self {
            config,
            store,
            ticket_cell,
            component_manager,
            dispatcher,
            authorization,
            cards,
            sns,
            authorizer_managers: Mutex::new(HashMap::new()),
        }
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ComponentConfig {
        &self.config
    }

    /// The dispatcher, for calls outside the service surface.
    pub fn dispatcher(&self) -> Arc<RequestDispatcher> {
        self.dispatcher.clone()
    }

    /// Record a verify ticket pushed by the platform.
    pub async fn set_verify_ticket(&self, ticket: impl Into<String>) {
        self.ticket_cell.store(VerifyTicket::new(ticket)).await;
    }

    /// The component's own token manager.
    pub fn component_tokens(&self) -> Arc<ComponentTokenManager> {
        self.component_manager.clone()
    }

    /// The token manager for one authorizer.
    ///
    /// Managers are cached per appid so concurrent refreshes of the same
    /// authorizer coalesce.
    pub fn authorizer_tokens(&self, authorizer_appid: &str) -> Arc<AuthorizerTokenManager> {
        let mut managers = self.authorizer_managers.lock().unwrap();
        managers
            .entry(authorizer_appid.to_string())
            .or_insert_with(|| {
                Arc::new(AuthorizerTokenManager::new(
                    self.config.clone(),
                    self.dispatcher.clone(),
                    self.store.clone(),
                    authorizer_appid,
                ))
            })
            .clone()
    }

    /// A token manager for one end user of one authorizer.
    pub fn user_tokens(&self, authorizer_appid: &str, openid: &str) -> UserTokenManager {
        UserTokenManager::new(
            self.sns.clone(),
            self.store.clone(),
            authorizer_appid,
            openid,
        )
    }

    /// Authorization lifecycle calls.
    pub fn authorization(&self) -> &AuthorizationService {
        &self.authorization
    }

    /// Card delegation calls.
    pub fn cards(&self) -> &CardService {
        &self.cards
    }

    /// End-user OAuth calls.
    pub fn sns(&self) -> &SnsService {
        &self.sns
    }

    /// Create a pre-auth code and build the login page URL for it.
    pub async fn authorize_url(
        &self,
        redirect_uri: &str,
        auth_type: Option<u8>,
    ) -> WechatResult<String> {
        let code = self.authorization.create_pre_auth_code().await?;
        urls::component_login_url(&self.config, &code.pre_auth_code, redirect_uri, auth_type)
    }

    /// Build the OAuth consent URL for an end user of one authorizer.
    pub fn oauth_authorize_url(
        &self,
        appid: &str,
        redirect_uri: &str,
        scope: Option<&str>,
        state: Option<&str>,
    ) -> WechatResult<String> {
        urls::oauth_authorize_url(&self.config, appid, redirect_uri, scope, state)
    }

    /// Exchange an authorization code and persist the authorizer's grant.
    pub async fn complete_authorization(
        &self,
        authorization_code: &str,
    ) -> WechatResult<QueryAuthResponse> {
        let response = self.authorization.query_auth(authorization_code).await?;
        store_authorization(
            self.store.as_ref(),
            &self.config.component_appid,
            &response.authorization_info,
        )
        .await?;
        Ok(response)
    }

    /// Persist an authorization grant obtained out of band.
    pub async fn store_authorization(&self, info: &AuthorizationInfo) -> WechatResult<Credential> {
        store_authorization(self.store.as_ref(), &self.config.component_appid, info).await
    }

    /// Exchange a web authorization code for an end-user token and persist it.
    pub async fn exchange_user_code(
        &self,
        appid: &str,
        code: &str,
    ) -> WechatResult<UserTokenResponse> {
        let response = self.sns.oauth_access_token(appid, code).await?;
        store_user_grant(self.store.as_ref(), appid, &response).await?;
        Ok(response)
    }
}

//! WeChat Third-Party Platform Component
//!
//! Credential management for a WeChat Open Platform component: the component
//! access token minted from pushed verify tickets, per-authorizer tokens
//! refreshed from stored refresh tokens, and end-user OAuth tokens. Every API
//! call goes through one dispatcher that validates the cached credential,
//! injects it into the query string and retries exactly once when upstream
//! rejects the token.
//!
//! # Features
//!
//! - Component access token lifecycle from pushed verify tickets
//! - Authorizer token refresh chained through the component token
//! - End-user OAuth code exchange, refresh and mini-program sessions
//! - Authorization lifecycle calls (pre-auth codes, grants, options, quota)
//! - Card delegation calls (agent and merchant qualification)
//! - Pluggable token store and HTTP transport
//!
//! # Example
//!
//! ```rust,ignore
//! use wechat_component::{component_config, ComponentClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = component_config()
//!         .component_appid("wx0123456789abcdef")
//!         .component_secret("the-component-secret")
//!         .build()?;
//!     let client = ComponentClient::new(config)?;
//!
//!     // The platform pushes a fresh verify ticket every few minutes.
//!     client.set_verify_ticket("ticket-from-the-push").await;
//!
//!     // Send an account owner to the authorization page.
//!     let url = client
//!         .authorize_url("https://example.com/callback", None)
//!         .await?;
//!     println!("authorize at: {url}");
//!
//!     // After the redirect, exchange and persist the grant.
//!     let grant = client.complete_authorization("the-auth-code").await?;
//!     let token = client
//!         .authorizer_tokens(&grant.authorization_info.authorizer_appid)
//!         .get_access_token()
//!         .await?;
//!     println!("authorizer token: {}", token.access_token);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: credentials, configuration and wire payloads
//! - `error`: error hierarchy with stable error codes
//! - `core`: HTTP transport and response envelope decoding
//! - `token`: the three credential managers and the token store
//! - `dispatch`: cache validation, token injection and the bounded retry
//! - `services`: endpoint families (authorization, card, sns)
//! - `urls`: browser-facing URL builders
//! - `builders`: fluent configuration builder
//! - `client`: high-level component client combining all functionality

pub mod builders;
pub mod client;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod services;
pub mod token;
pub mod types;
pub mod urls;

// Re-export main client
pub use client::ComponentClient;

// Re-export builders
pub use builders::{component_config, ComponentConfigBuilder};

// Re-export errors
pub use error::{
    ConfigurationError, ResponseError, StorageError, TransportError, WechatError, WechatResult,
    INVALID_CREDENTIAL_CODE,
};

// Re-export types
pub use types::{
    // Credential
    expiry_from_ttl, now_ms, Credential, VerifyTicket, EXPIRY_SKEW_SECS,
    // Config
    ComponentConfig, Endpoints, DEFAULT_TIMEOUT_MS,
    // Requests and responses
    ApiRequest, AuthorizationInfo, AuthorizerOptionResponse, AuthorizerTokenResponse,
    ComponentTokenResponse, PreAuthCodeResponse, QueryAuthResponse, SessionResponse,
    TokenQueryKey, UserTokenResponse,
};

// Re-export core components
pub use core::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockTransport, ReqwestTransport,
};

// Re-export dispatch
pub use dispatch::RequestDispatcher;

// Re-export token management
pub use token::{
    // Store
    authorizer_key, component_key, user_key, InMemoryTokenStore, MockTokenStore, TokenStore,
    // Managers
    store_authorization, store_user_grant, AuthorizerTokenManager, ComponentTokenManager,
    MockTokenManager, TicketCell, TicketProvider, TokenManager, UserTokenManager,
};

// Re-export services
pub use services::{
    AuthorizationService, AuthorizationServiceTrait, CardService, CardServiceTrait, SnsService,
    SnsServiceTrait,
};

// Re-export URL builders
pub use urls::{component_login_url, oauth_authorize_url};

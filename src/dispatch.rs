//! Request Dispatcher
//!
//! The authenticated-call wrapper. One logical call runs a small bounded
//! machine: use the cached credential if it is valid, otherwise refresh;
//! inject the token and execute; on the upstream invalid-credential code,
//! force one refresh and retry once; everything else is terminal.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{instrument, warn};
use url::Url;

use crate::core::envelope::parse_payload;
use crate::core::transport::{HttpRequest, HttpTransport};
use crate::error::{ConfigurationError, ResponseError, WechatResult};
use crate::token::TokenManager;
use crate::types::{ApiRequest, Credential};

/// Executes API calls authenticated by one token manager.
///
/// The manager decides what "refresh" means (component mint, authorizer
/// refresh grant, user refresh grant); the dispatcher only owns the retry
/// discipline.
pub struct RequestDispatcher {
    transport: Arc<dyn HttpTransport>,
    manager: Arc<dyn TokenManager>,
}

impl RequestDispatcher {
    /// Create a dispatcher over a transport and a token manager.
    pub fn new(transport: Arc<dyn HttpTransport>, manager: Arc<dyn TokenManager>) -> Self {
        Self { transport, manager }
    }

    /// Execute a call and return the envelope-stripped payload.
    #[instrument(skip(self, request), fields(url = %request.url))]
    pub async fn execute(&self, request: ApiRequest) -> WechatResult<Value> {
        let mut retried = false;
        let mut credential = match self.manager.get_cached_token().await? {
            Some(cached) if cached.is_valid() => cached,
            _ => self.manager.get_access_token().await?,
        };

        loop {
            let http_request = build_http_request(&request, &credential)?;
            let response = self.transport.send(http_request).await?.ensure_success()?;

            match parse_payload(&response.body) {
                Err(e) if e.is_credential_rejection() && !retried => {
                    // One forced refresh per logical call. A second rejection
                    // means the credential chain itself is broken.
                    retried = true;
                    warn!("access token rejected upstream, forcing a refresh");
                    credential = self.manager.get_access_token().await?;
                }
                other => return other,
            }
        }
    }

    /// Execute a call and deserialize the payload into `T`.
    pub async fn execute_as<T: DeserializeOwned>(&self, request: ApiRequest) -> WechatResult<T> {
        let payload = self.execute(request).await?;
        serde_json::from_value(payload).map_err(|e| {
            ResponseError::Decode {
                message: e.to_string(),
            }
            .into()
        })
    }
}

fn build_http_request(request: &ApiRequest, credential: &Credential) -> WechatResult<HttpRequest> {
    let mut url = Url::parse(&request.url).map_err(|_| ConfigurationError::InvalidEndpoint {
        url: request.url.clone(),
    })?;

    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair(request.token_key.as_str(), &credential.access_token);
        for (key, value) in &request.query {
            pairs.append_pair(key, value);
        }
    }

    let body = request.body.as_ref().map(Value::to_string);
    let mut headers = HashMap::new();
    if body.is_some() {
        headers.insert("content-type".to_string(), "application/json".to_string());
    }

    Ok(HttpRequest {
        method: request.method,
        url: url.into(),
        headers,
        body,
        timeout: None,
    })
}

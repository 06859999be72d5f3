//! OAuth2 client variants and the authorization-code exchange capability.

use crate::cache::CacheSession;
use crate::callback::ParsedCallback;
use crate::config::OAuth2ClientConfig;
use crate::error::{ExchangeError, ExchangeResult};
use crate::exchange::RedirectExchangeRequest;
use crate::pkce::{PkceChallenge, generate_state, resolve_verifier};
use crate::types::OAuth2Token;
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

/// Capability to exchange a validated authorization-code callback for tokens.
///
/// Implemented per client variant; the orchestrator dispatches on this trait
/// rather than on concrete client types, so new grant flows plug in without
/// touching the dispatch logic.
#[async_trait]
pub trait CodeExchange: Send + Sync {
    fn config(&self) -> &OAuth2ClientConfig;

    /// Perform the token request for an already-parsed and validated callback.
    async fn exchange(
        &self,
        callback: &ParsedCallback,
        request: &RedirectExchangeRequest,
        cache_session: &dyn CacheSession,
    ) -> ExchangeResult<OAuth2Token>;
}

/// Handle to an OAuth2 client of any variant.
///
/// A variant without an authorization-code exchange strategy returns `None`
/// from [`code_exchange`](Self::code_exchange) and the orchestrator surfaces
/// [`ExchangeError::UnsupportedClient`].
pub trait OAuth2ClientHandle: Send + Sync {
    fn variant_name(&self) -> &'static str;

    fn code_exchange(&self) -> Option<&dyn CodeExchange>;
}

/// Confidential-client authorization-code flow without PKCE.
#[derive(Clone)]
pub struct StandardOAuth2Client {
    config: OAuth2ClientConfig,
    http_client: Client,
}

impl StandardOAuth2Client {
    pub fn new(config: OAuth2ClientConfig) -> Self {
        let http_client = build_http_client(config.http_timeout_seconds);
        Self {
            config,
            http_client,
        }
    }

    pub fn config(&self) -> &OAuth2ClientConfig {
        &self.config
    }

    /// Build the authorization URL for login initiation.
    pub fn authorization_url(&self, state: &str) -> ExchangeResult<String> {
        let url = build_authorization_url(&self.config, state, None)?;
        Ok(url.to_string())
    }
}

#[async_trait]
impl CodeExchange for StandardOAuth2Client {
    fn config(&self) -> &OAuth2ClientConfig {
        &self.config
    }

    async fn exchange(
        &self,
        callback: &ParsedCallback,
        request: &RedirectExchangeRequest,
        _cache_session: &dyn CacheSession,
    ) -> ExchangeResult<OAuth2Token> {
        if request.expected_state.is_none() {
            warn!("no expected_state supplied; CSRF state verification skipped for standard exchange");
        }

        let code = require_code(callback)?;

        let mut params = HashMap::new();
        params.insert("grant_type", "authorization_code");
        params.insert("code", code);
        params.insert("redirect_uri", &self.config.redirect_uri);
        params.insert("client_id", &self.config.client_id);
        if let Some(secret) = &self.config.client_secret {
            params.insert("client_secret", secret);
        }

        // delete_after is accepted for interface parity; no verifier is
        // stored for the standard flow, so there is nothing to delete.
        request_token(&self.http_client, &self.config, &params).await
    }
}

impl OAuth2ClientHandle for StandardOAuth2Client {
    fn variant_name(&self) -> &'static str {
        "standard"
    }

    fn code_exchange(&self) -> Option<&dyn CodeExchange> {
        Some(self)
    }
}

/// Authorization-code flow with PKCE (RFC 7636).
///
/// The code verifier is recovered from the cache session keyed by the
/// callback's `state`, with an optional caller-supplied fallback.
#[derive(Clone)]
pub struct PkceOAuth2Client {
    config: OAuth2ClientConfig,
    http_client: Client,
}

/// Everything the caller needs after initiating a PKCE login: the URL to
/// redirect the user to, and the state/verifier pair that was cached.
#[derive(Debug, Clone)]
pub struct AuthorizationTicket {
    pub url: String,
    pub state: String,
    pub code_verifier: String,
}

impl PkceOAuth2Client {
    pub fn new(config: OAuth2ClientConfig) -> Self {
        let http_client = build_http_client(config.http_timeout_seconds);
        Self {
            config,
            http_client,
        }
    }

    pub fn config(&self) -> &OAuth2ClientConfig {
        &self.config
    }

    /// Initiate a PKCE login: generate state and PKCE pair, cache the
    /// verifier keyed by state, and build the authorization URL.
    pub async fn begin_authorization(
        &self,
        cache_session: &dyn CacheSession,
        verifier_ttl_seconds: u64,
    ) -> ExchangeResult<AuthorizationTicket> {
        let state = generate_state();
        let pkce = PkceChallenge::generate();

        cache_session
            .set(&state, pkce.code_verifier.clone(), verifier_ttl_seconds)
            .await?;

        let url = build_authorization_url(&self.config, &state, Some(&pkce))?;
        debug!("initiated PKCE authorization flow");

        Ok(AuthorizationTicket {
            url: url.to_string(),
            state,
            code_verifier: pkce.code_verifier,
        })
    }
}

#[async_trait]
impl CodeExchange for PkceOAuth2Client {
    fn config(&self) -> &OAuth2ClientConfig {
        &self.config
    }

    async fn exchange(
        &self,
        callback: &ParsedCallback,
        request: &RedirectExchangeRequest,
        cache_session: &dyn CacheSession,
    ) -> ExchangeResult<OAuth2Token> {
        let code = require_code(callback)?;

        let code_verifier = resolve_verifier(
            callback.state.as_deref(),
            request.code_verifier.as_deref(),
            cache_session,
        )
        .await?;

        let mut params = HashMap::new();
        params.insert("grant_type", "authorization_code");
        params.insert("code", code);
        params.insert("redirect_uri", &self.config.redirect_uri);
        params.insert("client_id", &self.config.client_id);
        params.insert("code_verifier", &code_verifier);
        // Public clients have no secret to present
        if let Some(secret) = &self.config.client_secret {
            params.insert("client_secret", secret);
        }

        let token = request_token(&self.http_client, &self.config, &params).await?;

        // Only after the provider accepted the code: a failed exchange must
        // leave the cached verifier intact for a retry.
        if request.delete_after {
            if let Some(state) = callback.state.as_deref() {
                match cache_session.delete(state).await {
                    Ok(removed) => {
                        debug!(removed, "cleaned up cached verifier after exchange")
                    }
                    Err(e) => warn!("failed to delete cached verifier: {e}"),
                }
            }
        }

        Ok(token)
    }
}

impl OAuth2ClientHandle for PkceOAuth2Client {
    fn variant_name(&self) -> &'static str {
        "pkce"
    }

    fn code_exchange(&self) -> Option<&dyn CodeExchange> {
        Some(self)
    }
}

fn build_http_client(timeout_seconds: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .expect("Failed to create HTTP client")
}

fn require_code(callback: &ParsedCallback) -> ExchangeResult<&str> {
    callback.code.as_deref().ok_or_else(|| {
        ExchangeError::MalformedCallback("callback carries no authorization code".to_string())
    })
}

fn build_authorization_url(
    config: &OAuth2ClientConfig,
    state: &str,
    pkce: Option<&PkceChallenge>,
) -> ExchangeResult<Url> {
    let mut url = Url::parse(&config.authorization_endpoint).map_err(|e| {
        ExchangeError::Config(format!(
            "invalid authorization endpoint {}: {e}",
            config.authorization_endpoint
        ))
    })?;

    {
        let mut params = url.query_pairs_mut();
        params.append_pair("response_type", "code");
        params.append_pair("client_id", &config.client_id);
        params.append_pair("redirect_uri", &config.redirect_uri);
        params.append_pair("state", state);

        if !config.scopes.is_empty() {
            params.append_pair("scope", &config.scopes.join(" "));
        }

        if let Some(pkce) = pkce {
            params.append_pair("code_challenge", &pkce.code_challenge);
            params.append_pair("code_challenge_method", &pkce.code_challenge_method);
        }
    }

    Ok(url)
}

/// POST the form-encoded grant to the token endpoint and decode the response.
async fn request_token(
    http_client: &Client,
    config: &OAuth2ClientConfig,
    params: &HashMap<&str, &str>,
) -> ExchangeResult<OAuth2Token> {
    let response = http_client
        .post(&config.token_endpoint)
        .form(params)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        error!(status = status.as_u16(), "token exchange rejected: {body}");
        return Err(ExchangeError::Provider {
            status: status.as_u16(),
            body,
        });
    }

    let token: OAuth2Token = response
        .json()
        .await
        .map_err(|e| ExchangeError::InvalidTokenResponse(e.to_string()))?;

    info!("exchanged authorization code for tokens");
    Ok(token)
}

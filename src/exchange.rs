//! Exchange request model and the redirect-URL exchange orchestrator.

use crate::cache::CacheSession;
use crate::callback::{ParsedCallback, ensure_redirect_uri_match};
use crate::client::OAuth2ClientHandle;
use crate::error::{ExchangeError, ExchangeResult};
use crate::types::OAuth2Token;
use tracing::debug;
use url::Url;

/// Parameters for exchanging an authorization-code callback for tokens.
///
/// Defaults: redirect-URI matching on, no expected state (the PKCE cache
/// lookup still binds `state` server-side), no fallback verifier, cached
/// verifier deleted after a successful exchange.
#[derive(Debug, Clone)]
pub struct RedirectExchangeRequest {
    /// The full inbound callback URL, query string included.
    pub redirect_url: String,
    /// Validate scheme+host+path against the client's configured redirect URI.
    pub enforce_redirect_uri_match: bool,
    /// CSRF check: a `state` value the caller stored server-side.
    pub expected_state: Option<String>,
    /// PKCE fallback verifier, used only when the cache entry is absent.
    /// Ignored by the standard flow.
    pub code_verifier: Option<String>,
    /// Delete the cached verifier after a successful exchange. No-op for the
    /// standard flow.
    pub delete_after: bool,
}

impl RedirectExchangeRequest {
    pub fn new(redirect_url: impl Into<String>) -> Self {
        Self {
            redirect_url: redirect_url.into(),
            enforce_redirect_uri_match: true,
            expected_state: None,
            code_verifier: None,
            delete_after: true,
        }
    }

    pub fn with_expected_state(mut self, state: impl Into<String>) -> Self {
        self.expected_state = Some(state.into());
        self
    }

    pub fn with_code_verifier(mut self, verifier: impl Into<String>) -> Self {
        self.code_verifier = Some(verifier.into());
        self
    }

    pub fn without_redirect_uri_match(mut self) -> Self {
        self.enforce_redirect_uri_match = false;
        self
    }

    /// Keep the cached verifier after a successful exchange.
    pub fn keep_verifier(mut self) -> Self {
        self.delete_after = false;
        self
    }
}

/// Exchange an authorization-code callback for tokens.
///
/// The single public entry point: parses the redirect URL, validates it
/// against the client configuration and CSRF policy, then delegates to the
/// client variant's [`CodeExchange`](crate::client::CodeExchange) capability.
/// All error kinds propagate unchanged; nothing here retries, since
/// authorization codes are single-use.
pub async fn exchange_from_redirect_url(
    client: &dyn OAuth2ClientHandle,
    request: &RedirectExchangeRequest,
    cache_session: &dyn CacheSession,
) -> ExchangeResult<OAuth2Token> {
    let exchanger = client
        .code_exchange()
        .ok_or_else(|| ExchangeError::UnsupportedClient(client.variant_name().to_string()))?;

    let url = Url::parse(&request.redirect_url)
        .map_err(|e| ExchangeError::MalformedCallback(format!("{}: {e}", request.redirect_url)))?;
    let callback = ParsedCallback::from_url(&url)?;

    if request.enforce_redirect_uri_match {
        ensure_redirect_uri_match(&url, &exchanger.config().redirect_uri)?;
    }

    // CSRF checks run before honoring a provider-supplied error parameter,
    // so a forged callback cannot pick its own failure mode.
    if let Some(expected) = &request.expected_state {
        callback.ensure_state(expected)?;
    }

    callback.ensure_not_denied()?;

    debug!(variant = client.variant_name(), "callback validated, exchanging code");
    exchanger.exchange(&callback, request, cache_session).await
}

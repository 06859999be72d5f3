//! Exchange error taxonomy.
//!
//! Validation failures, provider rejections, and transport failures carry
//! distinct variants so callers can tell a malformed callback apart from a
//! provider that rejected the code or was unreachable.

use thiserror::Error;

pub type ExchangeResult<T> = Result<T, ExchangeError>;

#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The redirect URL could not be parsed, or carried neither `code` nor `error`.
    #[error("malformed callback URL: {0}")]
    MalformedCallback(String),

    /// The provider returned an `error` parameter on the callback. No network
    /// call is made for these.
    #[error("provider denied authorization: {error}")]
    ProviderDenied {
        error: String,
        error_description: Option<String>,
    },

    /// The callback URL does not match the client's configured redirect URI.
    #[error("redirect URI mismatch: expected {expected}, got {actual}")]
    RedirectUriMismatch { expected: String, actual: String },

    /// The `state` parameter does not match the value the caller expected.
    #[error("state parameter mismatch")]
    StateMismatch {
        expected: String,
        actual: Option<String>,
    },

    /// No PKCE code verifier could be resolved for the callback's `state`,
    /// neither from the cache nor from a caller-supplied fallback.
    #[error("no PKCE code verifier available for state")]
    MissingVerifier,

    /// The token endpoint answered with a non-2xx status.
    #[error("token endpoint returned {status}: {body}")]
    Provider { status: u16, body: String },

    /// Transport-level failure reaching the token endpoint (including timeouts).
    #[error("network error during token exchange: {0}")]
    Network(#[from] reqwest::Error),

    /// The token endpoint answered 2xx but the body did not decode as a token.
    #[error("invalid token response: {0}")]
    InvalidTokenResponse(String),

    /// The cache backend failed during verifier lookup or cleanup.
    #[error("cache backend error: {0}")]
    Cache(String),

    /// Invalid client configuration, e.g. an unparseable endpoint URL.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The client variant has no registered authorization-code exchange strategy.
    #[error("unsupported OAuth2 client variant: {0}")]
    UnsupportedClient(String),
}

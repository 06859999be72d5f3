//! OAuth2 authorization-code exchange with PKCE support.
//!
//! This crate implements the callback half of the OAuth2 Authorization Code
//! flow: it takes the full redirect URL returned by an identity provider,
//! validates it (redirect-URI match, CSRF state, provider-reported errors),
//! recovers the PKCE code verifier from a cache session keyed by `state`,
//! and exchanges the authorization code for tokens exactly once.
//!
//! The cache backend and the HTTP routing layer are injected through narrow
//! traits; client variants plug into the orchestrator through the
//! [`CodeExchange`] capability rather than concrete types.

mod cache;
mod callback;
mod client;
mod config;
mod error;
mod exchange;
mod pkce;
mod types;


pub use cache::{CacheSession, InMemoryCacheSession};
pub use callback::{ParsedCallback, ensure_redirect_uri_match};
pub use client::{
    AuthorizationTicket, CodeExchange, OAuth2ClientHandle, PkceOAuth2Client, StandardOAuth2Client,
};
pub use config::OAuth2ClientConfig;
pub use error::{ExchangeError, ExchangeResult};
pub use exchange::{RedirectExchangeRequest, exchange_from_redirect_url};
pub use pkce::{PkceChallenge, generate_state, resolve_verifier};
pub use types::OAuth2Token;

//! PKCE material generation and verifier resolution.

use crate::cache::CacheSession;
use crate::error::{ExchangeError, ExchangeResult};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, thread_rng};
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

/// PKCE code challenge and verifier
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub code_verifier: String,
    pub code_challenge: String,
    pub code_challenge_method: String,
}

impl Default for PkceChallenge {
    fn default() -> Self {
        Self::generate()
    }
}

impl PkceChallenge {
    /// Generate a new PKCE pair using the S256 method.
    pub fn generate() -> Self {
        let code_verifier = Self::generate_code_verifier();
        let code_challenge = Self::generate_code_challenge(&code_verifier);

        Self {
            code_verifier,
            code_challenge,
            code_challenge_method: "S256".to_string(),
        }
    }

    fn generate_code_verifier() -> String {
        let mut rng = thread_rng();
        let bytes: Vec<u8> = (0..64).map(|_| rng.r#gen::<u8>()).collect();
        URL_SAFE_NO_PAD.encode(bytes)
    }

    fn generate_code_challenge(verifier: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(verifier.as_bytes());
        let result = hasher.finalize();
        URL_SAFE_NO_PAD.encode(result)
    }
}

/// Generate an unguessable `state` parameter.
pub fn generate_state() -> String {
    Uuid::new_v4().to_string()
}

/// Resolve the PKCE code verifier for a callback.
///
/// The cache entry keyed by `state` is authoritative; the caller-supplied
/// fallback is consulted only when the cache entry is absent (TTL expiry, or
/// a deployment where the verifier was kept client-side). A cache backend
/// failure propagates as [`ExchangeError::Cache`] rather than falling through
/// to the fallback. When both sources are absent the exchange fails with
/// [`ExchangeError::MissingVerifier`] before any network call.
pub async fn resolve_verifier(
    state: Option<&str>,
    fallback_verifier: Option<&str>,
    cache_session: &dyn CacheSession,
) -> ExchangeResult<String> {
    if let Some(state) = state {
        if let Some(verifier) = cache_session.get(state).await? {
            debug!("resolved PKCE verifier from cache");
            return Ok(verifier);
        }
    }

    if let Some(verifier) = fallback_verifier {
        debug!("resolved PKCE verifier from caller-supplied fallback");
        return Ok(verifier.to_string());
    }

    Err(ExchangeError::MissingVerifier)
}

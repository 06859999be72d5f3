//! Redirect-URL parsing and callback validation.

use crate::error::{ExchangeError, ExchangeResult};
use serde::{Deserialize, Serialize};
use tracing::error;
use url::Url;

/// Query parameters extracted from a provider callback URL.
///
/// Built once per exchange attempt and not mutated afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl ParsedCallback {
    /// Parse a full redirect URL into its callback parameters.
    ///
    /// Fails with [`ExchangeError::MalformedCallback`] if the URL is not an
    /// absolute parseable URL, or if it carries neither `code` nor `error`.
    pub fn parse(redirect_url: &str) -> ExchangeResult<Self> {
        let url = Url::parse(redirect_url)
            .map_err(|e| ExchangeError::MalformedCallback(format!("{redirect_url}: {e}")))?;
        Self::from_url(&url)
    }

    pub fn from_url(url: &Url) -> ExchangeResult<Self> {
        let mut callback = ParsedCallback::default();

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => callback.code = Some(value.into_owned()),
                "state" => callback.state = Some(value.into_owned()),
                "error" => callback.error = Some(value.into_owned()),
                "error_description" => callback.error_description = Some(value.into_owned()),
                _ => {}
            }
        }

        if callback.code.is_none() && callback.error.is_none() {
            return Err(ExchangeError::MalformedCallback(
                "callback URL carries neither code nor error".to_string(),
            ));
        }

        Ok(callback)
    }

    /// CSRF check: the parsed `state` must equal the expected value.
    pub fn ensure_state(&self, expected: &str) -> ExchangeResult<()> {
        if self.state.as_deref() == Some(expected) {
            Ok(())
        } else {
            Err(ExchangeError::StateMismatch {
                expected: expected.to_string(),
                actual: self.state.clone(),
            })
        }
    }

    /// Fail with [`ExchangeError::ProviderDenied`] if the provider reported an
    /// error on the callback. Runs before any network call.
    pub fn ensure_not_denied(&self) -> ExchangeResult<()> {
        if let Some(error) = &self.error {
            error!(error = %error, "authorization denied by provider");
            return Err(ExchangeError::ProviderDenied {
                error: error.clone(),
                error_description: self.error_description.clone(),
            });
        }
        Ok(())
    }
}

/// Compare the callback URL's scheme, host, port, and path against the
/// configured redirect URI. Query strings are ignored on both sides.
pub fn ensure_redirect_uri_match(url: &Url, configured_redirect_uri: &str) -> ExchangeResult<()> {
    let expected = Url::parse(configured_redirect_uri).map_err(|e| {
        ExchangeError::Config(format!(
            "configured redirect_uri is not a valid URL: {configured_redirect_uri}: {e}"
        ))
    })?;

    let matches = url.scheme() == expected.scheme()
        && url.host_str() == expected.host_str()
        && url.port_or_known_default() == expected.port_or_known_default()
        && url.path() == expected.path();

    if matches {
        Ok(())
    } else {
        // url.port() is None for the scheme's default port, so the port only
        // shows up when it actually deviates
        let actual = match url.port() {
            Some(port) => format!(
                "{}://{}:{}{}",
                url.scheme(),
                url.host_str().unwrap_or_default(),
                port,
                url.path()
            ),
            None => format!(
                "{}://{}{}",
                url.scheme(),
                url.host_str().unwrap_or_default(),
                url.path()
            ),
        };
        Err(ExchangeError::RedirectUriMismatch {
            expected: configured_redirect_uri.to_string(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_code_and_state() {
        let callback =
            ParsedCallback::parse("https://app.example/callback?code=abc&state=s1").unwrap();

        assert_eq!(callback.code, Some("abc".to_string()));
        assert_eq!(callback.state, Some("s1".to_string()));
        assert_eq!(callback.error, None);
    }

    #[test]
    fn test_parse_error_only() {
        let callback = ParsedCallback::parse(
            "https://app.example/callback?error=access_denied&error_description=user%20said%20no",
        )
        .unwrap();

        assert_eq!(callback.code, None);
        assert_eq!(callback.error, Some("access_denied".to_string()));
        assert_eq!(
            callback.error_description,
            Some("user said no".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_missing_code_and_error() {
        let result = ParsedCallback::parse("https://app.example/callback?state=s1");
        assert!(matches!(
            result,
            Err(ExchangeError::MalformedCallback(_))
        ));
    }

    #[test]
    fn test_parse_rejects_relative_url() {
        let result = ParsedCallback::parse("/callback?code=abc");
        assert!(matches!(
            result,
            Err(ExchangeError::MalformedCallback(_))
        ));
    }

    #[test]
    fn test_ensure_state_mismatch() {
        let callback =
            ParsedCallback::parse("https://app.example/callback?code=abc&state=s1").unwrap();

        assert!(callback.ensure_state("s1").is_ok());

        let result = callback.ensure_state("other");
        assert!(matches!(
            result,
            Err(ExchangeError::StateMismatch { .. })
        ));
    }

    #[test]
    fn test_ensure_state_absent() {
        let callback = ParsedCallback::parse("https://app.example/callback?code=abc").unwrap();

        let result = callback.ensure_state("s1");
        assert!(matches!(
            result,
            Err(ExchangeError::StateMismatch { actual: None, .. })
        ));
    }

    #[test]
    fn test_ensure_not_denied() {
        let ok = ParsedCallback::parse("https://app.example/callback?code=abc").unwrap();
        assert!(ok.ensure_not_denied().is_ok());

        let denied =
            ParsedCallback::parse("https://app.example/callback?error=access_denied").unwrap();
        let result = denied.ensure_not_denied();
        assert!(matches!(
            result,
            Err(ExchangeError::ProviderDenied { .. })
        ));
    }

    #[test]
    fn test_redirect_uri_match_ignores_query() {
        let url = Url::parse("https://app.example/callback?code=abc&state=s1").unwrap();
        assert!(ensure_redirect_uri_match(&url, "https://app.example/callback").is_ok());
    }

    #[test]
    fn test_redirect_uri_match_default_port() {
        let url = Url::parse("https://app.example:443/callback?code=abc").unwrap();
        assert!(ensure_redirect_uri_match(&url, "https://app.example/callback").is_ok());
    }

    #[test]
    fn test_redirect_uri_mismatch_host() {
        let url = Url::parse("https://app.example/callback?code=abc").unwrap();
        let result = ensure_redirect_uri_match(&url, "https://other.example/callback");
        assert!(matches!(
            result,
            Err(ExchangeError::RedirectUriMismatch { .. })
        ));
    }

    #[test]
    fn test_redirect_uri_mismatch_reports_nondefault_port() {
        let url = Url::parse("https://app.example:8443/callback?code=abc").unwrap();
        let result = ensure_redirect_uri_match(&url, "https://app.example/callback");
        match result {
            Err(ExchangeError::RedirectUriMismatch { expected, actual }) => {
                assert_eq!(expected, "https://app.example/callback");
                assert_eq!(actual, "https://app.example:8443/callback");
            }
            other => panic!("expected RedirectUriMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_redirect_uri_mismatch_path() {
        let url = Url::parse("https://app.example/other?code=abc").unwrap();
        let result = ensure_redirect_uri_match(&url, "https://app.example/callback");
        assert!(matches!(
            result,
            Err(ExchangeError::RedirectUriMismatch { .. })
        ));
    }
}

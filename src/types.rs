//! OAuth2 protocol types.

use serde::{Deserialize, Serialize};

/// Token set returned by a successful authorization-code exchange.
///
/// Immutable once produced; refresh and storage are the caller's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2Token {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: Option<u64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub id_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_deserialize_minimal() {
        let json = r#"{
            "access_token": "abc123",
            "token_type": "Bearer"
        }"#;

        let token: OAuth2Token = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "abc123");
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, None);
        assert_eq!(token.refresh_token, None);
    }

    #[test]
    fn test_token_deserialize_full() {
        let json = r#"{
            "access_token": "abc123",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "refresh456",
            "scope": "openid email",
            "id_token": "header.payload.sig"
        }"#;

        let token: OAuth2Token = serde_json::from_str(json).unwrap();
        assert_eq!(token.expires_in, Some(3600));
        assert_eq!(token.refresh_token, Some("refresh456".to_string()));
        assert_eq!(token.scope, Some("openid email".to_string()));
        assert_eq!(token.id_token, Some("header.payload.sig".to_string()));
    }
}

//! OAuth2 client configuration.

use serde::{Deserialize, Serialize};

/// Static configuration for an OAuth2 client.
///
/// Fixed at construction and never mutated during an exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2ClientConfig {
    pub client_id: String,
    /// None for public clients; the secret is then omitted from the token request.
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub scopes: Vec<String>,
    pub http_timeout_seconds: u64,
}

impl OAuth2ClientConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: Option<String>,
        redirect_uri: impl Into<String>,
        authorization_endpoint: impl Into<String>,
        token_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            redirect_uri: redirect_uri.into(),
            authorization_endpoint: authorization_endpoint.into(),
            token_endpoint: token_endpoint.into(),
            scopes: Vec::new(),
            http_timeout_seconds: 30,
        }
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_http_timeout(mut self, seconds: u64) -> Self {
        self.http_timeout_seconds = seconds;
        self
    }

    /// Whether this is a public client (no secret to present).
    pub fn is_public(&self) -> bool {
        self.client_secret.is_none()
    }
}

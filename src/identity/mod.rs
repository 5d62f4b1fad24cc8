//! Identity providers that issue the bearer credential.

pub mod cognito;

pub use cognito::{AuthTokens, CognitoAuth};

use async_trait::async_trait;
use thiserror::Error;

/// Sign-in failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The provider answered with an error document, e.g. `NotAuthorizedException`.
    #[error("{kind}: {message}")]
    Rejected { kind: String, message: String },

    /// Credentials are incomplete; no request was sent.
    #[error("missing Cognito settings: {0}")]
    NotConfigured(String),

    /// The provider wants an extra step (MFA, password change) instead of tokens.
    #[error("sign-in requires challenge {0}")]
    Challenge(String),

    #[error("identity provider request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected identity provider response: {0}")]
    Decode(String),
}

/// Source of the credential presented to the manifest service and tools.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Obtain an access token.
    async fn access_token(&self) -> Result<String, AuthError>;
}

/// A fixed, pre-issued token.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.0.clone())
    }
}

#[async_trait]
impl TokenProvider for CognitoAuth {
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.initiate_auth().await?.access_token)
    }
}

mod token_file;

pub use token_file::{AuthorizedUserFile, TokenFileProvider};

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Re-authorization required: {0}")]
    ReauthorizationRequired(String),
    #[error("Invalid token file: {0}")]
    InvalidTokenFile(String),
    #[error("Failed to read credentials: {0}")]
    Io(#[from] std::io::Error),
}

/// Bearer token sent with every Drive request.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Supplies a valid access token on demand.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn token(&self) -> Result<AccessToken, AuthError>;
}

/// A fixed token, typically taken from configuration or the environment.
pub struct StaticTokenProvider {
    token: AccessToken,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenProvider {
    async fn token(&self) -> Result<AccessToken, AuthError> {
        if self.token.secret().is_empty() {
            return Err(AuthError::ReauthorizationRequired(
                "configured access token is empty".to_string(),
            ));
        }
        Ok(self.token.clone())
    }
}

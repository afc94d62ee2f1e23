use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AccessToken, AuthError, CredentialProvider};

/// Authorized-user token file as written by the Google client libraries
/// after an installed-app consent flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizedUserFile {
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub expiry: Option<DateTime<Utc>>,
}

impl AuthorizedUserFile {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|expiry| expiry <= now)
    }
}

/// Reads the access token from an authorized-user file on every call, so a
/// token refreshed by another tool is picked up without restarting.
pub struct TokenFileProvider {
    path: PathBuf,
}

impl TokenFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read(&self) -> Result<AuthorizedUserFile, AuthError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AuthError::ReauthorizationRequired(format!(
                    "token file {} does not exist",
                    self.path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&raw).map_err(|e| AuthError::InvalidTokenFile(e.to_string()))
    }
}

#[async_trait]
impl CredentialProvider for TokenFileProvider {
    async fn token(&self) -> Result<AccessToken, AuthError> {
        let file = self.read().await?;
        if file.is_expired(Utc::now()) {
            return Err(AuthError::ReauthorizationRequired(format!(
                "access token in {} has expired",
                self.path.display()
            )));
        }
        let token = file
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AuthError::ReauthorizationRequired(format!(
                    "{} holds no access token",
                    self.path.display()
                ))
            })?;
        debug!(path = %self.path.display(), "Loaded access token");
        Ok(AccessToken::new(token))
    }
}

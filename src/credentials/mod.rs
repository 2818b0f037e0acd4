//! AWS credentials management.
//!
//! A connection owns its credentials for its whole lifetime and never
//! persists them. Credentials reach a connection through a
//! [`CredentialsProvider`]: either a fixed pair handed over by the caller or
//! one read from the environment.

mod env;

pub use env::EnvCredentialsProvider;

use crate::error::{AwsError, CredentialsError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// AWS credentials.
#[derive(Clone)]
pub struct AwsCredentials {
    access_key_id: String,
    secret_access_key: SecretString,
    session_token: Option<SecretString>,
    expiration: Option<DateTime<Utc>>,
}

impl AwsCredentials {
    /// Create new long-term credentials.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::new(secret_access_key.into()),
            session_token: None,
            expiration: None,
        }
    }

    /// Create new temporary credentials with a session token.
    pub fn with_session_token(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            session_token: Some(SecretString::new(session_token.into())),
            ..Self::new(access_key_id, secret_access_key)
        }
    }

    /// Create temporary credentials with expiration.
    pub fn temporary(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
        expiration: DateTime<Utc>,
    ) -> Self {
        Self {
            expiration: Some(expiration),
            ..Self::with_session_token(access_key_id, secret_access_key, session_token)
        }
    }

    /// Get the access key ID.
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Get the secret access key.
    ///
    /// Note: This exposes the secret. Use carefully and avoid logging.
    pub fn secret_access_key(&self) -> &str {
        self.secret_access_key.expose_secret()
    }

    /// Get the session token, if any.
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_ref().map(|s| s.expose_secret().as_str())
    }

    /// Get the expiration time, if any.
    pub fn expiration(&self) -> Option<&DateTime<Utc>> {
        self.expiration.as_ref()
    }

    /// Check if credentials have expired.
    pub fn is_expired(&self) -> bool {
        match &self.expiration {
            Some(exp) => Utc::now() >= *exp,
            None => false,
        }
    }

    /// Reject empty key material.
    pub fn validate(&self) -> Result<(), CredentialsError> {
        if self.access_key_id.is_empty() {
            return Err(CredentialsError::Invalid {
                message: "access key id is empty".to_string(),
            });
        }
        if self.secret_access_key().is_empty() {
            return Err(CredentialsError::Invalid {
                message: "secret access key is empty".to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Trait for credential providers.
#[async_trait]
pub trait CredentialsProvider: Send + Sync {
    /// Get credentials from this provider.
    async fn get_credentials(&self) -> Result<AwsCredentials, AwsError>;

    /// Provider name for logging/debugging.
    fn name(&self) -> &'static str;
}

/// Credentials provider holding one fixed pair.
pub struct StaticCredentialsProvider {
    credentials: AwsCredentials,
}

impl StaticCredentialsProvider {
    /// Create a new static credentials provider.
    pub fn new(credentials: AwsCredentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialsProvider for StaticCredentialsProvider {
    async fn get_credentials(&self) -> Result<AwsCredentials, AwsError> {
        if self.credentials.is_expired() {
            return Err(AwsError::Credentials(CredentialsError::Expired {
                expiration: self
                    .credentials
                    .expiration()
                    .map(|e| e.to_rfc3339())
                    .unwrap_or_default(),
            }));
        }
        Ok(self.credentials.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

impl fmt::Debug for StaticCredentialsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentialsProvider")
            .field("credentials", &self.credentials)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_credentials_new() {
        let creds = AwsCredentials::new("AKID", "SECRET");
        assert_eq!(creds.access_key_id(), "AKID");
        assert_eq!(creds.secret_access_key(), "SECRET");
        assert!(creds.session_token().is_none());
        assert!(creds.validate().is_ok());
    }

    #[test]
    fn test_credentials_validate_rejects_empty() {
        assert!(AwsCredentials::new("", "SECRET").validate().is_err());
        assert!(AwsCredentials::new("AKID", "").validate().is_err());
    }

    #[test]
    fn test_credentials_expiration() {
        let creds = AwsCredentials::new("AKID", "SECRET");
        assert!(!creds.is_expired());

        let expired =
            AwsCredentials::temporary("AKID", "SECRET", "TOKEN", Utc::now() - Duration::hours(1));
        assert!(expired.is_expired());
        assert_eq!(expired.session_token(), Some("TOKEN"));
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let creds = AwsCredentials::with_session_token("AKID", "SECRET", "TOKEN");
        let debug = format!("{:?}", creds);

        assert!(debug.contains("AKID"));
        assert!(!debug.contains("SECRET"));
        assert!(!debug.contains("TOKEN"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_static_provider() {
        let provider = StaticCredentialsProvider::new(AwsCredentials::new("AKID", "SECRET"));
        let creds = provider.get_credentials().await.unwrap();
        assert_eq!(creds.access_key_id(), "AKID");
        assert_eq!(provider.name(), "static");
    }

    #[tokio::test]
    async fn test_static_provider_expired() {
        let expired =
            AwsCredentials::temporary("AKID", "SECRET", "TOKEN", Utc::now() - Duration::hours(1));
        let provider = StaticCredentialsProvider::new(expired);

        let err = provider.get_credentials().await.unwrap_err();
        assert!(matches!(
            err,
            AwsError::Credentials(CredentialsError::Expired { .. })
        ));
    }
}

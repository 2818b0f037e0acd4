//! Environment variable credentials provider.

use super::{AwsCredentials, CredentialsProvider};
use crate::error::{AwsError, CredentialsError};
use async_trait::async_trait;
use std::env;

/// Standard access key variable.
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
/// Legacy access key variable, consulted when the standard one is unset.
pub const AWS_ACCESS_KEY: &str = "AWS_ACCESS_KEY";
/// Secret key variable.
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
/// Session token variable.
pub const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";

/// Credentials provider that reads from environment variables.
///
/// By default this reads `AWS_ACCESS_KEY_ID` (falling back to
/// `AWS_ACCESS_KEY`), `AWS_SECRET_ACCESS_KEY` and the optional
/// `AWS_SESSION_TOKEN`. Variables are read on every call.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentialsProvider {
    access_key_var: Option<String>,
    secret_key_var: Option<String>,
    session_token_var: Option<String>,
}

impl EnvCredentialsProvider {
    /// Create a new environment credentials provider with default variable names.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider with custom variable names.
    pub fn with_vars(
        access_key_var: impl Into<String>,
        secret_key_var: impl Into<String>,
        session_token_var: Option<String>,
    ) -> Self {
        Self {
            access_key_var: Some(access_key_var.into()),
            secret_key_var: Some(secret_key_var.into()),
            session_token_var,
        }
    }

    fn read_access_key(&self) -> Result<String, CredentialsError> {
        let value = match &self.access_key_var {
            Some(var) => env::var(var).ok(),
            None => env::var(AWS_ACCESS_KEY_ID)
                .ok()
                .or_else(|| env::var(AWS_ACCESS_KEY).ok()),
        };
        let name = self.access_key_var.as_deref().unwrap_or(AWS_ACCESS_KEY_ID);
        non_empty(value, name)
    }

    fn read_secret_key(&self) -> Result<String, CredentialsError> {
        let name = self
            .secret_key_var
            .as_deref()
            .unwrap_or(AWS_SECRET_ACCESS_KEY);
        non_empty(env::var(name).ok(), name)
    }

    fn read_session_token(&self) -> Option<String> {
        let name = self
            .session_token_var
            .as_deref()
            .unwrap_or(AWS_SESSION_TOKEN);
        env::var(name).ok().filter(|s| !s.is_empty())
    }
}

fn non_empty(value: Option<String>, name: &str) -> Result<String, CredentialsError> {
    match value {
        None => Err(CredentialsError::NotFound {
            message: format!("{} is not set", name),
        }),
        Some(v) if v.is_empty() => Err(CredentialsError::Invalid {
            message: format!("{} is empty", name),
        }),
        Some(v) => Ok(v),
    }
}

#[async_trait]
impl CredentialsProvider for EnvCredentialsProvider {
    async fn get_credentials(&self) -> Result<AwsCredentials, AwsError> {
        let access_key_id = self.read_access_key()?;
        let secret_access_key = self.read_secret_key()?;

        Ok(match self.read_session_token() {
            Some(token) => {
                AwsCredentials::with_session_token(access_key_id, secret_access_key, token)
            }
            None => AwsCredentials::new(access_key_id, secret_access_key),
        })
    }

    fn name(&self) -> &'static str {
        "environment"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own variable names so tests can run in parallel.

    #[tokio::test]
    async fn test_env_provider_custom_vars() {
        env::set_var("LIBAWS_TEST_A_KEY", "CUSTOM_AKID");
        env::set_var("LIBAWS_TEST_A_SECRET", "CUSTOM_SECRET");
        env::set_var("LIBAWS_TEST_A_TOKEN", "TOKEN");

        let provider = EnvCredentialsProvider::with_vars(
            "LIBAWS_TEST_A_KEY",
            "LIBAWS_TEST_A_SECRET",
            Some("LIBAWS_TEST_A_TOKEN".to_string()),
        );
        let creds = provider.get_credentials().await.unwrap();
        assert_eq!(creds.access_key_id(), "CUSTOM_AKID");
        assert_eq!(creds.secret_access_key(), "CUSTOM_SECRET");
        assert_eq!(creds.session_token(), Some("TOKEN"));
    }

    #[tokio::test]
    async fn test_env_provider_missing_var() {
        env::remove_var("LIBAWS_TEST_B_KEY");
        let provider = EnvCredentialsProvider::with_vars(
            "LIBAWS_TEST_B_KEY",
            "LIBAWS_TEST_B_SECRET",
            None,
        );
        let err = provider.get_credentials().await.unwrap_err();
        assert!(matches!(
            err,
            AwsError::Credentials(CredentialsError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_env_provider_empty_var() {
        env::set_var("LIBAWS_TEST_C_KEY", "");
        env::set_var("LIBAWS_TEST_C_SECRET", "SECRET");
        let provider = EnvCredentialsProvider::with_vars(
            "LIBAWS_TEST_C_KEY",
            "LIBAWS_TEST_C_SECRET",
            None,
        );
        let err = provider.get_credentials().await.unwrap_err();
        assert!(matches!(
            err,
            AwsError::Credentials(CredentialsError::Invalid { .. })
        ));
    }
}

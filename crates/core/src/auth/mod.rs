pub mod cached;
pub mod client_secret;
pub mod interactive;
pub mod pkce;
pub mod token;

use async_trait::async_trait;
use tracing::info;

pub use cached::CachedCredential;
pub use client_secret::ClientSecret;
pub use interactive::InteractiveCredential;
pub use token::StoredToken;

use crate::{config::Config, error::AuthError};

/// Authorized access to the user's YouTube account data.
#[derive(Clone)]
pub struct AuthHandle {
    pub access_token: String,
    pub api_key: String,
}

impl std::fmt::Debug for AuthHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthHandle").finish_non_exhaustive()
    }
}

/// A way of obtaining an OAuth token. `Ok(None)` means "not available from
/// this provider, try the next one".
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn credential(&self) -> Result<Option<StoredToken>, AuthError>;
}

/// Reuse the cached credential when valid, otherwise run interactive consent.
pub async fn authenticate(
    config: &Config,
    http: &reqwest::Client,
    interactive: InteractiveCredential,
) -> Result<AuthHandle, AuthError> {
    let cached = CachedCredential::new(
        http.clone(),
        config.token_cache_path.clone(),
        config.client_secret_path.clone(),
    );
    authenticate_with(&[&cached, &interactive], &config.youtube_api_key).await
}

pub async fn authenticate_with(
    providers: &[&dyn CredentialProvider],
    api_key: &str,
) -> Result<AuthHandle, AuthError> {
    for provider in providers {
        if let Some(token) = provider.credential().await? {
            info!(provider = provider.name(), "Authenticated");
            return Ok(AuthHandle {
                access_token: token.access_token,
                api_key: api_key.to_string(),
            });
        }
    }

    Err(AuthError::Denied {
        reason: "no credential provider produced a token".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        token: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(token: Option<&'static str>) -> Self {
            Self {
                token,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CredentialProvider for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn credential(&self) -> Result<Option<StoredToken>, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.token.map(|t| StoredToken {
                access_token: t.to_string(),
                refresh_token: None,
                expires_at: Utc::now(),
                scope: None,
                token_type: "Bearer".to_string(),
            }))
        }
    }

    struct Refusing;

    #[async_trait]
    impl CredentialProvider for Refusing {
        fn name(&self) -> &'static str {
            "refusing"
        }

        async fn credential(&self) -> Result<Option<StoredToken>, AuthError> {
            Err(AuthError::Denied {
                reason: "access_denied".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn cached_credential_skips_interactive() {
        let cached = Fixed::new(Some("from-cache"));
        let interactive = Fixed::new(Some("from-consent"));

        let handle = authenticate_with(&[&cached, &interactive], "key")
            .await
            .unwrap();
        assert_eq!(handle.access_token, "from-cache");
        assert_eq!(handle.api_key, "key");
        assert_eq!(interactive.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn falls_back_to_next_provider() {
        let cached = Fixed::new(None);
        let interactive = Fixed::new(Some("from-consent"));

        let handle = authenticate_with(&[&cached, &interactive], "key")
            .await
            .unwrap();
        assert_eq!(handle.access_token, "from-consent");
    }

    #[tokio::test]
    async fn denial_is_fatal() {
        let cached = Fixed::new(None);
        let err = authenticate_with(&[&cached, &Refusing], "key")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Denied { .. }));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let handle = AuthHandle {
            access_token: "ya29.secret".into(),
            api_key: "AIza-secret".into(),
        };
        assert!(!format!("{handle:?}").contains("secret"));
    }
}

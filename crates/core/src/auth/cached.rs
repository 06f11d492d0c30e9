use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::{
    auth::{
        CredentialProvider,
        client_secret::ClientSecret,
        token::{self, StoredToken, TokenGrant},
    },
    error::AuthError,
};

/// Reuses the token cache left behind by an earlier run, refreshing it when
/// the access token has expired.
pub struct CachedCredential {
    http: reqwest::Client,
    token_cache_path: PathBuf,
    client_secret_path: PathBuf,
}

impl CachedCredential {
    pub fn new(
        http: reqwest::Client,
        token_cache_path: PathBuf,
        client_secret_path: PathBuf,
    ) -> Self {
        Self {
            http,
            token_cache_path,
            client_secret_path,
        }
    }
}

#[async_trait]
impl CredentialProvider for CachedCredential {
    fn name(&self) -> &'static str {
        "cached"
    }

    async fn credential(&self) -> Result<Option<StoredToken>, AuthError> {
        let cached = match StoredToken::load(&self.token_cache_path).await {
            Ok(token) => token,
            Err(e) => {
                debug!(path = %self.token_cache_path.display(), "No usable token cache: {e}");
                return Ok(None);
            }
        };

        if cached.is_fresh(Utc::now()) {
            debug!("Reusing cached access token");
            return Ok(Some(cached));
        }

        let Some(refresh_token) = cached.refresh_token.as_deref() else {
            info!("Cached access token expired and has no refresh token");
            return Ok(None);
        };

        let secret = ClientSecret::load(&self.client_secret_path).await?;
        match token::refresh(&self.http, &secret, refresh_token).await? {
            TokenGrant::Granted(token) => {
                token.save(&self.token_cache_path).await?;
                info!("Refreshed cached access token");
                Ok(Some(token))
            }
            TokenGrant::Refused(reason) => {
                warn!("Cached refresh token was rejected: {reason}");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token(expires_in: Duration, refresh: Option<&str>) -> StoredToken {
        StoredToken {
            access_token: "cached-access".into(),
            refresh_token: refresh.map(str::to_string),
            expires_at: Utc::now() + expires_in,
            scope: None,
            token_type: "Bearer".into(),
        }
    }

    async fn write_secret(dir: &std::path::Path, token_uri: &str) -> PathBuf {
        let path = dir.join("client_secret.json");
        let body = serde_json::json!({
            "installed": {"client_id": "cid", "client_secret": "cs", "token_uri": token_uri}
        });
        tokio::fs::write(&path, body.to_string()).await.unwrap();
        path
    }

    #[tokio::test]
    async fn missing_cache_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CachedCredential::new(
            reqwest::Client::new(),
            dir.path().join("token.json"),
            dir.path().join("client_secret.json"),
        );
        assert!(provider.credential().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn fresh_token_is_reused_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("token.json");
        token(Duration::hours(1), None).save(&cache).await.unwrap();

        // No client secret on disk: reaching the token endpoint would fail.
        let provider = CachedCredential::new(
            reqwest::Client::new(),
            cache,
            dir.path().join("absent.json"),
        );
        let got = provider.credential().await.unwrap().unwrap();
        assert_eq!(got.access_token, "cached-access");
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_persisted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "refreshed",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("token.json");
        token(-Duration::minutes(5), Some("r1")).save(&cache).await.unwrap();
        let secret = write_secret(dir.path(), &format!("{}/token", server.uri())).await;

        let provider = CachedCredential::new(reqwest::Client::new(), cache.clone(), secret);
        let got = provider.credential().await.unwrap().unwrap();
        assert_eq!(got.access_token, "refreshed");
        assert_eq!(got.refresh_token.as_deref(), Some("r1"));

        let persisted = StoredToken::load(&cache).await.unwrap();
        assert_eq!(persisted.access_token, "refreshed");
    }

    #[tokio::test]
    async fn rejected_refresh_falls_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"error": "invalid_grant"})),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("token.json");
        token(-Duration::minutes(5), Some("revoked")).save(&cache).await.unwrap();
        let secret = write_secret(dir.path(), &format!("{}/token", server.uri())).await;

        let provider = CachedCredential::new(reqwest::Client::new(), cache, secret);
        assert!(provider.credential().await.unwrap().is_none());
    }
}

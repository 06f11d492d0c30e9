use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    auth::{client_secret::ClientSecret, pkce::PkceVerifier},
    error::AuthError,
};

/// A token is reused only while it has more than this many seconds left.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Token cache contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    refresh_token: Option<String>,
    scope: Option<String>,
    token_type: Option<String>,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Outcome of asking the token endpoint for a new access token.
pub enum TokenGrant {
    Granted(StoredToken),
    /// The endpoint refused the grant (`invalid_grant` and friends).
    Refused(String),
}

impl StoredToken {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now > Duration::seconds(REFRESH_MARGIN_SECS)
    }

    pub async fn load(path: &Path) -> Result<Self, AuthError> {
        let raw = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub async fn save(&self, path: &Path) -> Result<(), AuthError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, serde_json::to_string_pretty(self)?).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        debug!(path = %path.display(), "Token cache written");
        Ok(())
    }
}

/// Exchange an authorization code for tokens
pub async fn exchange_code(
    http: &reqwest::Client,
    secret: &ClientSecret,
    code: &str,
    redirect_uri: &str,
    verifier: &PkceVerifier,
) -> Result<TokenGrant, AuthError> {
    request_token(
        http,
        secret,
        &[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("code_verifier", verifier.as_str()),
            ("client_id", secret.client_id.as_str()),
            ("client_secret", secret.client_secret.as_str()),
        ],
        None,
    )
    .await
}

/// Trade a refresh token for a new access token
pub async fn refresh(
    http: &reqwest::Client,
    secret: &ClientSecret,
    refresh_token: &str,
) -> Result<TokenGrant, AuthError> {
    request_token(
        http,
        secret,
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", secret.client_id.as_str()),
            ("client_secret", secret.client_secret.as_str()),
        ],
        Some(refresh_token),
    )
    .await
}

async fn request_token(
    http: &reqwest::Client,
    secret: &ClientSecret,
    form: &[(&str, &str)],
    previous_refresh_token: Option<&str>,
) -> Result<TokenGrant, AuthError> {
    let response = http.post(&secret.token_uri).form(form).send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let reason = match serde_json::from_str::<TokenErrorResponse>(&body) {
            Ok(err) => match err.error_description {
                Some(desc) => format!("{}: {}", err.error, desc),
                None => err.error,
            },
            Err(_) => format!("HTTP {}: {}", status.as_u16(), body),
        };
        return Ok(TokenGrant::Refused(reason));
    }

    let token: TokenResponse = serde_json::from_str(&body)?;
    Ok(TokenGrant::Granted(StoredToken {
        access_token: token.access_token,
        // Refresh responses usually omit the refresh token; keep the old one.
        refresh_token: token
            .refresh_token
            .or_else(|| previous_refresh_token.map(str::to_string)),
        expires_at: Utc::now() + Duration::seconds(token.expires_in),
        scope: token.scope,
        token_type: token.token_type.unwrap_or_else(default_token_type),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn secret(token_uri: String) -> ClientSecret {
        ClientSecret {
            client_id: "cid".to_string(),
            client_secret: "csecret".to_string(),
            auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_uri,
        }
    }

    #[test]
    fn freshness_respects_margin() {
        let now = Utc::now();
        let token = StoredToken {
            access_token: "a".into(),
            refresh_token: None,
            expires_at: now + Duration::seconds(30),
            scope: None,
            token_type: "Bearer".into(),
        };
        assert!(!token.is_fresh(now));
        assert!(token.is_fresh(now - Duration::minutes(5)));
    }

    #[tokio::test]
    async fn refresh_keeps_previous_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "new-access",
                "expires_in": 3599,
                "scope": "https://www.googleapis.com/auth/youtube.readonly",
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        let grant = refresh(
            &reqwest::Client::new(),
            &secret(format!("{}/token", server.uri())),
            "old-refresh",
        )
        .await
        .unwrap();

        let TokenGrant::Granted(token) = grant else {
            panic!("expected a granted token");
        };
        assert_eq!(token.access_token, "new-access");
        assert_eq!(token.refresh_token.as_deref(), Some("old-refresh"));
        assert!(token.is_fresh(Utc::now()));
    }

    #[tokio::test]
    async fn code_exchange_sends_pkce_verifier() {
        let server = MockServer::start().await;
        let verifier = PkceVerifier::generate();
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains(format!("code_verifier={}", verifier.as_str())))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "first-access",
                "refresh_token": "first-refresh",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;

        let grant = exchange_code(
            &reqwest::Client::new(),
            &secret(format!("{}/token", server.uri())),
            "4/abc",
            "http://127.0.0.1:8765",
            &verifier,
        )
        .await
        .unwrap();

        let TokenGrant::Granted(token) = grant else {
            panic!("expected a granted token");
        };
        assert_eq!(token.refresh_token.as_deref(), Some("first-refresh"));
        assert_eq!(token.token_type, "Bearer");
    }

    #[tokio::test]
    async fn invalid_grant_is_refused_not_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Token has been expired or revoked."
            })))
            .mount(&server)
            .await;

        let grant = refresh(
            &reqwest::Client::new(),
            &secret(format!("{}/token", server.uri())),
            "revoked",
        )
        .await
        .unwrap();

        match grant {
            TokenGrant::Refused(reason) => assert!(reason.starts_with("invalid_grant")),
            TokenGrant::Granted(_) => panic!("expected refusal"),
        }
    }

    #[tokio::test]
    async fn save_then_load_token_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("token.json");
        let token = StoredToken {
            access_token: "a".into(),
            refresh_token: Some("r".into()),
            expires_at: Utc::now(),
            scope: None,
            token_type: "Bearer".into(),
        };

        token.save(&path).await.unwrap();
        assert_eq!(StoredToken::load(&path).await.unwrap(), token);
    }
}

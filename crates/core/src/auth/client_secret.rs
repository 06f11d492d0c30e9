use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::{
    auth::pkce::{CHALLENGE_METHOD, PkceVerifier},
    error::AuthError,
};

pub const YOUTUBE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/youtube.readonly";

/// OAuth client identity downloaded from the Google Cloud console.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ClientSecret {
    pub async fn load(path: &Path) -> Result<Self, AuthError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AuthError::ClientSecret {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Self::parse(&raw).map_err(|reason| AuthError::ClientSecret {
            path: path.to_path_buf(),
            reason,
        })
    }

    fn parse(raw: &str) -> Result<Self, String> {
        let file: ClientSecretFile = serde_json::from_str(raw).map_err(|e| e.to_string())?;
        file.installed
            .or(file.web)
            .ok_or_else(|| "expected an \"installed\" or \"web\" client entry".to_string())
    }

    /// Build the consent-screen URL for the loopback redirect flow
    pub fn consent_url(
        &self,
        redirect_uri: &str,
        state: &str,
        verifier: &PkceVerifier,
    ) -> Result<Url, AuthError> {
        let challenge = verifier.challenge();
        Url::parse_with_params(
            &self.auth_uri,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", YOUTUBE_READONLY_SCOPE),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state),
                ("code_challenge", challenge.as_str()),
                ("code_challenge_method", CHALLENGE_METHOD),
            ],
        )
        .map_err(|e| AuthError::BadRedirect {
            reason: format!("invalid auth_uri {}: {e}", self.auth_uri),
        })
    }
}

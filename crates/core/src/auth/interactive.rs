use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    routing::get,
};
use serde::Deserialize;
use tokio::{net::TcpListener, sync::oneshot};
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use crate::{
    auth::{
        CredentialProvider,
        client_secret::ClientSecret,
        pkce::PkceVerifier,
        token::{self, StoredToken, TokenGrant},
    },
    error::AuthError,
};

const CONSENT_DONE_PAGE: &str = "<html><body><h3>recap is authorized.</h3>\
<p>You can close this tab and return to the terminal.</p></body></html>";

const CONSENT_DENIED_PAGE: &str = "<html><body><h3>Authorization was not granted.</h3>\
<p>Return to the terminal for details.</p></body></html>";

type ConsentPrompt = Arc<dyn Fn(&Url) + Send + Sync>;

/// Runs the browser consent flow with a loopback redirect and stores the
/// resulting token for later runs.
pub struct InteractiveCredential {
    http: reqwest::Client,
    client_secret_path: PathBuf,
    token_cache_path: PathBuf,
    timeout: Duration,
    prompt: ConsentPrompt,
}

impl InteractiveCredential {
    pub fn new(
        http: reqwest::Client,
        client_secret_path: PathBuf,
        token_cache_path: PathBuf,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            client_secret_path,
            token_cache_path,
            timeout,
            prompt: Arc::new(|url: &Url| {
                eprintln!("Open this URL in your browser to authorize recap:\n\n  {url}\n");
            }),
        }
    }

    /// Replace how the consent URL is shown to the user
    pub fn with_prompt(mut self, prompt: impl Fn(&Url) + Send + Sync + 'static) -> Self {
        self.prompt = Arc::new(prompt);
        self
    }
}

#[async_trait]
impl CredentialProvider for InteractiveCredential {
    fn name(&self) -> &'static str {
        "interactive"
    }

    async fn credential(&self) -> Result<Option<StoredToken>, AuthError> {
        let secret = ClientSecret::load(&self.client_secret_path).await?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let redirect_uri = format!("http://127.0.0.1:{}", listener.local_addr()?.port());
        let state = Uuid::new_v4().simple().to_string();
        let verifier = PkceVerifier::generate();
        let consent_url = secret.consent_url(&redirect_uri, &state, &verifier)?;

        (self.prompt)(&consent_url);
        info!(%redirect_uri, "Waiting for authorization consent");

        let code = tokio::time::timeout(self.timeout, wait_for_redirect(listener, &state))
            .await
            .map_err(|_| AuthError::TimedOut {
                seconds: self.timeout.as_secs(),
            })??;

        match token::exchange_code(&self.http, &secret, &code, &redirect_uri, &verifier).await? {
            TokenGrant::Granted(token) => {
                token.save(&self.token_cache_path).await?;
                info!("Authorization complete, token cached");
                Ok(Some(token))
            }
            TokenGrant::Refused(reason) => Err(AuthError::Rejected { reason }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RedirectParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

type RedirectOutcome = Result<String, AuthError>;

struct Callback {
    expected_state: String,
    outcome: Mutex<Option<oneshot::Sender<RedirectOutcome>>>,
}

impl Callback {
    /// Only the first redirect settles the flow.
    fn settle(&self, outcome: RedirectOutcome) {
        let sender = self.outcome.lock().ok().and_then(|mut slot| slot.take());
        match sender {
            Some(sender) => {
                let _ = sender.send(outcome);
            }
            None => debug!("Redirect arrived after the flow settled"),
        }
    }
}

async fn handle_redirect(
    State(callback): State<Arc<Callback>>,
    Query(params): Query<RedirectParams>,
) -> (StatusCode, Html<&'static str>) {
    if let Some(reason) = params.error {
        callback.settle(Err(AuthError::Denied { reason }));
        return (StatusCode::OK, Html(CONSENT_DENIED_PAGE));
    }

    let Some(code) = params.code else {
        return (StatusCode::NOT_FOUND, Html(""));
    };

    if params.state.as_deref() != Some(callback.expected_state.as_str()) {
        callback.settle(Err(AuthError::StateMismatch));
        return (StatusCode::BAD_REQUEST, Html(CONSENT_DENIED_PAGE));
    }

    callback.settle(Ok(code));
    (StatusCode::OK, Html(CONSENT_DONE_PAGE))
}

/// Serve the loopback redirect on `listener` and return the authorization
/// code once the browser comes back. The server stops when this returns or
/// is dropped.
pub(crate) async fn wait_for_redirect(
    listener: TcpListener,
    expected_state: &str,
) -> Result<String, AuthError> {
    let (outcome_tx, outcome_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let callback = Arc::new(Callback {
        expected_state: expected_state.to_string(),
        outcome: Mutex::new(Some(outcome_tx)),
    });
    let app = Router::new()
        .route("/", get(handle_redirect))
        .with_state(callback);

    tokio::spawn(async move {
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
        if let Err(e) = served {
            debug!(error = %e, "Loopback server stopped with error");
        }
    });

    let outcome = outcome_rx.await.map_err(|_| AuthError::BadRedirect {
        reason: "callback server stopped before the redirect arrived".to_string(),
    });
    let _ = shutdown_tx.send(());
    outcome?
}

//! Authorization-code flow: print the authorize URL, catch the redirect on
//! a short-lived local server, hand the code back over a oneshot.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tracing::{info, warn};

pub const AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
pub const SCOPE: &str = "playlist-modify-public";

pub fn redirect_uri(port: u16) -> String {
    format!("http://127.0.0.1:{}/callback", port)
}

pub fn random_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

pub fn authorize_url(client_id: &str, redirect_uri: &str, state: &str) -> Result<String> {
    let url = reqwest::Url::parse_with_params(
        AUTHORIZE_URL,
        &[
            ("client_id", client_id),
            ("response_type", "code"),
            ("redirect_uri", redirect_uri),
            ("scope", SCOPE),
            ("state", state),
        ],
    )?;
    Ok(url.to_string())
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

type CodeSender = Arc<Mutex<Option<oneshot::Sender<Result<String, String>>>>>;

#[derive(Clone)]
struct CallbackState {
    expected_state: String,
    tx: CodeSender,
}

async fn callback(State(app): State<CallbackState>, Query(params): Query<CallbackParams>) -> &'static str {
    let outcome = match (params.code, params.state, params.error) {
        (_, _, Some(error)) => Err(format!("authorization denied: {}", error)),
        (_, Some(state), _) if state != app.expected_state => {
            Err("state mismatch in callback".to_string())
        }
        (Some(code), _, _) if !code.is_empty() => Ok(code),
        _ => Err("authorization code not found".to_string()),
    };

    let page = if outcome.is_ok() {
        "Authentication successful! You can close this page."
    } else {
        "Authentication failed. Check the terminal."
    };

    if let Some(tx) = app.tx.lock().await.take() {
        let _ = tx.send(outcome);
    }
    page
}

/// Bound callback server waiting for a single redirect.
pub struct CallbackServer {
    listener: TcpListener,
    expected_state: String,
}

impl CallbackServer {
    pub async fn bind(port: u16, expected_state: String) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("Failed to bind OAuth callback port {}", port))?;
        Ok(Self {
            listener,
            expected_state,
        })
    }

    pub fn port(&self) -> Option<u16> {
        self.listener.local_addr().ok().map(|a| a.port())
    }

    /// Serve until the first callback arrives or `timeout` expires.
    pub async fn wait_for_code(self, timeout: Duration) -> Result<String> {
        let (code_tx, code_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let state = CallbackState {
            expected_state: self.expected_state,
            tx: Arc::new(Mutex::new(Some(code_tx))),
        };
        let app = Router::new().route("/callback", get(callback)).with_state(state);
        let listener = self.listener;

        let server = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                warn!("OAuth callback server error: {}", e);
            }
        });

        let outcome = tokio::time::timeout(timeout, code_rx).await;
        let _ = shutdown_tx.send(());
        let _ = server.await;

        match outcome {
            Err(_) => anyhow::bail!("timed out waiting for Spotify authorization"),
            Ok(Err(_)) => anyhow::bail!("callback server stopped before a code arrived"),
            Ok(Ok(Err(reason))) => anyhow::bail!("{}", reason),
            Ok(Ok(Ok(code))) => {
                info!("OAuth authorization code received");
                Ok(code)
            }
        }
    }
}

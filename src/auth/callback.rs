//! Short-lived loopback listener receiving the OAuth redirect.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::error::AuthError;
use super::provider::CALLBACK_PATH;

const SUCCESS_HTML: &str = r#"<html>
<head><title>Authentication Successful</title></head>
<body>
<h1>Authentication Successful!</h1>
<p>You can now close this window and return to the terminal.</p>
<script>window.close();</script>
</body>
</html>"#;

/// Result of the redirect, delivered exactly once to the waiting flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Success(String),
    Failure(CallbackFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackFailure {
    StateMismatch,
    MissingCode,
    Denied(String),
}

impl From<CallbackFailure> for AuthError {
    fn from(failure: CallbackFailure) -> Self {
        match failure {
            CallbackFailure::StateMismatch => AuthError::StateMismatch,
            CallbackFailure::MissingCode => AuthError::MissingCode,
            CallbackFailure::Denied(reason) => AuthError::AuthorizationDenied(reason),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

struct CallbackState {
    expected_state: String,
    outcome_tx: Mutex<Option<oneshot::Sender<CallbackOutcome>>>,
}

impl CallbackState {
    /// First call wins; later requests are answered but not forwarded.
    fn deliver(&self, outcome: CallbackOutcome) {
        let sender = match self.outcome_tx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(sender) = sender {
            let _ = sender.send(outcome);
        }
    }
}

/// Running callback listener. Dropping it signals shutdown; [`CallbackServer::shutdown`]
/// additionally waits for the server task to finish.
pub struct CallbackServer {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl CallbackServer {
    /// Bind `127.0.0.1:port` and start serving `GET /callback`.
    ///
    /// Returns the server and the receiver of the single redirect outcome.
    pub async fn start(
        port: u16,
        expected_state: String,
    ) -> Result<(Self, oneshot::Receiver<CallbackOutcome>), AuthError> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .map_err(|e| AuthError::Listener(format!("bind 127.0.0.1:{port} failed: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| AuthError::Listener(format!("local_addr failed: {e}")))?;

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let state = Arc::new(CallbackState {
            expected_state,
            outcome_tx: Mutex::new(Some(outcome_tx)),
        });
        let app = Router::new()
            .route(CALLBACK_PATH, get(handle_callback))
            .with_state(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(err) = serve.await {
                tracing::error!(%local_addr, "callback listener failed: {}", err);
            }
        });

        tracing::debug!(%local_addr, "callback listener started");
        Ok((
            Self {
                local_addr,
                shutdown_tx: Some(shutdown_tx),
                task: Some(task),
            },
            outcome_rx,
        ))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for in-flight responses to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::warn!("callback listener task ended abnormally: {}", err);
            }
        }
        tracing::debug!(local_addr = %self.local_addr, "callback listener stopped");
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn handle_callback(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    if params.state.as_deref() != Some(state.expected_state.as_str()) {
        tracing::warn!("authorization callback with invalid state");
        state.deliver(CallbackOutcome::Failure(CallbackFailure::StateMismatch));
        return (StatusCode::BAD_REQUEST, "Invalid state").into_response();
    }

    if let Some(error) = params.error {
        let reason = match params.error_description {
            Some(description) => format!("{error} - {description}"),
            None => error,
        };
        state.deliver(CallbackOutcome::Failure(CallbackFailure::Denied(reason)));
        return (StatusCode::BAD_REQUEST, "Authorization denied").into_response();
    }

    match params.code.filter(|code| !code.is_empty()) {
        Some(code) => {
            state.deliver(CallbackOutcome::Success(code));
            Html(SUCCESS_HTML).into_response()
        }
        None => {
            state.deliver(CallbackOutcome::Failure(CallbackFailure::MissingCode));
            (StatusCode::BAD_REQUEST, "No code received").into_response()
        }
    }
}

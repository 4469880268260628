//! Local stand-in for the Telegram Bot API and the media API.

#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

pub const TEST_BOT_TOKEN: &str = "TEST_TOKEN";
pub const TEST_API_TOKEN: &str = "api-secret";

/// A request the fake server received.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub body: String,
}

#[derive(Default)]
struct FakeState {
    responses: Mutex<VecDeque<(StatusCode, String)>>,
    recorded: Mutex<Vec<Recorded>>,
    media: Mutex<HashMap<String, Vec<u8>>>,
    last_authorization: Mutex<Option<String>>,
}

pub struct FakeServer {
    pub base_url: String,
    state: Arc<FakeState>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl FakeServer {
    pub async fn spawn() -> Self {
        let state = Arc::new(FakeState::default());
        let app = Router::new()
            .route(&format!("/bot{}/getMe", TEST_BOT_TOKEN), get(get_me))
            .route(&format!("/bot{}/{{method}}", TEST_BOT_TOKEN), post(send_media))
            .route("/media/{id}", get(get_media))
            .with_state(state.clone());

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("Fake server failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Queues the response for the next sendPhoto/sendVideo call. Calls with
    /// nothing queued get a generic successful photo message.
    pub fn respond_with(&self, status: StatusCode, body: &str) {
        self.state
            .responses
            .lock()
            .unwrap()
            .push_back((status, body.to_string()));
    }

    pub fn add_media(&self, id: &str, bytes: Vec<u8>) {
        self.state
            .media
            .lock()
            .unwrap()
            .insert(id.to_string(), bytes);
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.state.recorded.lock().unwrap().clone()
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.state.last_authorization.lock().unwrap().clone()
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn get_me() -> impl IntoResponse {
    (
        StatusCode::OK,
        r#"{"ok":true,"result":{"id":42,"is_bot":true,"first_name":"Memes","username":"memesearch_bot"}}"#,
    )
}

async fn send_media(
    State(state): State<Arc<FakeState>>,
    Path(method): Path<String>,
    body: Bytes,
) -> Response {
    state.recorded.lock().unwrap().push(Recorded {
        method,
        body: String::from_utf8_lossy(&body).to_string(),
    });

    let next = state.responses.lock().unwrap().pop_front();
    let (status, body) = next.unwrap_or_else(|| {
        (
            StatusCode::OK,
            r#"{"ok":true,"result":{"message_id":1,"photo":[{"file_id":"DEFAULT","file_unique_id":"d","width":1,"height":1}]}}"#.to_string(),
        )
    });
    (status, body).into_response()
}

async fn get_media(
    State(state): State<Arc<FakeState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    *state.last_authorization.lock().unwrap() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match state.media.lock().unwrap().get(&id) {
        Some(bytes) => (StatusCode::OK, bytes.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, r#"{"error":"not found"}"#).into_response(),
    }
}

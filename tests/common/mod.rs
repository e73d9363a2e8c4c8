use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use imagegen_proxy::api::routes::{router, AppState};
use imagegen_proxy::history::{HistoryManager, MemoryStore};
use imagegen_proxy::{Config, GenerationClient};
use serde_json::{json, Value};

#[derive(Clone, Copy, Debug)]
pub enum Reply {
    Content(&'static str),
    Status(u16),
    Stall,
}

pub struct Upstream {
    pub addr: SocketAddr,
    hits: AtomicUsize,
    reply: Mutex<Reply>,
    last_body: Mutex<Option<Value>>,
}

impl Upstream {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn set_reply(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn last_body(&self) -> Value {
        self.last_body.lock().unwrap().clone().expect("upstream was called")
    }
}

async fn completions(State(up): State<Arc<Upstream>>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    up.hits.fetch_add(1, Ordering::SeqCst);
    *up.last_body.lock().unwrap() = Some(body);
    let reply = *up.reply.lock().unwrap();
    match reply {
        Reply::Content(c) => (
            StatusCode::OK,
            Json(json!({"choices": [{"message": {"role": "assistant", "content": c}}]})),
        ),
        Reply::Status(code) => (
            StatusCode::from_u16(code).unwrap(),
            Json(json!({"error": {"message": "mock failure"}})),
        ),
        Reply::Stall => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            (StatusCode::OK, Json(json!({})))
        }
    }
}

/// Start a fake upstream on an ephemeral port.
pub async fn spawn_upstream(reply: Reply) -> Arc<Upstream> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let upstream = Arc::new(Upstream {
        addr,
        hits: AtomicUsize::new(0),
        reply: Mutex::new(reply),
        last_body: Mutex::new(None),
    });
    let app = Router::new()
        .route("/chat/completions", post(completions))
        .with_state(upstream.clone());
    let server = axum::Server::from_tcp(listener).unwrap().serve(app.into_make_service());
    tokio::spawn(server);
    upstream
}

pub fn app_for(upstream: &Upstream, history_cap: usize) -> (Router, Arc<AppState>) {
    let config = Config {
        upstream_url: format!("http://{}/chat/completions", upstream.addr),
        upstream_api_key: "test-key".to_string(),
        upstream_customer_id: "cus_test".to_string(),
        upstream_timeout: Duration::from_millis(300),
        ..Config::default()
    };
    let state = Arc::new(AppState {
        client: GenerationClient::new(&config).unwrap(),
        history: HistoryManager::new(Arc::new(MemoryStore::new()), history_cap),
    });
    (router(state.clone()), state)
}

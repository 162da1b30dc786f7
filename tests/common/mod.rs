//! Stand-in captions provider and completion API for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};

use ytpost::completion::ChatClient;
use ytpost::pipeline::Pipeline;
use ytpost::retry::RetryPolicy;
use ytpost::youtube::CaptionsClient;

pub const CAPTIONS_KEY: &str = "test-captions-key";
pub const COMPLETION_KEY: &str = "test-completion-key";
pub const REFINED: &str = "Hello, world.";

/// 281 characters, one over the post limit
pub fn overlong_post() -> String {
    format!("Third post {}", "x".repeat(270))
}

#[derive(Clone)]
struct UpstreamState {
    base: String,
    transcript_calls: Arc<AtomicUsize>,
    completions: Arc<Mutex<Vec<Value>>>,
}

pub struct Upstream {
    pub base: String,
    pub transcript_calls: Arc<AtomicUsize>,
    pub completions: Arc<Mutex<Vec<Value>>>,
}

impl Upstream {
    pub fn transcript_calls(&self) -> usize {
        self.transcript_calls.load(Ordering::SeqCst)
    }

    pub fn completion_requests(&self) -> Vec<Value> {
        self.completions.lock().unwrap().clone()
    }
}

/// Serve `router` on an ephemeral local port
pub async fn serve(listener: tokio::net::TcpListener, router: Router) {
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
}

pub async fn spawn_upstream() -> Upstream {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let state = UpstreamState {
        base: base.clone(),
        transcript_calls: Arc::new(AtomicUsize::new(0)),
        completions: Arc::new(Mutex::new(Vec::new())),
    };

    let router = Router::new()
        .route("/api/transcript", get(transcript))
        .route("/timedtext", get(timedtext))
        .route("/v1/chat/completions", post(completions))
        .with_state(state.clone());
    serve(listener, router).await;

    Upstream {
        base,
        transcript_calls: state.transcript_calls,
        completions: state.completions,
    }
}

async fn transcript(
    State(state): State<UpstreamState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let call = state.transcript_calls.fetch_add(1, Ordering::SeqCst) + 1;

    if headers.get("x-rapidapi-key").and_then(|v| v.to_str().ok()) != Some(CAPTIONS_KEY) {
        return (StatusCode::FORBIDDEN, Json(json!({"message": "bad key"}))).into_response();
    }

    let segments = |texts: &[&str]| {
        let segments: Vec<Value> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| json!({"text": t, "offset": i as f64, "duration": 1.0, "lang": "en"}))
            .collect();
        Json(json!({"success": true, "transcript": segments})).into_response()
    };

    match params.get("videoId").map(String::as_str) {
        Some("abc123") => segments(&["Hello", "world"]),
        Some("track") => Json(json!({"success": true, "transcript": format!("{}/timedtext", state.base)})).into_response(),
        Some("nocaps") => Json(json!({"success": false, "message": "Transcript is disabled"})).into_response(),
        Some("blank") => segments(&["  ", "\n"]),
        Some("emptyreply") => segments(&["EMPTY"]),
        Some("flaky") if call < 3 => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        Some("flaky") => segments(&["Hello", "world"]),
        Some("down") => StatusCode::BAD_GATEWAY.into_response(),
        _ => Json(json!({"success": true})).into_response(),
    }
}

async fn timedtext() -> &'static str {
    r##"<?xml version="1.0" encoding="utf-8" ?>
<transcript>
    <text start="0.0" dur="1.2">Hello   <font color="#E5E5E5">big</font></text>
    <text start="1.2" dur="0.8">world &amp;amp; friends</text>
</transcript>"##
}

async fn completions(State(state): State<UpstreamState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.completions.lock().unwrap().push(body.clone());

    let expected = format!("Bearer {COMPLETION_KEY}");
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some(expected.as_str()) {
        return (StatusCode::UNAUTHORIZED, "bad key").into_response();
    }

    let system = body["messages"][0]["content"].as_str().unwrap_or_default();
    let user = body["messages"][1]["content"].as_str().unwrap_or_default();

    let content = match user {
        "EMPTY" => Value::Null,
        "FAIL" => return (StatusCode::INTERNAL_SERVER_ERROR, "model overloaded").into_response(),
        _ if system.contains("tweets") => {
            Value::String(format!("1. First post\n2. Second post\n\n3. {}", overlong_post()))
        }
        _ => Value::String(REFINED.to_string()),
    };

    Json(json!({"choices": [{"message": {"role": "assistant", "content": content}}]})).into_response()
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        delay: Duration::from_millis(5),
        ..RetryPolicy::default()
    }
}

pub fn captions_client(base: &str, key: Option<&str>) -> CaptionsClient {
    CaptionsClient::new(reqwest::Client::new(), base, "captions.test", key.map(str::to_string))
}

pub fn pipeline(upstream: &Upstream) -> Pipeline {
    pipeline_with_keys(upstream, Some(CAPTIONS_KEY), Some(COMPLETION_KEY))
}

pub fn pipeline_with_keys(upstream: &Upstream, captions_key: Option<&str>, completion_key: Option<&str>) -> Pipeline {
    let http = reqwest::Client::new();
    Pipeline::new(
        CaptionsClient::new(http.clone(), &upstream.base, "captions.test", captions_key.map(str::to_string)),
        ChatClient::new(http, &upstream.base, "gpt-3.5-turbo", completion_key.map(str::to_string)),
        fast_retry(),
    )
}

//! Fake OpenAI-compatible server shared by the integration tests
//!
//! Chat and completion answers echo the input prefixed with `EN:`. Inputs
//! containing `FAIL` get a 500 and inputs containing `EMPTY` get no choices.

#![allow(dead_code)]

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

pub const MODEL: &str = "test-model";

/// One request as the server saw it
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: &'static str,
    pub authorization: Option<String>,
    pub body: Value,
}

type Log = Arc<Mutex<Vec<Recorded>>>;

pub struct FakeBackend {
    /// Base URL including `/v1`
    pub endpoint: String,
    log: Log,
}

impl FakeBackend {
    pub fn requests(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }
}

pub async fn spawn() -> FakeBackend {
    let log: Log = Arc::default();
    let app = Router::new()
        .route("/v1/chat/completions", post(chat))
        .route("/v1/completions", post(completion))
        .route("/v1/models", get(models))
        .with_state(Arc::clone(&log));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    FakeBackend {
        endpoint: format!("http://{addr}/v1"),
        log,
    }
}

fn record(log: &Log, path: &'static str, headers: &HeaderMap, body: &Value) {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    log.lock().unwrap().push(Recorded {
        path,
        authorization,
        body: body.clone(),
    });
}

fn answer(input: &str, choice: impl FnOnce(String) -> Value) -> Response {
    if input.contains("FAIL") {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "model crashed" })),
        )
            .into_response();
    }
    if input.contains("EMPTY") {
        return Json(json!({ "choices": [] })).into_response();
    }
    Json(json!({ "choices": [choice(format!("EN:{input}"))] })).into_response()
}

async fn chat(State(log): State<Log>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    record(&log, "chat", &headers, &body);
    let input = body["messages"]
        .as_array()
        .and_then(|m| m.last())
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default()
        .to_string();
    answer(&input, |text| {
        json!({ "index": 0, "message": { "role": "assistant", "content": text } })
    })
}

async fn completion(
    State(log): State<Log>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record(&log, "completion", &headers, &body);
    let input = body["prompt"].as_str().unwrap_or_default().to_string();
    answer(&input, |text| json!({ "index": 0, "text": text }))
}

async fn models(State(log): State<Log>, headers: HeaderMap) -> Json<Value> {
    record(&log, "models", &headers, &Value::Null);
    Json(json!({ "object": "list", "data": [{ "id": MODEL, "object": "model" }] }))
}

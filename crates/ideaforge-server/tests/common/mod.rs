#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use ideaforge_ai::{CompletionRequest, IdeaAnalyzer, Purpose};
use ideaforge_common::types::LoginRequest;
use ideaforge_server::app;
use ideaforge_server::config::ServerConfig;
use ideaforge_server::state::AppState;
use ideaforge_storage::auth::hash_password_with_cost;
use ideaforge_storage::ReportStore;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const ALICE: (&str, &str) = ("alice", "alice-password");
pub const BOB: (&str, &str) = ("bob", "bob-password");

/// Replies with canned text per [`Purpose`]; tests swap replies at will.
pub struct ScriptedAnalyzer {
    replies: Mutex<HashMap<Purpose, String>>,
    calls: Mutex<Vec<Purpose>>,
}

impl ScriptedAnalyzer {
    pub fn new() -> Self {
        let mut replies = HashMap::new();
        replies.insert(Purpose::Analysis, analysis_reply());
        replies.insert(Purpose::PitchDeck, pitch_deck_reply("Title"));
        replies.insert(Purpose::OnePager, one_pager_reply("Acme"));
        Self {
            replies: Mutex::new(replies),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_reply(&self, purpose: Purpose, reply: impl Into<String>) {
        self.replies.lock().unwrap().insert(purpose, reply.into());
    }

    pub fn calls(&self) -> Vec<Purpose> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdeaAnalyzer for ScriptedAnalyzer {
    fn provider(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-1"
    }

    async fn complete(&self, request: CompletionRequest) -> ideaforge_ai::Result<String> {
        self.calls.lock().unwrap().push(request.purpose);
        Ok(self
            .replies
            .lock()
            .unwrap()
            .get(&request.purpose)
            .cloned()
            .unwrap_or_default())
    }
}

/// Analysis reply wrapped in prose and a code fence, the way models answer.
pub fn analysis_reply() -> String {
    let blob = json!({
        "marketAnalysis": {
            "tam": 5_000_000_000u64,
            "sam": 800_000_000u64,
            "som": 40_000_000u64,
            "trends": ["remote work", "automation"]
        },
        "competitors": {
            "direct": [{"name": "Rival A"}, {"name": "Rival B"}],
            "indirect": [{"name": "Spreadsheets"}]
        },
        "swot": {
            "strengths": ["fast"],
            "weaknesses": ["small team"],
            "opportunities": ["SMB market", "EU expansion"],
            "threats": []
        },
        "risks": [
            {"category": "market", "impact": "high", "probability": "medium"}
        ],
        "businessModel": {"revenueStreams": [{"name": "subscription"}]},
        "technology": {"budget": "$120,000", "timeline": "6 months"},
        "investmentScore": {"score": 72, "factors": [{"name": "market", "score": 80}]}
    });
    format!("Here is the analysis:\n```json\n{blob}\n```\nGood luck!")
}

pub fn pitch_deck_reply(first_title: &str) -> String {
    let slides: Vec<Value> = (0..10)
        .map(|i| {
            let title = if i == 0 {
                first_title.to_string()
            } else {
                format!("Slide {}", i + 1)
            };
            json!({
                "title": title,
                "content": "content",
                "bulletPoints": ["one", "two"],
                "speakerNotes": "notes"
            })
        })
        .collect();
    json!({ "slides": slides }).to_string()
}

pub fn one_pager_reply(company: &str) -> String {
    json!({
        "companyOverview": company,
        "problem": "problem",
        "solution": "solution",
        "targetMarket": "target market",
        "businessModel": "business model",
        "competitiveAdvantage": "advantage",
        "marketingStrategy": "marketing",
        "financialProjections": "financials",
        "team": "team",
        "fundingAsk": "funding"
    })
    .to_string()
}

pub struct TestContext {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub analyzer: Arc<ScriptedAnalyzer>,
    pub app: axum::Router,
}

pub async fn build_test_context() -> Result<TestContext> {
    build_test_context_with(ServerConfig::default()).await
}

pub async fn build_test_context_with(mut config: ServerConfig) -> Result<TestContext> {
    ideaforge_common::id::init(1, 1);

    let temp_dir = tempfile::tempdir()?;
    config.database.data_dir = temp_dir.path().to_string_lossy().to_string();
    let store = Arc::new(ReportStore::new(&config.database.connection_url()).await?);

    for (username, password) in [ALICE, BOB] {
        store
            .create_user(username, &hash_password_with_cost(password, 4)?)
            .await?;
    }

    let analyzer = Arc::new(ScriptedAnalyzer::new());
    let state = AppState {
        store,
        analyzer: analyzer.clone(),
        start_time: Utc::now(),
        jwt_secret: Arc::new("test-secret".to_string()),
        token_expire_secs: 3600,
        config: Arc::new(config),
    };

    let app = app::build_http_app(state.clone());

    Ok(TestContext {
        temp_dir,
        state,
        analyzer,
        app,
    })
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value, Option<String>) {
    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, trace_id)
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value, Option<String>) {
    let req_body = body.unwrap_or(Value::Null).to_string();
    request_raw(app, method, uri, token, &req_body).await
}

/// Sends `body` verbatim as `application/json`.
pub async fn request_raw(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: &str,
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder = builder.header("Content-Type", "application/json");

    let req = builder
        .body(Body::from(body.to_string()))
        .expect("request should build");
    send(app, req).await
}

pub async fn request_no_body(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    let req = builder.body(Body::empty()).expect("request should build");
    send(app, req).await
}

pub async fn login(app: &axum::Router, username: &str, password: &str) -> String {
    let (status, body, _) = request_json(
        app,
        "POST",
        "/v1/auth/login",
        None,
        Some(
            serde_json::to_value(LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .expect("login request should serialize"),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    assert_eq!(body["err_code"], 0);
    body["data"]["access_token"]
        .as_str()
        .expect("token should exist")
        .to_string()
}

pub fn idea(title: &str, industry: &str, region: &str) -> Value {
    json!({
        "title": title,
        "description": format!("{title} helps small teams save hours every week"),
        "industry": industry,
        "targetMarket": "Small businesses",
        "region": region
    })
}

/// Creates a report through the API and returns its id.
pub async fn create_report(app: &axum::Router, token: &str, body: Value) -> String {
    let (status, resp, _) = request_json(app, "POST", "/v1/validate", Some(token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "validate failed: {resp}");
    resp["data"]["id"]
        .as_str()
        .expect("report id should exist")
        .to_string()
}

pub fn assert_ok_envelope(body: &Value) {
    assert_eq!(body["err_code"], 0, "unexpected envelope: {body}");
    assert!(body["trace_id"].as_str().is_some_and(|s| !s.is_empty()));
}

pub fn assert_err_envelope(body: &Value, err_code: i64) {
    assert_eq!(body["err_code"], err_code, "unexpected envelope: {body}");
    assert!(body["err_msg"].as_str().is_some_and(|s| !s.is_empty()));
    assert!(body["trace_id"].as_str().is_some_and(|s| !s.is_empty()));
    assert!(body["data"].is_null());
}

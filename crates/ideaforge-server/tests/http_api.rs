mod common;

use axum::http::StatusCode;
use common::*;
use ideaforge_ai::Purpose;
use ideaforge_server::auth::Claims;
use ideaforge_server::config::ServerConfig;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

fn error_fields(body: &Value) -> Vec<String> {
    body["data"]["errors"]
        .as_array()
        .expect("errors should be an array")
        .iter()
        .map(|e| e["field"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn health_is_public_and_carries_trace_id() {
    let ctx = build_test_context().await.unwrap();
    let (status, body, trace_id) = request_no_body(&ctx.app, "GET", "/v1/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_ok_envelope(&body);
    assert_eq!(body["data"]["ai_provider"], "scripted");
    assert_eq!(body["data"]["ai_model"], "scripted-1");
    assert_eq!(trace_id.as_deref(), body["trace_id"].as_str());
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let ctx = build_test_context().await.unwrap();

    let (status, body, _) = request_no_body(&ctx.app, "GET", "/v1/reports", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_err_envelope(&body, 1002);

    let (status, body, _) =
        request_no_body(&ctx.app, "GET", "/v1/reports", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_err_envelope(&body, 1002);

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/validate",
        None,
        Some(idea("Invoice bot", "Fintech", "EU")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_err_envelope(&body, 1002);
    assert!(ctx.analyzer.calls().is_empty());
}

#[tokio::test]
async fn expired_token_is_reported() {
    let ctx = build_test_context().await.unwrap();
    let now = chrono::Utc::now().timestamp() as u64;
    let claims = Claims {
        sub: "1".into(),
        username: "alice".into(),
        iat: now - 7200,
        exp: now - 3600,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap();

    let (status, body, _) = request_no_body(&ctx.app, "GET", "/v1/reports", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_err_envelope(&body, 1003);
}

#[tokio::test]
async fn login_checks_credentials() {
    let ctx = build_test_context().await.unwrap();

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/login",
        None,
        Some(json!({"username": "alice", "password": "wrong-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_err_envelope(&body, 1002);

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/login",
        None,
        Some(json!({"username": "nobody", "password": "whatever1"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_err_envelope(&body, 1002);

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/login",
        None,
        Some(json!({"username": "", "password": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_err_envelope(&body, 1001);

    let token = login(&ctx.app, ALICE.0, ALICE.1).await;
    let (status, _, _) = request_no_body(&ctx.app, "GET", "/v1/reports", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn register_then_login() {
    let ctx = build_test_context().await.unwrap();

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/register",
        None,
        Some(json!({"username": "carol", "password": "carol-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ok_envelope(&body);
    assert_eq!(body["data"]["username"], "carol");

    login(&ctx.app, "carol", "carol-password").await;

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/register",
        None,
        Some(json!({"username": "carol", "password": "another-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_err_envelope(&body, 1005);

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/register",
        None,
        Some(json!({"username": "dv", "password": "short"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["err_code"], 1006);
    assert_eq!(error_fields(&body), vec!["username", "password"]);
}

#[tokio::test]
async fn register_can_be_disabled() {
    let mut config = ServerConfig::default();
    config.auth.allow_registration = false;
    let ctx = build_test_context_with(config).await.unwrap();

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/register",
        None,
        Some(json!({"username": "carol", "password": "carol-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_err_envelope(&body, 1007);
}

#[tokio::test]
async fn validate_reports_every_invalid_field() {
    let ctx = build_test_context().await.unwrap();
    let token = login(&ctx.app, ALICE.0, ALICE.1).await;

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/validate",
        Some(&token),
        Some(json!({"title": "abcd", "description": "too short", "region": "EU"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["err_code"], 1006);
    assert_eq!(error_fields(&body), vec!["title", "description", "industry"]);
    assert!(ctx.analyzer.calls().is_empty());
}

#[tokio::test]
async fn validate_rejects_malformed_json() {
    let ctx = build_test_context().await.unwrap();
    let token = login(&ctx.app, ALICE.0, ALICE.1).await;

    let (status, body, _) =
        request_raw(&ctx.app, "POST", "/v1/validate", Some(&token), "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_err_envelope(&body, 1001);
}

#[tokio::test]
async fn validate_accepts_minimum_lengths_and_persists_report() {
    let ctx = build_test_context().await.unwrap();
    let token = login(&ctx.app, ALICE.0, ALICE.1).await;

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/validate",
        Some(&token),
        Some(json!({
            "title": "abcde",
            "description": "a".repeat(20),
            "industry": "SaaS",
            "region": "Global"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_ok_envelope(&body);
    assert_eq!(body["data"]["metrics"]["tam"], 5_000_000_000u64);
    assert_eq!(body["data"]["metrics"]["investment_score"], 72);
    assert_eq!(body["data"]["metrics"]["tech_budget"], "$120,000");
    assert!(body["data"]["analysis"]["swot"].is_object());
    assert_eq!(ctx.analyzer.calls(), vec![Purpose::Analysis]);

    let id = body["data"]["id"].as_str().unwrap().to_string();
    let (status, body, _) =
        request_no_body(&ctx.app, "GET", &format!("/v1/reports/{id}"), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "abcde");
    assert!(body["data"]["target_market"].is_null());
}

#[tokio::test]
async fn unusable_model_output_is_an_ai_error() {
    let ctx = build_test_context().await.unwrap();
    let token = login(&ctx.app, ALICE.0, ALICE.1).await;

    ctx.analyzer
        .set_reply(Purpose::Analysis, "Sorry, I can't produce that analysis.");
    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/validate",
        Some(&token),
        Some(idea("Invoice bot", "Fintech", "EU")),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_err_envelope(&body, 1502);

    // 对象缺少必需的分析部分
    ctx.analyzer
        .set_reply(Purpose::Analysis, r#"{"marketAnalysis": {"tam": 1}}"#);
    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/validate",
        Some(&token),
        Some(idea("Invoice bot", "Fintech", "EU")),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_err_envelope(&body, 1502);

    let (_, body, _) = request_no_body(&ctx.app, "GET", "/v1/reports", Some(&token)).await;
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn list_reports_paginates_and_filters() {
    let ctx = build_test_context().await.unwrap();
    let token = login(&ctx.app, ALICE.0, ALICE.1).await;

    let first = create_report(&ctx.app, &token, idea("Solar kiosks", "Energy", "Africa")).await;
    let second = create_report(&ctx.app, &token, idea("Invoice bot", "Fintech", "EU")).await;
    let third = create_report(&ctx.app, &token, idea("Battery swap", "Energy", "Asia")).await;

    let (status, body, _) =
        request_no_body(&ctx.app, "GET", "/v1/reports?page=1&limit=2", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_ok_envelope(&body);
    let data = &body["data"];
    assert_eq!(data["total"], 3);
    assert_eq!(data["page"], 1);
    assert_eq!(data["limit"], 2);
    assert_eq!(data["total_pages"], 2);
    let ids: Vec<&str> = data["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![third.as_str(), second.as_str()]);
    assert_eq!(data["items"][0]["tam"], "5000000000");
    assert_eq!(data["items"][0]["has_pitch_deck"], false);

    let (_, body, _) =
        request_no_body(&ctx.app, "GET", "/v1/reports?page=2&limit=2", Some(&token)).await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["items"][0]["id"], first.as_str());

    let (_, body, _) =
        request_no_body(&ctx.app, "GET", "/v1/reports?industry=Energy", Some(&token)).await;
    assert_eq!(body["data"]["total"], 2);

    let (_, body, _) = request_no_body(
        &ctx.app,
        "GET",
        "/v1/reports?industry=Energy&region=Asia",
        Some(&token),
    )
    .await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["id"], third.as_str());

    let (_, body, _) =
        request_no_body(&ctx.app, "GET", "/v1/reports?search=Invoice", Some(&token)).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["title"], "Invoice bot");

    let (_, body, _) =
        request_no_body(&ctx.app, "GET", "/v1/reports?page=9", Some(&token)).await;
    assert_eq!(body["data"]["total"], 3);
    assert!(body["data"]["items"].as_array().unwrap().is_empty());

    let (_, body, _) =
        request_no_body(&ctx.app, "GET", "/v1/reports?search=%25", Some(&token)).await;
    assert_eq!(body["data"]["total"], 0);

    let (status, body, _) =
        request_no_body(&ctx.app, "GET", "/v1/reports?limit=abc", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_err_envelope(&body, 1001);
}

#[tokio::test]
async fn list_reports_survives_extreme_paging() {
    let ctx = build_test_context().await.unwrap();
    let token = login(&ctx.app, ALICE.0, ALICE.1).await;
    create_report(&ctx.app, &token, idea("Invoice bot", "Fintech", "EU")).await;

    for uri in [
        "/v1/reports?page=18446744073709551615&limit=100000",
        "/v1/reports?page=100000000000000000&limit=100",
    ] {
        let (status, body, _) = request_no_body(&ctx.app, "GET", uri, Some(&token)).await;
        assert_eq!(status, StatusCode::OK, "{uri}: {body}");
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["limit"], 100);
        assert!(body["data"]["items"].as_array().unwrap().is_empty());
    }

    let (status, body, _) = request_no_body(
        &ctx.app,
        "GET",
        "/v1/reports?limit=18446744073709551615",
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["limit"], 100);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

    let (status, body, _) = request_no_body(
        &ctx.app,
        "GET",
        "/v1/reports?page=18446744073709551616",
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_err_envelope(&body, 1001);
}

#[tokio::test]
async fn report_detail_includes_chart_data() {
    let ctx = build_test_context().await.unwrap();
    let token = login(&ctx.app, ALICE.0, ALICE.1).await;
    let id = create_report(&ctx.app, &token, idea("Invoice bot", "Fintech", "EU")).await;

    let (status, body, _) =
        request_no_body(&ctx.app, "GET", &format!("/v1/reports/{id}"), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["id"], id.as_str());
    assert_eq!(data["tam"], "5000000000");
    assert_eq!(data["sam"], "800000000");
    assert_eq!(data["investment_score"], 72);
    assert_eq!(data["tech_timeline"], "6 months");

    let charts = &data["charts"];
    assert_eq!(charts["market_size"][0], json!({"label": "TAM", "value": "5000000000"}));
    assert_eq!(charts["market_size"].as_array().unwrap().len(), 3);
    assert_eq!(charts["competitor_counts"], json!({"direct": 2, "indirect": 1}));
    assert_eq!(charts["swot_counts"]["opportunities"], 2);
    assert_eq!(
        charts["risk_matrix"],
        json!([{"impact": "high", "probability": "medium", "count": 1}])
    );
    assert_eq!(charts["investment_score"], 72);
    assert_eq!(charts["trends"], json!(["remote work", "automation"]));
}

#[tokio::test]
async fn reports_are_private_to_their_owner() {
    let ctx = build_test_context().await.unwrap();
    let alice = login(&ctx.app, ALICE.0, ALICE.1).await;
    let bob = login(&ctx.app, BOB.0, BOB.1).await;
    let id = create_report(&ctx.app, &alice, idea("Invoice bot", "Fintech", "EU")).await;
    let path = format!("/v1/reports/{id}");

    let (status, body, _) = request_no_body(&ctx.app, "GET", &path, Some(&bob)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_err_envelope(&body, 1004);

    let (status, _, _) = request_no_body(&ctx.app, "DELETE", &path, Some(&bob)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    for doc in ["pitch-deck", "one-pager"] {
        let (status, body, _) =
            request_no_body(&ctx.app, "POST", &format!("{path}/{doc}"), Some(&bob)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{doc}");
        assert_err_envelope(&body, 1004);
    }

    let (_, body, _) = request_no_body(&ctx.app, "GET", "/v1/reports", Some(&bob)).await;
    assert_eq!(body["data"]["total"], 0);

    let (status, _, _) = request_no_body(&ctx.app, "GET", &path, Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn delete_report_removes_it() {
    let ctx = build_test_context().await.unwrap();
    let token = login(&ctx.app, ALICE.0, ALICE.1).await;
    let id = create_report(&ctx.app, &token, idea("Invoice bot", "Fintech", "EU")).await;
    let path = format!("/v1/reports/{id}");

    let (status, body, _) = request_no_body(&ctx.app, "DELETE", &path, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_ok_envelope(&body);

    let (status, _, _) = request_no_body(&ctx.app, "GET", &path, Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = request_no_body(&ctx.app, "DELETE", &path, Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) =
        request_no_body(&ctx.app, "GET", "/v1/reports/does-not-exist", Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pitch_deck_is_merged_into_report() {
    let ctx = build_test_context().await.unwrap();
    let token = login(&ctx.app, ALICE.0, ALICE.1).await;
    let id = create_report(&ctx.app, &token, idea("Invoice bot", "Fintech", "EU")).await;

    let (status, body, _) = request_no_body(
        &ctx.app,
        "POST",
        &format!("/v1/reports/{id}/pitch-deck"),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_ok_envelope(&body);
    assert_eq!(body["data"]["report_id"], id.as_str());
    let slides = body["data"]["pitch_deck"]["slides"].as_array().unwrap();
    assert_eq!(slides.len(), 10);
    assert_eq!(slides[0]["bulletPoints"], json!(["one", "two"]));

    let (_, body, _) =
        request_no_body(&ctx.app, "GET", &format!("/v1/reports/{id}"), Some(&token)).await;
    let analysis = &body["data"]["analysis"];
    assert_eq!(analysis["pitchDeck"]["slides"][0]["title"], "Title");
    assert!(analysis["pitchDeckGeneratedAt"].is_string());
    // 原有分析内容保留
    assert!(analysis["marketAnalysis"].is_object());
    assert_eq!(body["data"]["tam"], "5000000000");

    let (_, body, _) = request_no_body(&ctx.app, "GET", "/v1/reports", Some(&token)).await;
    assert_eq!(body["data"]["items"][0]["has_pitch_deck"], true);
    assert_eq!(body["data"]["items"][0]["has_one_pager"], false);

    // 重新生成覆盖旧版本
    ctx.analyzer
        .set_reply(Purpose::PitchDeck, pitch_deck_reply("Second take"));
    let (status, _, _) = request_no_body(
        &ctx.app,
        "POST",
        &format!("/v1/reports/{id}/pitch-deck"),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body, _) =
        request_no_body(&ctx.app, "GET", &format!("/v1/reports/{id}"), Some(&token)).await;
    assert_eq!(
        body["data"]["analysis"]["pitchDeck"]["slides"][0]["title"],
        "Second take"
    );
}

#[tokio::test]
async fn one_pager_is_merged_into_report() {
    let ctx = build_test_context().await.unwrap();
    let token = login(&ctx.app, ALICE.0, ALICE.1).await;
    let id = create_report(&ctx.app, &token, idea("Invoice bot", "Fintech", "EU")).await;

    let (status, body, _) = request_no_body(
        &ctx.app,
        "POST",
        &format!("/v1/reports/{id}/one-pager"),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["one_pager"]["companyOverview"], "Acme");
    assert_eq!(body["data"]["one_pager"]["fundingAsk"], "funding");

    let (_, body, _) =
        request_no_body(&ctx.app, "GET", &format!("/v1/reports/{id}"), Some(&token)).await;
    let analysis = &body["data"]["analysis"];
    assert_eq!(analysis["onePager"]["companyOverview"], "Acme");
    assert!(analysis["onePagerGeneratedAt"].is_string());
    assert!(analysis.get("pitchDeck").is_none());
}

#[tokio::test]
async fn malformed_document_leaves_report_untouched() {
    let ctx = build_test_context().await.unwrap();
    let token = login(&ctx.app, ALICE.0, ALICE.1).await;
    let id = create_report(&ctx.app, &token, idea("Invoice bot", "Fintech", "EU")).await;

    // 只有 9 页
    let slides: Vec<Value> = (0..9).map(|i| json!({"title": format!("S{i}")})).collect();
    ctx.analyzer
        .set_reply(Purpose::PitchDeck, json!({ "slides": slides }).to_string());
    let (status, body, _) = request_no_body(
        &ctx.app,
        "POST",
        &format!("/v1/reports/{id}/pitch-deck"),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_err_envelope(&body, 1502);

    ctx.analyzer
        .set_reply(Purpose::OnePager, r#"{"companyOverview": "only one"}"#);
    let (status, body, _) = request_no_body(
        &ctx.app,
        "POST",
        &format!("/v1/reports/{id}/one-pager"),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_err_envelope(&body, 1502);

    let (_, body, _) =
        request_no_body(&ctx.app, "GET", &format!("/v1/reports/{id}"), Some(&token)).await;
    assert!(body["data"]["analysis"].get("pitchDeck").is_none());
    assert!(body["data"]["analysis"].get("onePager").is_none());
}

#[tokio::test]
async fn openapi_document_lists_routes() {
    let ctx = build_test_context().await.unwrap();
    let (status, body, _) = request_no_body(&ctx.app, "GET", "/v1/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);

    let paths = body["paths"].as_object().expect("paths should exist");
    for path in [
        "/v1/health",
        "/v1/auth/login",
        "/v1/auth/register",
        "/v1/validate",
        "/v1/reports",
        "/v1/reports/{id}",
        "/v1/reports/{id}/pitch-deck",
        "/v1/reports/{id}/one-pager",
    ] {
        assert!(paths.contains_key(path), "missing {path}");
    }
    assert!(body["components"]["securitySchemes"]["bearer_auth"].is_object());
}

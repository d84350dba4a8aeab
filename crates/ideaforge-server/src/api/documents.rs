use crate::api::reports::{parse_analysis, report_not_found};
use crate::api::{error_response, success_response, ApiError};
use crate::auth::Claims;
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use ideaforge_ai::ReportContext;
use ideaforge_common::analysis::{
    IdeaAnalysis, OnePager, PitchDeck, ONE_PAGER_GENERATED_AT_KEY, ONE_PAGER_KEY,
    PITCH_DECK_GENERATED_AT_KEY, PITCH_DECK_KEY,
};
use ideaforge_common::types::IdeaSubmission;
use ideaforge_storage::StorageError;
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// 路演 PPT 生成结果
#[derive(Serialize, ToSchema)]
pub struct PitchDeckResponse {
    pub report_id: String,
    pub pitch_deck: PitchDeck,
    pub generated_at: DateTime<Utc>,
}

/// 一页纸摘要生成结果
#[derive(Serialize, ToSchema)]
pub struct OnePagerResponse {
    pub report_id: String,
    pub one_pager: OnePager,
    pub generated_at: DateTime<Utc>,
}

fn internal(trace_id: &str, code: &str, msg: &str) -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, trace_id, code, msg)
}

/// Loads the caller's report and rebuilds the context the model needs.
async fn load_context(
    state: &AppState,
    trace_id: &str,
    id: &str,
    user_id: &str,
) -> Result<ReportContext, Response> {
    let row = match state.store.get_report_for_user(id, user_id).await {
        Ok(Some(row)) => row,
        Ok(None) => return Err(report_not_found(trace_id, id)),
        Err(e) => {
            tracing::error!(report_id = %id, error = %e, "Failed to load report");
            return Err(internal(trace_id, "storage_error", "Database error"));
        }
    };

    let analysis = match parse_analysis(&row) {
        Ok(v) => IdeaAnalysis::from_value(&v),
        Err(e) => {
            tracing::error!(report_id = %id, error = %e, "Stored analysis is not valid JSON");
            return Err(internal(trace_id, "internal_error", "Failed to load report"));
        }
    };

    Ok(ReportContext {
        idea: IdeaSubmission {
            title: row.title,
            description: row.description,
            industry: row.industry,
            target_market: row.target_market,
            region: row.region,
        },
        analysis,
    })
}

/// Writes `document` and its timestamp into the stored analysis blob.
/// A second generation replaces the first.
async fn save_document<T: Serialize>(
    state: &AppState,
    trace_id: &str,
    id: &str,
    user_id: &str,
    keys: (&str, &str),
    document: &T,
) -> Result<DateTime<Utc>, Response> {
    let (doc_key, generated_at_key) = keys;
    let generated_at = Utc::now();

    let doc = match serde_json::to_value(document) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(report_id = %id, error = %e, "Failed to serialize document");
            return Err(internal(trace_id, "internal_error", "Internal error"));
        }
    };
    let mut entries = Map::new();
    entries.insert(doc_key.to_string(), doc);
    entries.insert(
        generated_at_key.to_string(),
        Value::String(generated_at.to_rfc3339()),
    );

    match state.store.merge_report_analysis(id, user_id, entries).await {
        Ok(_) => Ok(generated_at),
        Err(e) => {
            // 生成期间报告被删除
            if matches!(
                e.downcast_ref::<StorageError>(),
                Some(StorageError::NotFound { .. })
            ) {
                return Err(report_not_found(trace_id, id));
            }
            tracing::error!(report_id = %id, error = %e, "Failed to save document");
            Err(internal(trace_id, "storage_error", "Failed to save document"))
        }
    }
}

/// 为报告生成 10 页路演 PPT。
/// 结果写回报告的分析 JSON，重复生成会覆盖。
#[utoipa::path(
    post,
    path = "/v1/reports/{id}/pitch-deck",
    tag = "Documents",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "报告 ID")),
    responses(
        (status = 200, description = "路演 PPT", body = PitchDeckResponse),
        (status = 401, description = "未认证", body = ApiError),
        (status = 404, description = "报告不存在", body = ApiError),
        (status = 500, description = "生成失败", body = ApiError)
    )
)]
async fn generate_pitch_deck(
    Extension(trace_id): Extension<TraceId>,
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let ctx = match load_context(&state, &trace_id, &id, &claims.sub).await {
        Ok(ctx) => ctx,
        Err(resp) => return resp,
    };

    let pitch_deck = match state.analyzer.generate_pitch_deck(&ctx).await {
        Ok(deck) => deck,
        Err(e) => {
            tracing::error!(report_id = %id, error = %e, "Pitch deck generation failed");
            return internal(&trace_id, "ai_error", "Failed to generate pitch deck");
        }
    };

    let generated_at = match save_document(
        &state,
        &trace_id,
        &id,
        &claims.sub,
        (PITCH_DECK_KEY, PITCH_DECK_GENERATED_AT_KEY),
        &pitch_deck,
    )
    .await
    {
        Ok(at) => at,
        Err(resp) => return resp,
    };

    tracing::info!(report_id = %id, slides = pitch_deck.slides.len(), "Pitch deck generated");
    success_response(
        StatusCode::OK,
        &trace_id,
        PitchDeckResponse {
            report_id: id,
            pitch_deck,
            generated_at,
        },
    )
}

/// 为报告生成一页纸摘要。
#[utoipa::path(
    post,
    path = "/v1/reports/{id}/one-pager",
    tag = "Documents",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "报告 ID")),
    responses(
        (status = 200, description = "一页纸摘要", body = OnePagerResponse),
        (status = 401, description = "未认证", body = ApiError),
        (status = 404, description = "报告不存在", body = ApiError),
        (status = 500, description = "生成失败", body = ApiError)
    )
)]
async fn generate_one_pager(
    Extension(trace_id): Extension<TraceId>,
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let ctx = match load_context(&state, &trace_id, &id, &claims.sub).await {
        Ok(ctx) => ctx,
        Err(resp) => return resp,
    };

    let one_pager = match state.analyzer.generate_one_pager(&ctx).await {
        Ok(doc) => doc,
        Err(e) => {
            tracing::error!(report_id = %id, error = %e, "One-pager generation failed");
            return internal(&trace_id, "ai_error", "Failed to generate one-pager");
        }
    };

    let generated_at = match save_document(
        &state,
        &trace_id,
        &id,
        &claims.sub,
        (ONE_PAGER_KEY, ONE_PAGER_GENERATED_AT_KEY),
        &one_pager,
    )
    .await
    {
        Ok(at) => at,
        Err(resp) => return resp,
    };

    tracing::info!(report_id = %id, "One-pager generated");
    success_response(
        StatusCode::OK,
        &trace_id,
        OnePagerResponse {
            report_id: id,
            one_pager,
            generated_at,
        },
    )
}

pub fn document_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(generate_pitch_deck))
        .routes(routes!(generate_one_pager))
}

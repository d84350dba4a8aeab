use crate::api::pagination::{total_pages, PageParams};
use crate::api::{
    error_response, json_body, success_empty_response, success_response,
    validation_error_response, ApiError,
};
use crate::auth::Claims;
use crate::logging::TraceId;
use crate::state::AppState;
use crate::validation::{validate_submission, ValidationErrors};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use ideaforge_common::analysis::{
    ChartView, IdeaAnalysis, ReportMetrics, ONE_PAGER_KEY, PITCH_DECK_KEY,
};
use ideaforge_common::types::{CreateReportRequest, IdeaSubmission, ReportFilter, ReportRow};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

/// 创建验证报告响应
#[derive(Serialize, ToSchema)]
pub struct ValidateResponse {
    /// 报告 ID
    pub id: String,
    /// 模型返回的完整分析 JSON
    #[schema(value_type = Object)]
    pub analysis: Value,
    /// 从分析中提取的标量字段
    pub metrics: ReportMetrics,
}

/// 报告列表项
#[derive(Serialize, ToSchema)]
pub struct ReportSummary {
    pub id: String,
    pub title: String,
    pub industry: String,
    pub region: String,
    pub target_market: Option<String>,
    /// 大整数以字符串返回
    pub tam: Option<String>,
    pub sam: Option<String>,
    pub som: Option<String>,
    pub investment_score: Option<i32>,
    pub tech_budget: Option<String>,
    pub tech_timeline: Option<String>,
    pub created_at: DateTime<Utc>,
    /// 是否已生成路演 PPT
    pub has_pitch_deck: bool,
    /// 是否已生成一页纸摘要
    pub has_one_pager: bool,
}

/// 报告分页列表
#[derive(Serialize, ToSchema)]
pub struct ReportPage {
    pub items: Vec<ReportSummary>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

/// 报告详情
#[derive(Serialize, ToSchema)]
pub struct ReportDetail {
    pub id: String,
    pub title: String,
    pub description: String,
    pub industry: String,
    pub target_market: Option<String>,
    pub region: String,
    pub tam: Option<String>,
    pub sam: Option<String>,
    pub som: Option<String>,
    pub investment_score: Option<i32>,
    pub tech_budget: Option<String>,
    pub tech_timeline: Option<String>,
    /// 存储的原始分析 JSON（含已生成的文档）
    #[schema(value_type = Object)]
    pub analysis: Value,
    /// 图表数据
    pub charts: ChartView,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListReportsParams {
    /// 页码，从 1 开始（默认 1）
    #[serde(default)]
    pub page: Option<String>,
    /// 每页条数（默认 10，最大 100）
    #[serde(default)]
    pub limit: Option<String>,
    /// 行业精确匹配
    #[serde(default)]
    pub industry: Option<String>,
    /// 地区精确匹配
    #[serde(default)]
    pub region: Option<String>,
    /// 标题或描述模糊匹配
    #[serde(default)]
    pub search: Option<String>,
}

impl ListReportsParams {
    fn page_params(&self) -> Result<PageParams, String> {
        PageParams::parse(self.page.as_deref(), self.limit.as_deref())
    }

    fn filter(&self) -> ReportFilter {
        let clean = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        ReportFilter {
            industry: clean(&self.industry),
            region: clean(&self.region),
            search: clean(&self.search),
        }
    }
}

fn big_int(v: Option<i64>) -> Option<String> {
    v.map(|n| n.to_string())
}

pub(crate) fn parse_analysis(row: &ReportRow) -> Result<Value, serde_json::Error> {
    serde_json::from_str(&row.analysis_json)
}

fn to_summary(row: ReportRow) -> ReportSummary {
    let analysis = parse_analysis(&row).unwrap_or(Value::Null);
    ReportSummary {
        has_pitch_deck: analysis.get(PITCH_DECK_KEY).is_some(),
        has_one_pager: analysis.get(ONE_PAGER_KEY).is_some(),
        id: row.id,
        title: row.title,
        industry: row.industry,
        region: row.region,
        target_market: row.target_market,
        tam: big_int(row.tam),
        sam: big_int(row.sam),
        som: big_int(row.som),
        investment_score: row.investment_score,
        tech_budget: row.tech_budget,
        tech_timeline: row.tech_timeline,
        created_at: row.created_at,
    }
}

fn to_detail(row: ReportRow, analysis: Value) -> ReportDetail {
    let charts = IdeaAnalysis::from_value(&analysis).chart_view();
    ReportDetail {
        id: row.id,
        title: row.title,
        description: row.description,
        industry: row.industry,
        target_market: row.target_market,
        region: row.region,
        tam: big_int(row.tam),
        sam: big_int(row.sam),
        som: big_int(row.som),
        investment_score: row.investment_score,
        tech_budget: row.tech_budget,
        tech_timeline: row.tech_timeline,
        analysis,
        charts,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

pub(crate) fn report_not_found(trace_id: &str, id: &str) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        trace_id,
        "not_found",
        &format!("Report '{id}' not found"),
    )
}

/// 提交创意并生成验证报告。
/// 调用 AI 模型分析，结果持久化后返回。
#[utoipa::path(
    post,
    path = "/v1/validate",
    tag = "Reports",
    security(("bearer_auth" = [])),
    request_body = IdeaSubmission,
    responses(
        (status = 201, description = "报告已创建", body = ValidateResponse),
        (status = 400, description = "参数校验失败", body = ValidationErrors),
        (status = 401, description = "未认证", body = ApiError),
        (status = 500, description = "分析失败", body = ApiError)
    )
)]
async fn validate_idea(
    Extension(trace_id): Extension<TraceId>,
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    payload: Result<Json<IdeaSubmission>, JsonRejection>,
) -> impl IntoResponse {
    let submission = match json_body(&trace_id, payload) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let idea = match validate_submission(&submission) {
        Ok(idea) => idea,
        Err(errors) => return validation_error_response(&trace_id, errors),
    };

    let outcome = match state.analyzer.analyze_idea(&idea).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, user_id = %claims.sub, error = %e, "Idea analysis failed");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "ai_error",
                "Failed to analyze idea",
            );
        }
    };

    let req = CreateReportRequest {
        user_id: claims.sub.clone(),
        idea,
        analysis_json: outcome.raw.to_string(),
        metrics: outcome.metrics.clone(),
    };
    let row = match state.store.insert_report(&req).await {
        Ok(row) => row,
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, user_id = %claims.sub, error = %e, "Failed to save report");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to save report",
            );
        }
    };

    tracing::info!(
        report_id = %row.id,
        user_id = %claims.sub,
        investment_score = ?outcome.metrics.investment_score,
        "Validation report created"
    );

    success_response(
        StatusCode::CREATED,
        &trace_id,
        ValidateResponse {
            id: row.id,
            analysis: outcome.raw,
            metrics: outcome.metrics,
        },
    )
}

/// 分页查询当前用户的报告列表。
/// 默认排序：`created_at` 倒序；默认分页：`page=1&limit=10`。
#[utoipa::path(
    get,
    path = "/v1/reports",
    tag = "Reports",
    security(("bearer_auth" = [])),
    params(ListReportsParams),
    responses(
        (status = 200, description = "报告分页列表", body = ReportPage),
        (status = 400, description = "分页参数错误", body = ApiError),
        (status = 401, description = "未认证", body = ApiError)
    )
)]
async fn list_reports(
    Extension(trace_id): Extension<TraceId>,
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Query(params): Query<ListReportsParams>,
) -> impl IntoResponse {
    let paging = match params.page_params() {
        Ok(p) => p,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &msg),
    };
    let filter = params.filter();
    let limit = paging.limit();

    let total = match state.store.count_reports(&claims.sub, &filter).await {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = %e, "Failed to count reports");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    };

    let rows = match state
        .store
        .list_reports(&claims.sub, &filter, limit, paging.offset())
        .await
    {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = %e, "Failed to list reports");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    };

    success_response(
        StatusCode::OK,
        &trace_id,
        ReportPage {
            items: rows.into_iter().map(to_summary).collect(),
            total,
            page: paging.page(),
            limit,
            total_pages: total_pages(total, limit),
        },
    )
}

/// 获取报告详情（含图表数据）。
#[utoipa::path(
    get,
    path = "/v1/reports/{id}",
    tag = "Reports",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "报告 ID")),
    responses(
        (status = 200, description = "报告详情", body = ReportDetail),
        (status = 401, description = "未认证", body = ApiError),
        (status = 404, description = "报告不存在", body = ApiError)
    )
)]
async fn get_report(
    Extension(trace_id): Extension<TraceId>,
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let row = match state.store.get_report_for_user(&id, &claims.sub).await {
        Ok(Some(row)) => row,
        Ok(None) => return report_not_found(&trace_id, &id),
        Err(e) => {
            tracing::error!(report_id = %id, error = %e, "Failed to load report");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    };

    let analysis = match parse_analysis(&row) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(report_id = %id, error = %e, "Stored analysis is not valid JSON");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "internal_error",
                "Failed to load report",
            );
        }
    };

    success_response(StatusCode::OK, &trace_id, to_detail(row, analysis))
}

/// 删除报告。
#[utoipa::path(
    delete,
    path = "/v1/reports/{id}",
    tag = "Reports",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "报告 ID")),
    responses(
        (status = 200, description = "报告已删除"),
        (status = 401, description = "未认证", body = ApiError),
        (status = 404, description = "报告不存在", body = ApiError)
    )
)]
async fn delete_report(
    Extension(trace_id): Extension<TraceId>,
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_report_for_user(&id, &claims.sub).await {
        Ok(true) => {
            tracing::info!(report_id = %id, user_id = %claims.sub, "Report deleted");
            success_empty_response(StatusCode::OK, &trace_id, "Report deleted")
        }
        Ok(false) => report_not_found(&trace_id, &id),
        Err(e) => {
            tracing::error!(report_id = %id, error = %e, "Failed to delete report");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

pub fn report_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(validate_idea))
        .routes(routes!(list_reports))
        .routes(routes!(get_report, delete_report))
}

use crate::analysis::ReportMetrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 创意提交表单
///
/// Every field defaults to empty so that a missing field surfaces as an
/// itemized validation error instead of a body parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct IdeaSubmission {
    /// 创意标题（5-200 字符）
    pub title: String,
    /// 创意描述（20-5000 字符）
    pub description: String,
    /// 所属行业（必填）
    pub industry: String,
    /// 目标市场（可选）
    #[serde(alias = "target_market")]
    pub target_market: Option<String>,
    /// 地区（必填）
    pub region: String,
}

impl IdeaSubmission {
    /// Copy with surrounding whitespace removed and an empty target market
    /// collapsed to `None`.
    pub fn normalized(&self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            industry: self.industry.trim().to_string(),
            target_market: self
                .target_market
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            region: self.region.trim().to_string(),
        }
    }
}

/// One persisted idea-validation report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub industry: String,
    pub target_market: Option<String>,
    pub region: String,
    /// Analysis blob exactly as returned by the model, plus merged documents.
    pub analysis_json: String,
    pub tam: Option<i64>,
    pub sam: Option<i64>,
    pub som: Option<i64>,
    pub investment_score: Option<i32>,
    pub tech_budget: Option<String>,
    pub tech_timeline: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for inserting a report.
#[derive(Debug, Clone)]
pub struct CreateReportRequest {
    pub user_id: String,
    pub idea: IdeaSubmission,
    pub analysis_json: String,
    pub metrics: ReportMetrics,
}

/// Filters accepted by the report listing. All are optional and combine with AND.
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub industry: Option<String>,
    pub region: Option<String>,
    /// Substring match on title or description.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// 唯一标识
    pub id: String,
    /// 登录用户名
    pub username: String,
    /// 密码哈希（bcrypt）
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 登录请求
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    /// 登录用户名（必填）
    pub username: String,
    /// 密码（必填）
    pub password: String,
}

/// 注册请求
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    /// 用户名（3-64 字符）
    pub username: String,
    /// 密码（至少 8 字符）
    pub password: String,
}

/// 登录响应
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LoginResponse {
    /// JWT Access Token
    pub access_token: String,
    /// Token 有效期（秒）
    pub expires_in: u64,
}

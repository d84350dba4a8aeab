use ideaforge_common::types::{IdeaSubmission, RegisterRequest};
use serde::Serialize;
use utoipa::ToSchema;

pub const TITLE_MIN: usize = 5;
pub const TITLE_MAX: usize = 200;
pub const DESCRIPTION_MIN: usize = 20;
pub const DESCRIPTION_MAX: usize = 5000;
pub const INDUSTRY_MAX: usize = 100;
pub const REGION_MAX: usize = 100;
pub const TARGET_MARKET_MAX: usize = 500;
pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 64;
pub const PASSWORD_MIN: usize = 8;

/// 单个字段校验错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    /// 字段名（与请求体字段一致）
    pub field: String,
    /// 错误描述
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// 校验失败详情
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn new() -> Self {
        Self { errors: Vec::new() }
    }

    fn required(&mut self, field: &str, value: &str) -> bool {
        if value.is_empty() {
            self.errors
                .push(FieldError::new(field, format!("{field} is required")));
            return false;
        }
        true
    }

    fn min_chars(&mut self, field: &str, value: &str, min: usize) {
        if value.chars().count() < min {
            self.errors.push(FieldError::new(
                field,
                format!("{field} must be at least {min} characters"),
            ));
        }
    }

    fn max_chars(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.errors.push(FieldError::new(
                field,
                format!("{field} must be at most {max} characters"),
            ));
        }
    }

    fn finish<T>(self, value: T) -> Result<T, Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self.errors)
        }
    }
}

/// Checks an idea submission and returns its trimmed form.
///
/// Every rule is evaluated; the error list holds one entry per violation.
pub fn validate_submission(input: &IdeaSubmission) -> Result<IdeaSubmission, Vec<FieldError>> {
    let idea = input.normalized();
    let mut c = Checker::new();

    c.min_chars("title", &idea.title, TITLE_MIN);
    c.max_chars("title", &idea.title, TITLE_MAX);
    c.min_chars("description", &idea.description, DESCRIPTION_MIN);
    c.max_chars("description", &idea.description, DESCRIPTION_MAX);
    if c.required("industry", &idea.industry) {
        c.max_chars("industry", &idea.industry, INDUSTRY_MAX);
    }
    if c.required("region", &idea.region) {
        c.max_chars("region", &idea.region, REGION_MAX);
    }
    if let Some(target) = idea.target_market.as_deref() {
        c.max_chars("targetMarket", target, TARGET_MARKET_MAX);
    }

    c.finish(idea)
}

/// 注册参数校验
pub fn validate_registration(req: &RegisterRequest) -> Result<(), Vec<FieldError>> {
    let username = req.username.trim();
    let mut c = Checker::new();

    if c.required("username", username) {
        c.min_chars("username", username, USERNAME_MIN);
        c.max_chars("username", username, USERNAME_MAX);
    }
    if c.required("password", &req.password) {
        c.min_chars("password", &req.password, PASSWORD_MIN);
    }

    c.finish(())
}

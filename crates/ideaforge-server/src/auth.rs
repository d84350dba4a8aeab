use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ideaforge_common::types::{LoginRequest, LoginResponse, RegisterRequest};
use ideaforge_storage::auth::{hash_password, verify_password};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::{error_response, json_body, success_response, validation_error_response, ApiError};
use crate::logging::TraceId;
use crate::state::AppState;
use crate::validation::{validate_registration, ValidationErrors};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub iat: u64,
    pub exp: u64,
}

pub fn create_token(
    secret: &str,
    user_id: &str,
    username: &str,
    expire_secs: u64,
) -> anyhow::Result<String> {
    let now = chrono::Utc::now().timestamp() as u64;
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        iat: now,
        exp: now + expire_secs,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn validate_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

fn unauthorized(trace_id: &str, code: &str, msg: &str) -> Response {
    error_response(StatusCode::UNAUTHORIZED, trace_id, code, msg)
}

/// JWT 鉴权中间件
///
/// 校验通过后把 [`Claims`] 放入 request extensions。
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let trace_id = req
        .extensions()
        .get::<TraceId>()
        .map(|t| t.0.clone())
        .unwrap_or_default();

    let token = match req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        None => return unauthorized(&trace_id, "unauthorized", "Missing authorization header"),
        Some(header) => match header.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => token.trim().to_string(),
            _ => return unauthorized(&trace_id, "unauthorized", "Invalid authorization header"),
        },
    };

    match validate_token(&state.jwt_secret, &token) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
            unauthorized(&trace_id, "token_expired", "Token expired")
        }
        Err(e) => {
            tracing::debug!(trace_id = %trace_id, error = %e, "Rejected bearer token");
            unauthorized(&trace_id, "unauthorized", "Invalid token")
        }
    }
}

/// 注册成功响应
#[derive(Serialize, ToSchema)]
pub struct RegisterResponse {
    /// 用户 ID
    pub id: String,
    pub username: String,
}

/// 登录接口
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "登录成功", body = LoginResponse),
        (status = 400, description = "请求参数错误", body = ApiError),
        (status = 401, description = "用户名或密码错误", body = ApiError)
    )
)]
pub async fn login(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> impl IntoResponse {
    let req = match json_body(&trace_id, payload) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "username and password are required",
        );
    }

    let user = match state.store.get_user_by_username(username).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            return unauthorized(&trace_id, "unauthorized", "Invalid credentials");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to query user");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    };

    if !verify_password(&req.password, &user.password_hash) {
        tracing::warn!(username = %username, "Login failed: wrong password");
        return unauthorized(&trace_id, "unauthorized", "Invalid credentials");
    }

    match create_token(
        &state.jwt_secret,
        &user.id,
        &user.username,
        state.token_expire_secs,
    ) {
        Ok(access_token) => {
            tracing::info!(user_id = %user.id, "User logged in");
            success_response(
                StatusCode::OK,
                &trace_id,
                LoginResponse {
                    access_token,
                    expires_in: state.token_expire_secs,
                },
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to create token");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "internal_error",
                "Internal error",
            )
        }
    }
}

/// 注册接口。
/// 配置 `auth.allow_registration = false` 时返回 403。
#[utoipa::path(
    post,
    path = "/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "注册成功", body = RegisterResponse),
        (status = 400, description = "参数校验失败", body = ValidationErrors),
        (status = 403, description = "注册已关闭", body = ApiError),
        (status = 409, description = "用户名已存在", body = ApiError)
    )
)]
pub async fn register(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> impl IntoResponse {
    if !state.config.auth.allow_registration {
        return error_response(
            StatusCode::FORBIDDEN,
            &trace_id,
            "forbidden",
            "Registration is disabled",
        );
    }
    let req = match json_body(&trace_id, payload) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(errors) = validate_registration(&req) {
        return validation_error_response(&trace_id, errors);
    }
    let username = req.username.trim();

    let username_taken = || {
        error_response(
            StatusCode::CONFLICT,
            &trace_id,
            "conflict",
            &format!("Username '{username}' already exists"),
        )
    };
    let db_error = || {
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &trace_id,
            "storage_error",
            "Database error",
        )
    };

    match state.store.get_user_by_username(username).await {
        Ok(Some(_)) => return username_taken(),
        Ok(None) => {}
        Err(e) => {
            tracing::error!(error = %e, "Failed to query user");
            return db_error();
        }
    }

    let hash = match hash_password(&req.password) {
        Ok(h) => h,
        Err(e) => {
            tracing::error!(error = %e, "Failed to hash password");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "internal_error",
                "Internal error",
            );
        }
    };

    match state.store.create_user(username, &hash).await {
        Ok(id) => {
            tracing::info!(user_id = %id, username = %username, "User registered");
            success_response(
                StatusCode::CREATED,
                &trace_id,
                RegisterResponse {
                    id,
                    username: username.to_string(),
                },
            )
        }
        Err(e) => {
            // 并发注册同名用户时唯一索引兜底
            if let Ok(Some(_)) = state.store.get_user_by_username(username).await {
                return username_taken();
            }
            tracing::error!(error = %e, "Failed to create user");
            db_error()
        }
    }
}

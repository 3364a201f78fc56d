use super::error::*;
use crate::application_port::*;
use crate::domain_model::RoleKind;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

async fn register(
    body: RegisterRequest,
    role: RoleKind,
    auth_service: Arc<dyn AuthService>,
) -> Result<(), warp::Rejection> {
    let register_input = RegisterInput {
        username: body.username,
        password: body.password,
        email: body.email,
    };
    auth_service
        .register(register_input, role)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(())
}

pub async fn register_user(
    body: RegisterRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    register(body, RoleKind::User, auth_service).await?;
    Ok(warp::reply::json(&ApiResponse::ok(
        "User registered successfully",
    )))
}

pub async fn register_admin(
    body: RegisterRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    register(body, RoleKind::Admin, auth_service).await?;
    Ok(warp::reply::json(&ApiResponse::ok(
        "Admin registered successfully",
    )))
}

pub async fn login(
    body: LoginRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let login_input = LoginInput {
        username: body.username,
        password: body.password,
    };
    let login_result = auth_service
        .login(login_input)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(login_result)))
}

pub async fn list_users(
    claims: TokenClaims,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    tracing::debug!(requested_by = %claims.sub, "listing users");
    let users = user_service
        .list_users()
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(users)))
}

pub async fn health() -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(&ApiResponse::ok("ok")))
}

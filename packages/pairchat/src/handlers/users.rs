use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::info;

use crate::AppState;
use crate::error::{ChatError, Result};
use crate::models::{LoginRequest, LoginResponse, RegisterRequest, UserInfo};

pub async fn register_handler(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserInfo>)> {
    if !state.identity.allow_registration {
        return Err(ChatError::RegistrationClosed);
    }

    let user = state.repository.register_user(&req).await?;
    info!(user_id = %user.id, "Registered user {}", user.username);
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn login_handler(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let user = state.repository.verify_login(&req.email, &req.password).await?;
    Ok(Json(LoginResponse {
        user_id: user.id,
        display_name: user.display_name,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub viewer: String,
}

/// Everyone a viewer could open a conversation with.
pub async fn list_users_handler(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<UserInfo>>> {
    Ok(Json(state.repository.list_other_users(&query.viewer).await?))
}

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use numora_types::api::{Claims, CreditUserRequest, UserSearchQuery};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::{AppState, with_db};

pub async fn stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let stats = with_db(&state, |db| db.stats()).await?;
    Ok(Json(stats))
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserSearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let users = with_db(&state, move |db| db.list_profiles(query.q.as_deref())).await?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = with_db(&state, move |db| db.user_detail(&user_id)).await?;
    Ok(Json(detail))
}

pub async fn credit_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreditUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = user_id.clone();
    let entry = with_db(&state, move |db| db.credit_user(&uid, &req)).await?;

    info!("{} credited {} to user {}", claims.username, entry.amount, user_id);
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = user_id.clone();
    with_db(&state, move |db| db.delete_user(&uid)).await?;

    info!("{} deleted user {}", claims.username, user_id);
    Ok(StatusCode::NO_CONTENT)
}

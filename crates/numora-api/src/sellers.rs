use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use numora_types::api::{ApproveCodeRequest, Claims, EditPhoneRequest};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::{AppState, with_db};

pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = with_db(&state, |db| db.list_seller_submissions()).await?;
    Ok(Json(rows))
}

pub async fn approve(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let s = with_db(&state, move |db| db.approve_seller_submission(&id)).await?;
    info!("{} approved seller number {}", claims.username, s.id);
    Ok(Json(s))
}

pub async fn reject(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let s = with_db(&state, move |db| db.reject_seller_submission(&id)).await?;
    info!("{} rejected seller number {}", claims.username, s.id);
    Ok(Json(s))
}

pub async fn grant_code_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let s = with_db(&state, move |db| db.grant_code_entry(&id)).await?;
    info!("{} opened code entry for seller number {}", claims.username, s.id);
    Ok(Json(s))
}

pub async fn approve_code(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<ApproveCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let s = with_db(&state, move |db| db.approve_code(&id, &req)).await?;
    info!(
        "{} approved code for seller number {} ({} credited)",
        claims.username, s.id, s.balance_added
    );
    Ok(Json(s))
}

pub async fn edit_phone(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<EditPhoneRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let s = with_db(&state, move |db| db.edit_phone_number(&id, &req)).await?;
    info!("{} changed phone of seller number {}", claims.username, s.id);
    Ok(Json(s))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let sid = id.clone();
    with_db(&state, move |db| db.delete_seller_submission(&sid)).await?;
    info!("{} deleted seller number {}", claims.username, id);
    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::info;

use numora_types::api::Claims;

use crate::error::ApiError;
use crate::{AppState, with_db};

pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = with_db(&state, |db| db.list_recharge_requests()).await?;
    Ok(Json(rows))
}

pub async fn complete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let r = with_db(&state, move |db| db.complete_recharge(&id)).await?;
    info!("{} completed recharge {}", claims.username, r.id);
    Ok(Json(r))
}

pub async fn reject(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let r = with_db(&state, move |db| db.reject_recharge(&id)).await?;
    info!("{} rejected recharge {}", claims.username, r.id);
    Ok(Json(r))
}

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use numora_types::api::{Claims, CreateOfferRequest, ToggleOfferRequest};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::{AppState, with_db};

pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let offers = with_db(&state, |db| db.list_offers()).await?;
    Ok(Json(offers))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateOfferRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let offer = with_db(&state, move |db| db.create_offer(&req)).await?;
    info!("{} created offer {} ({})", claims.username, offer.id, offer.title);
    Ok((StatusCode::CREATED, Json(offer)))
}

pub async fn set_active(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<ToggleOfferRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let offer = with_db(&state, move |db| db.set_offer_active(&id, req.is_active)).await?;
    info!(
        "{} set offer {} active={}",
        claims.username, offer.id, offer.is_active
    );
    Ok(Json(offer))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let oid = id.clone();
    with_db(&state, move |db| db.delete_offer(&oid)).await?;
    info!("{} deleted offer {}", claims.username, id);
    Ok(StatusCode::NO_CONTENT)
}

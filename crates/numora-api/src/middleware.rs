use axum::{
    Json,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::{error, warn};

use numora_types::api::{Claims, ErrorBody};

use crate::AppState;
use crate::error::ApiError;

/// Why the admin gate turned a request away.
#[derive(Debug)]
pub enum GateError {
    Unauthorized,
    Forbidden,
    Internal,
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "A valid bearer token is required.",
            ),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                "forbidden",
                "The admin role is required.",
            ),
            Self::Internal => return ApiError::internal().into_response(),
        };

        let body = ErrorBody {
            error: kind.to_string(),
            message: message.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Admin gate: a valid bearer JWT whose subject holds the `admin` role.
/// Unauthenticated callers get 401, authenticated non-admins 403.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, GateError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(GateError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(GateError::Unauthorized)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| GateError::Unauthorized)?;

    let claims = token_data.claims;
    let db = state.clone();
    let sub = claims.sub.clone();
    let is_admin = tokio::task::spawn_blocking(move || db.db.is_admin(&sub))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            GateError::Internal
        })?
        .map_err(|e| {
            error!("Role lookup failed: {}", e);
            GateError::Internal
        })?;

    if !is_admin {
        warn!("Non-admin {} ({}) refused", claims.username, claims.sub);
        return Err(GateError::Forbidden);
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

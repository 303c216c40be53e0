use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use numora_types::LedgerError;
use numora_types::api::ErrorBody;

/// Maps the ledger error taxonomy onto HTTP.
#[derive(Debug)]
pub struct ApiError(pub LedgerError);

impl ApiError {
    pub fn internal() -> Self {
        Self(LedgerError::Storage("internal error".into()))
    }

    pub fn status(&self) -> StatusCode {
        match self.0 {
            LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
            LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::InvalidStateTransition(_) => StatusCode::CONFLICT,
            LedgerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Storage details stay in the log
        let message = if status.is_server_error() {
            error!("{}", self.0);
            "The operation failed and was not applied.".to_string()
        } else {
            warn!("Command refused: {}", self.0);
            self.0.to_string()
        };

        let body = ErrorBody {
            error: self.0.kind().to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use eyre::Report;
use tracing::{debug, error};

use crate::config::ConfigError;
use crate::keys::KeyError;
use crate::server::ErrorResponse;
use crate::signing::SigningError;

pub const PUBLIC_KEY_MISSING: &str = "public key missing or not selected";
pub const PRIVATE_KEY_MISSING: &str = "private key not found";
pub const MISSING_DATA: &str = "missing data to sign";

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{}", PUBLIC_KEY_MISSING)]
    PublicKeyMissing,
    #[error("{}", PRIVATE_KEY_MISSING)]
    PrivateKeyMissing,
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Signing(#[from] SigningError),
    #[error(transparent)]
    Unexpected(#[from] Report),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::PublicKeyMissing => StatusCode::NOT_FOUND,
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Every failure becomes `{"status": "ERR", "message": ...}`.
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            debug!(error = %self, %status, "request rejected");
        }
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

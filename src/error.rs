use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::auth::AuthError;
use crate::db::DbError;
use crate::models::ErrorResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("resource not found")]
    NotFound,

    /// A read failed; callers still see a plain not-found.
    #[error("resource not found")]
    Lookup(#[source] DbError),

    #[error("bad request")]
    BadRequest,

    #[error("unprocessable")]
    Invalid(&'static str),

    #[error("unprocessable")]
    Unprocessable(#[source] DbError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound | Self::Lookup(_) => StatusCode::NOT_FOUND,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Invalid(_) | Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Auth(err) => err.status_code(),
        }
    }

    fn log(&self) {
        match self {
            Self::Lookup(err) => tracing::error!(error = %err, "Drink lookup failed"),
            Self::Unprocessable(err) => tracing::error!(error = %err, "Drink mutation failed"),
            Self::Invalid(reason) => tracing::info!(reason, "Rejected drink payload"),
            Self::Auth(err @ (AuthError::KeyFetch(_) | AuthError::KeyDecode(_))) => {
                tracing::error!(error = ?err, "Signing key set unavailable")
            }
            Self::Auth(AuthError::InvalidToken(source)) => {
                tracing::warn!(error = %source, "Token rejected")
            }
            Self::Auth(err) => tracing::warn!(code = err.code(), "Authorization failed"),
            Self::NotFound | Self::BadRequest => {}
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status_code();
        let body = ErrorResponse::new(status.as_u16(), self.to_string());
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

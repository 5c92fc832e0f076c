//! Error taxonomy (spec §7).
//!
//! Only `InputMalformed` and `StateInconsistent` are ever returned as
//! errors — the remaining spec categories (`Infeasible`, `PartialCoverage`,
//! `BoundaryRestConflict`) are recovered locally and surfaced through the
//! `notes` channel on a successful response, never as an `Err`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("invalid date: {0}")]
    InputMalformed(String),
    #[error("state is inconsistent: {0}")]
    StateInconsistent(String),
}

impl SchedulingError {
    fn status(&self) -> StatusCode {
        match self {
            SchedulingError::InputMalformed(_) => StatusCode::BAD_REQUEST,
            SchedulingError::StateInconsistent(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for SchedulingError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<chrono::ParseError> for SchedulingError {
    fn from(err: chrono::ParseError) -> Self {
        SchedulingError::InputMalformed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SchedulingError>;

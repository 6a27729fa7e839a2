use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::shared::AzaError;

#[derive(Debug)]
pub enum UiError {
    BadRequest(String),
    Upstream(StatusCode, String),
    BadGateway(String),
    Internal(String),
}

pub type UiResult<T> = Result<T, UiError>;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl UiError {
    pub fn status(&self) -> StatusCode {
        match self {
            UiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            UiError::Upstream(status, _) => *status,
            UiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            UiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for UiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let error = match self {
            UiError::BadRequest(msg)
            | UiError::Upstream(_, msg)
            | UiError::BadGateway(msg)
            | UiError::Internal(msg) => msg,
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

impl From<AzaError> for UiError {
    fn from(err: AzaError) -> Self {
        let message = err.to_string();
        match err {
            AzaError::Usage(msg) => UiError::BadRequest(msg),
            AzaError::Upstream {
                status: Some(status),
                message,
            } => UiError::Upstream(status, message),
            AzaError::Upstream { status: None, .. }
            | AzaError::Request(_)
            | AzaError::Json(_) => UiError::BadGateway(message),
            AzaError::Io(_) => UiError::Internal(message),
        }
    }
}

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use onair_core::{
    CoreError,
    domain::{
        jobs::DowngradeError,
        license::LicenseError,
        sessions::{ScheduleError, SessionError},
    },
};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "status": self.status.as_u16(),
            }
        }));

        (self.status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(msg) => Self::not_found(msg),
            CoreError::Conflict(msg) => Self::conflict(msg),
            other => {
                tracing::error!(error = %other, "storage operation failed");
                Self::internal("Storage operation failed")
            }
        }
    }
}

impl From<DowngradeError> for AppError {
    fn from(err: DowngradeError) -> Self {
        match err {
            DowngradeError::NoBackupFound(_) | DowngradeError::JobNotFound(_) => {
                Self::not_found(err.to_string())
            }
            DowngradeError::ConcurrentModification { .. } => {
                Self::conflict(err.to_string())
            }
            DowngradeError::Snapshot(_) => {
                tracing::error!(error = %err, "job backup could not be decoded");
                Self::internal("Job backup is corrupt")
            }
            DowngradeError::Storage(inner) => inner.into(),
        }
    }
}

impl From<LicenseError> for AppError {
    fn from(err: LicenseError) -> Self {
        if err.is_rejection() {
            return Self::forbidden(err.to_string());
        }
        match err {
            LicenseError::NoLicenseState => Self::not_found(err.to_string()),
            LicenseError::Cascade(inner) => inner.into(),
            LicenseError::Storage(inner) => inner.into(),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::JobNotFound(_) => Self::not_found(err.to_string()),
            ScheduleError::Storage(inner) => inner.into(),
            other => Self::bad_request(other.to_string()),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::JobNotFound(_) => Self::not_found(err.to_string()),
            SessionError::Storage(inner) => inner.into(),
        }
    }
}

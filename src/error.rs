use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::response::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// SQLSTATE reported by Postgres, when the error came from the database.
    pub fn sqlstate(&self) -> Option<String> {
        let db_err = match self {
            AppError::DbError(err) => err.as_database_error(),
            AppError::OrmError(
                sea_orm::DbErr::Exec(sea_orm::RuntimeErr::SqlxError(err))
                | sea_orm::DbErr::Query(sea_orm::RuntimeErr::SqlxError(err)),
            ) => err.as_database_error(),
            _ => None,
        };
        db_err
            .and_then(|db| db.code())
            .map(|c| c.into_owned())
    }

    /// Turn a database error with SQLSTATE `code` into a 400 carrying `message`.
    /// Every other error is returned unchanged.
    pub fn on_sqlstate(self, code: &str, message: impl Into<String>) -> AppError {
        if self.sqlstate().as_deref() == Some(code) {
            AppError::BadRequest(message.into())
        } else {
            self
        }
    }

    fn log(&self) {
        match self {
            AppError::DbError(err) => {
                tracing::error!(error = %err, code = ?self.sqlstate(), "database error");
            }
            AppError::OrmError(err) => {
                tracing::error!(error = %err, code = ?self.sqlstate(), "database error");
            }
            AppError::Internal(err) => tracing::error!(error = ?err, "internal error"),
            _ => {}
        }
    }
}

pub const UNIQUE_VIOLATION: &str = "23505";
pub const NUMERIC_OUT_OF_RANGE: &str = "22003";

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status();
        let message = self.to_string();
        let body = ApiResponse::failure(
            message.clone(),
            ErrorData { error: message },
        );

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

use std::io;

use axum::{
    Json,
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::QueryRejection;
use serde::Serialize;

pub type Result<T> = core::result::Result<T, Error>;

/// 面向调用方的业务错误，直接映射为 4xx 响应
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(&'static str),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("missing config: {0}")]
    Config(&'static str),

    /// 远端接口返回了非 2xx 状态
    #[error("remote returned {status}: {message}")]
    Remote { status: u16, message: String },
}

/// 与前端约定的错误响应体
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    status_code: u16,
    message: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    let body = ErrorBody {
        status_code: status.as_u16(),
        message: message.into(),
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        match self {
            Error::Api(e) => error_response(e.status(), e.to_string()),
            Error::Jwt(e) => {
                tracing::warn!(%e, "invalid token");
                error_response(StatusCode::UNAUTHORIZED, "登录已失效")
            }
            Error::Json(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
            Error::Reqwest(_) | Error::Remote { .. } => {
                error_response(StatusCode::BAD_GATEWAY, "Bad Gateway")
            }
            Error::Sqlx(e) => {
                tracing::error!(%e, "sqlx error");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
            Error::Io(e) => {
                tracing::error!(%e, "file io error");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
            e @ (Error::Bcrypt(_) | Error::Toml(_) | Error::Config(_)) => {
                tracing::error!(%e, "internal error");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }
}

// 提取器的拒绝统一转为 400，响应体与其他错误一致

impl From<JsonRejection> for Error {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadRequest(e.body_text()).into()
    }
}

impl From<PathRejection> for Error {
    fn from(e: PathRejection) -> Self {
        ApiError::BadRequest(e.body_text()).into()
    }
}

impl From<QueryRejection> for Error {
    fn from(e: QueryRejection) -> Self {
        ApiError::BadRequest(e.body_text()).into()
    }
}

impl From<MultipartRejection> for Error {
    fn from(e: MultipartRejection) -> Self {
        ApiError::BadRequest(e.body_text()).into()
    }
}

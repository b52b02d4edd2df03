use axum::extract::{FromRequest, FromRequestParts};

use crate::error::Error;

/// JSON 请求体，解析失败时返回 `{statusCode, message}` 格式的 400
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct JsonBody<T>(pub T);

/// 路径参数
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct PathParam<T>(pub T);

/// 查询参数
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum_extra::extract::Query), rejection(Error))]
pub struct QueryParams<T>(pub T);

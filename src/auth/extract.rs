use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use super::JwtKeys;
use crate::error::{ApiError, Error, Result};

/// 已登录用户，从 `Authorization: Bearer <token>` 中解析
///
/// 缺少或无效的令牌会以 401 拒绝请求。
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i32,
    pub username: String,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl<S> FromRequestParts<S> for AuthUser
where
    JwtKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthorized("请先登录"))?;
        let claims = JwtKeys::from_ref(state).verify(token)?;
        let id = claims
            .user_id()
            .ok_or(ApiError::Unauthorized("登录已失效"))?;

        Ok(AuthUser {
            id,
            username: claims.username,
        })
    }
}

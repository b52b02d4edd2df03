use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{JsonBody, Message};
use crate::{
    auth::{JwtKeys, hash_password, verify_password},
    content::Credentials,
    error::{ApiError, Result},
    state::AppState,
    storage::{DBPool, UserStore},
};

/// 配置认证路由。
///
/// - `POST /auth/register`：注册
/// - `POST /auth/login`：登录，返回访问令牌
/// - `POST /auth/logout`：登出，令牌无状态，仅作提示
pub fn setup_route() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterView {
    pub msg: String,
    pub user_id: i32,
}

/// 登录用户的公开信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub id: i32,
    pub username: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginView {
    pub access_token: String,
    pub user: UserView,
}

fn random_nickname() -> String {
    format!("用户_{}", rand::thread_rng().gen_range(0..1000))
}

async fn register(
    State(pool): State<DBPool>,
    JsonBody(creds): JsonBody<Credentials>,
) -> Result<(StatusCode, Json<RegisterView>)> {
    creds.validate()?;

    if pool.find_by_username(&creds.username).await?.is_some() {
        return Err(ApiError::Conflict("用户名已存在").into());
    }

    let hashed = hash_password(creds.password).await?;
    let user = pool
        .create_user(&creds.username, &hashed, &random_nickname())
        .await?
        .ok_or(ApiError::Conflict("用户名已存在"))?;

    tracing::info!(id = user.id, username = %user.username, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterView {
            msg: "注册成功".to_string(),
            user_id: user.id,
        }),
    ))
}

async fn login(
    State(pool): State<DBPool>,
    State(keys): State<JwtKeys>,
    JsonBody(creds): JsonBody<Credentials>,
) -> Result<Json<LoginView>> {
    const BAD_CREDENTIALS: ApiError = ApiError::Unauthorized("用户名或密码错误");

    let user = pool
        .find_by_username(&creds.username)
        .await?
        .ok_or(BAD_CREDENTIALS)?;

    if !verify_password(creds.password, user.password).await? {
        return Err(BAD_CREDENTIALS.into());
    }

    let access_token = keys.issue(user.id, &user.username)?;
    tracing::info!(id = user.id, "user logged in");

    Ok(Json(LoginView {
        access_token,
        user: UserView {
            id: user.id,
            username: user.username,
            avatar: user.avatar,
        },
    }))
}

async fn logout() -> Json<Message> {
    Json(Message { msg: "登出成功" })
}

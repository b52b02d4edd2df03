use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};

use super::{JsonBody, Message, iso8601};
use crate::{
    auth::AuthUser,
    content::DraftInput,
    error::{ApiError, Result},
    state::AppState,
    storage::{DBPool, DraftRow, DraftStore},
};

/// 配置草稿路由，全部需要登录。
///
/// - `GET /draft`：当前用户的草稿，没有则 404
/// - `POST /draft`：保存（插入或覆盖）
/// - `DELETE /draft`：删除，草稿不存在也返回成功
pub fn setup_route() -> Router<AppState> {
    Router::new().route("/draft", get(fetch).post(save).delete(remove))
}

/// 返回给前端的草稿
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftView {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub updated_at: String,
}

impl From<DraftRow> for DraftView {
    fn from(row: DraftRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            updated_at: iso8601(&row.updated_at),
        }
    }
}

async fn fetch(user: AuthUser, State(pool): State<DBPool>) -> Result<Json<DraftView>> {
    let draft = pool
        .get_draft(user.id)
        .await?
        .ok_or(ApiError::NotFound("暂无草稿"))?;
    Ok(Json(draft.into()))
}

async fn save(
    user: AuthUser,
    State(pool): State<DBPool>,
    JsonBody(input): JsonBody<DraftInput>,
) -> Result<Json<DraftView>> {
    input.validate()?;

    let draft = pool.save_draft(user.id, &input.title, &input.content).await?;
    tracing::debug!(user = user.id, "draft saved");

    Ok(Json(draft.into()))
}

async fn remove(user: AuthUser, State(pool): State<DBPool>) -> Result<Json<Message>> {
    let deleted = pool.delete_draft(user.id).await?;
    tracing::debug!(user = user.id, deleted, "draft removed");

    Ok(Json(Message { msg: "草稿已删除" }))
}

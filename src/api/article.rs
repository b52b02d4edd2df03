use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::{JsonBody, Message, PathParam, QueryParams, iso8601};
use crate::{
    auth::AuthUser,
    content::{ArticleInput, ArticlePatch},
    error::{ApiError, Result},
    state::AppState,
    storage::{ArticleRow, ArticleStore, DBPool, TagRow},
};

/// 每页最多返回的文章数
const MAX_PAGE_SIZE: i64 = 50;

/// 配置文章相关路由。
///
/// - `GET /articles`：分页列表（公开）
/// - `POST /articles`：发布（需登录）
/// - `GET /articles/{id}`：详情，浏览量加一（公开）
/// - `PUT /articles/{id}`、`DELETE /articles/{id}`：作者编辑、删除
/// - `POST /articles/{id}/like`：点赞（公开）
pub fn setup_route() -> Router<AppState> {
    Router::new()
        .route("/articles", get(list).post(publish))
        .route("/articles/{id}", get(detail).put(update).delete(remove))
        .route("/articles/{id}/like", post(like))
}

/// 文章作者
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthorView {
    pub id: i32,
    pub username: String,
    pub avatar: Option<String>,
}

/// 文章标签
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagView {
    pub id: i32,
    pub name: String,
}

/// 返回给前端的文章
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleView {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub author_id: i32,
    pub author: AuthorView,
    pub likes: i32,
    pub views: i32,
    pub created_at: String,
    pub updated_at: String,
    pub tags: Vec<TagView>,
}

impl From<ArticleRow> for ArticleView {
    fn from(row: ArticleRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            author_id: row.author_id,
            author: AuthorView {
                id: row.author_id,
                username: row.author_username,
                avatar: row.author_avatar,
            },
            likes: row.likes,
            views: row.views,
            created_at: iso8601(&row.created_at),
            updated_at: iso8601(&row.updated_at),
            tags: row
                .tags
                .0
                .into_iter()
                .map(|TagRow { id, name }| TagView { id, name })
                .collect(),
        }
    }
}

/// 分页列表
#[derive(Debug, Serialize, Deserialize)]
pub struct ArticleList {
    pub articles: Vec<ArticleView>,
    pub total: i64,
}

/// 点赞后的点赞数
#[derive(Debug, Serialize, Deserialize)]
pub struct Likes {
    pub likes: i32,
}

/// 查询参数，用于文章列表分页。
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ListParams {
    pub page: i64,
    pub limit: i64,
}

impl Default for ListParams {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

impl ListParams {
    /// 页码至少为 1，每页数量限制在 1~50
    fn normalized(self) -> (i64, i64) {
        (self.page.max(1), self.limit.clamp(1, MAX_PAGE_SIZE))
    }
}

async fn fetch_view(pool: &DBPool, id: i32) -> Result<ArticleView> {
    let row = pool
        .get_article(id)
        .await?
        .ok_or(ApiError::NotFound("文章不存在"))?;
    Ok(row.into())
}

/// 发布文章，话题标签从正文中提取
async fn publish(
    user: AuthUser,
    State(pool): State<DBPool>,
    JsonBody(input): JsonBody<ArticleInput>,
) -> Result<(StatusCode, Json<ArticleView>)> {
    input.validate()?;

    let id = pool
        .create_article(user.id, &input.title, &input.content)
        .await?;
    tracing::info!(id, author = user.id, "article published");

    Ok((StatusCode::CREATED, Json(fetch_view(&pool, id).await?)))
}

/// 获取文章列表，按发布时间倒序
async fn list(
    QueryParams(params): QueryParams<ListParams>,
    State(pool): State<DBPool>,
) -> Result<Json<ArticleList>> {
    let (page, limit) = params.normalized();

    let (rows, total) = tokio::try_join!(pool.list_articles(page, limit), pool.count_articles())?;

    Ok(Json(ArticleList {
        articles: rows.into_iter().map(Into::into).collect(),
        total,
    }))
}

/// 获取单篇文章，每次访问浏览量加一
async fn detail(PathParam(id): PathParam<i32>, State(pool): State<DBPool>) -> Result<Json<ArticleView>> {
    if !pool.increment_views(id).await? {
        return Err(ApiError::NotFound("文章不存在").into());
    }
    fetch_view(&pool, id).await.map(Json)
}

/// 点赞，不做去重
async fn like(PathParam(id): PathParam<i32>, State(pool): State<DBPool>) -> Result<Json<Likes>> {
    let likes = pool
        .like_article(id)
        .await?
        .ok_or(ApiError::NotFound("文章不存在"))?;
    Ok(Json(Likes { likes }))
}

/// 作者编辑文章，标签按新正文整体替换
async fn update(
    PathParam(id): PathParam<i32>,
    user: AuthUser,
    State(pool): State<DBPool>,
    JsonBody(patch): JsonBody<ArticlePatch>,
) -> Result<Json<ArticleView>> {
    patch.validate()?;
    pool.update_article(id, user.id, &patch).await?;
    tracing::info!(id, author = user.id, "article updated");

    fetch_view(&pool, id).await.map(Json)
}

/// 作者删除文章
async fn remove(
    PathParam(id): PathParam<i32>,
    user: AuthUser,
    State(pool): State<DBPool>,
) -> Result<Json<Message>> {
    pool.delete_article(id, user.id).await?;
    tracing::info!(id, author = user.id, "article deleted");

    Ok(Json(Message { msg: "文章已删除" }))
}

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::types::Json;

/// 用户记录
#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: i32,
    pub username: String,
    /// bcrypt 哈希
    pub password: String,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 标签
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, sqlx::FromRow)]
pub struct TagRow {
    pub id: i32,
    pub name: String,
}

/// 文章详情
///
/// 附带作者信息和聚合后的标签列表，参见 [`TagRow`]。
#[derive(Debug, sqlx::FromRow)]
pub struct ArticleRow {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub author_id: i32,
    pub author_username: String,
    pub author_avatar: Option<String>,
    pub likes: i32,
    pub views: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tags: Json<Vec<TagRow>>,
}

/// 每个用户唯一的云端草稿
#[derive(Debug, sqlx::FromRow)]
pub struct DraftRow {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

use super::{DBPool, UserRow};

/// 用户表的读写接口
pub trait UserStore: Send + Sync {
    /// 按用户名查询
    fn find_by_username(
        &self,
        username: &str,
    ) -> impl std::future::Future<Output = Result<Option<UserRow>, sqlx::Error>> + Send;

    /// 创建用户
    ///
    /// 用户名已存在时返回 `None`。
    fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        nickname: &str,
    ) -> impl std::future::Future<Output = Result<Option<UserRow>, sqlx::Error>> + Send;
}

impl UserStore for DBPool {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRow>, sqlx::Error> {
        sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, password, nickname, avatar, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(self)
        .await
    }

    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        nickname: &str,
    ) -> Result<Option<UserRow>, sqlx::Error> {
        sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, password, nickname)
            VALUES ($1, $2, $3)
            ON CONFLICT (username) DO NOTHING
            RETURNING id, username, password, nickname, avatar, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(nickname)
        .fetch_optional(self)
        .await
    }
}

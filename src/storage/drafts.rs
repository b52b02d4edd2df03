use super::{DBPool, DraftRow};

/// 云端草稿的读写接口，每个用户最多一条
pub trait DraftStore: Send + Sync {
    fn get_draft(
        &self,
        user_id: i32,
    ) -> impl std::future::Future<Output = Result<Option<DraftRow>, sqlx::Error>> + Send;

    /// 插入或覆盖当前用户的草稿，并刷新 `updated_at`
    fn save_draft(
        &self,
        user_id: i32,
        title: &str,
        content: &str,
    ) -> impl std::future::Future<Output = Result<DraftRow, sqlx::Error>> + Send;

    /// 删除草稿，返回是否真的删除了记录
    fn delete_draft(
        &self,
        user_id: i32,
    ) -> impl std::future::Future<Output = Result<bool, sqlx::Error>> + Send;
}

impl DraftStore for DBPool {
    async fn get_draft(&self, user_id: i32) -> Result<Option<DraftRow>, sqlx::Error> {
        sqlx::query_as::<_, DraftRow>(
            r#"
            SELECT id, user_id, title, content, updated_at
            FROM drafts
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(self)
        .await
    }

    async fn save_draft(
        &self,
        user_id: i32,
        title: &str,
        content: &str,
    ) -> Result<DraftRow, sqlx::Error> {
        sqlx::query_as::<_, DraftRow>(
            r#"
            INSERT INTO drafts (user_id, title, content, updated_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (user_id)
            DO UPDATE SET
                title = EXCLUDED.title,
                content = EXCLUDED.content,
                updated_at = EXCLUDED.updated_at
            RETURNING id, user_id, title, content, updated_at
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(content)
        .fetch_one(self)
        .await
    }

    async fn delete_draft(&self, user_id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM drafts WHERE user_id = $1")
            .bind(user_id)
            .execute(self)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

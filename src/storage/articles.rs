use sqlx::PgTransaction;

use super::{ArticleRow, DBPool};
use crate::{
    content::{ArticlePatch, extract_hashtags},
    error::{ApiError, Result},
};

/// 文章查询的公共部分，附带作者信息和聚合后的标签
const ARTICLE_SELECT: &str = r#"
    SELECT a.id, a.title, a.content, a.author_id,
           u.username AS author_username, u.avatar AS author_avatar,
           a.likes, a.views, a.created_at, a.updated_at,
           COALESCE(
               (SELECT jsonb_agg(jsonb_build_object('id', t.id, 'name', t.name) ORDER BY t.name)
                FROM article_tags atg
                INNER JOIN tags t ON t.id = atg.tag_id
                WHERE atg.article_id = a.id),
               '[]'::jsonb
           ) AS tags
    FROM articles a
    INNER JOIN users u ON u.id = a.author_id
"#;

/// 文章及其标签的读写接口
///
/// 发布和编辑时会从正文中重新提取话题标签，并在同一事务中整体替换文章的标签关联。
pub trait ArticleStore: Send + Sync {
    /// 发布文章，返回新文章的 id
    fn create_article(
        &self,
        author_id: i32,
        title: &str,
        content: &str,
    ) -> impl std::future::Future<Output = Result<i32>> + Send;

    /// 查询单篇文章
    fn get_article(
        &self,
        id: i32,
    ) -> impl std::future::Future<Output = Result<Option<ArticleRow>>> + Send;

    /// 按发布时间倒序分页查询
    fn list_articles(
        &self,
        page: i64,
        limit: i64,
    ) -> impl std::future::Future<Output = Result<Vec<ArticleRow>>> + Send;

    /// 文章总数
    fn count_articles(&self) -> impl std::future::Future<Output = Result<i64>> + Send;

    /// 作者编辑文章
    ///
    /// 文章不存在返回 [`ApiError::NotFound`]，非作者返回 [`ApiError::Forbidden`]。
    fn update_article(
        &self,
        id: i32,
        author_id: i32,
        patch: &ArticlePatch,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// 作者删除文章，错误语义同 [`ArticleStore::update_article`]
    fn delete_article(
        &self,
        id: i32,
        author_id: i32,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// 浏览量加一，返回文章是否存在
    fn increment_views(&self, id: i32) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// 点赞数加一，返回加一后的点赞数
    fn like_article(
        &self,
        id: i32,
    ) -> impl std::future::Future<Output = Result<Option<i32>>> + Send;
}

impl ArticleStore for DBPool {
    async fn create_article(&self, author_id: i32, title: &str, content: &str) -> Result<i32> {
        let tags = extract_hashtags(content);
        let mut tx = self.begin().await?;

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO articles (title, content, author_id)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(title)
        .bind(content)
        .bind(author_id)
        .fetch_one(tx.as_mut())
        .await?;

        replace_tags(&mut tx, id, &tags).await?;
        tx.commit().await?;

        tracing::debug!(id, ?tags, "article created");
        Ok(id)
    }

    async fn get_article(&self, id: i32) -> Result<Option<ArticleRow>> {
        let sql = format!("{ARTICLE_SELECT} WHERE a.id = $1");
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(id)
            .fetch_optional(self)
            .await?;
        Ok(row)
    }

    async fn list_articles(&self, page: i64, limit: i64) -> Result<Vec<ArticleRow>> {
        let offset = page_offset(page, limit);
        let sql = format!("{ARTICLE_SELECT} ORDER BY a.created_at DESC, a.id DESC LIMIT $1 OFFSET $2");
        let rows = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(self)
            .await?;
        Ok(rows)
    }

    async fn count_articles(&self) -> Result<i64> {
        let total = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(self)
            .await?;
        Ok(total)
    }

    async fn update_article(&self, id: i32, author_id: i32, patch: &ArticlePatch) -> Result<()> {
        let mut tx = self.begin().await?;

        let (owner, old_content): (i32, String) =
            sqlx::query_as("SELECT author_id, content FROM articles WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(tx.as_mut())
                .await?
                .ok_or(ApiError::NotFound("文章不存在"))?;

        if owner != author_id {
            return Err(ApiError::Forbidden("只能编辑自己的文章").into());
        }

        let content = patch.content.as_deref().unwrap_or(&old_content);
        let tags = extract_hashtags(content);

        sqlx::query(
            r#"
            UPDATE articles
            SET title = COALESCE($2, title),
                content = $3,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(patch.title.as_deref())
        .bind(content)
        .execute(tx.as_mut())
        .await?;

        replace_tags(&mut tx, id, &tags).await?;
        tx.commit().await?;

        tracing::debug!(id, ?tags, "article updated");
        Ok(())
    }

    async fn delete_article(&self, id: i32, author_id: i32) -> Result<()> {
        let mut tx = self.begin().await?;

        let owner: i32 = sqlx::query_scalar("SELECT author_id FROM articles WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(tx.as_mut())
            .await?
            .ok_or(ApiError::NotFound("文章不存在"))?;

        if owner != author_id {
            return Err(ApiError::Forbidden("只能删除自己的文章").into());
        }

        sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(tx.as_mut())
            .await?;

        Ok(tx.commit().await?)
    }

    async fn increment_views(&self, id: i32) -> Result<bool> {
        let result = sqlx::query("UPDATE articles SET views = views + 1 WHERE id = $1")
            .bind(id)
            .execute(self)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn like_article(&self, id: i32) -> Result<Option<i32>> {
        let likes = sqlx::query_scalar(
            "UPDATE articles SET likes = likes + 1 WHERE id = $1 RETURNING likes",
        )
        .bind(id)
        .fetch_optional(self)
        .await?;
        Ok(likes)
    }
}

/// 分页偏移量，页码过大时饱和到 `i64::MAX`，查询结果为空
fn page_offset(page: i64, limit: i64) -> i64 {
    (page.max(1) - 1).saturating_mul(limit.max(0))
}

/// 整体替换文章的标签关联
///
/// 先删除旧关联，再按名称补建缺失的标签并重新关联。标签本身不会被删除。
async fn replace_tags(
    tx: &mut PgTransaction<'_>,
    article_id: i32,
    names: &[String],
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM article_tags WHERE article_id = $1")
        .bind(article_id)
        .execute(tx.as_mut())
        .await?;

    if names.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO tags (name)
        SELECT UNNEST($1::text[])
        ON CONFLICT (name) DO NOTHING
        "#,
    )
    .bind(names)
    .execute(tx.as_mut())
    .await?;

    sqlx::query(
        r#"
        INSERT INTO article_tags (article_id, tag_id)
        SELECT $1, id FROM tags WHERE name = ANY($2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(article_id)
    .bind(names)
    .execute(tx.as_mut())
    .await?;

    Ok(())
}

use std::{path::Path, time::Duration};

use sqlx::postgres::PgPoolOptions;

use crate::{config::Config, error::Result};

/// 数据库连接池类型
pub type DBPool = sqlx::PgPool;

/// 根据 [`Config`] 初始化数据库连接池
pub async fn init_db(config: &Config) -> Result<DBPool> {
    let pool = new_db_pool(config.database_url()?).await?;
    tracing::info!("database pool ready");
    Ok(pool)
}

/// 根据连接 URL 创建新的数据库连接池
///
/// 连接池配置：
///
/// - 最大空闲时间 60 秒
/// - 最大生存时间 1500 秒（约 25 分钟）
/// - 最大连接数 10
/// - 获取连接超时 2 秒
/// - 获取前测试连接
/// - 最小连接数 2
pub async fn new_db_pool(conn_url: &str) -> std::result::Result<DBPool, sqlx::Error> {
    PgPoolOptions::new()
        .idle_timeout(Duration::from_secs(60))
        .max_lifetime(Duration::from_secs(1500))
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(2))
        .test_before_acquire(true)
        .min_connections(2)
        .connect(conn_url)
        .await
}

/// 执行 SQL 文件中的迁移语句
///
/// 将文件内容按 `;` 分割，每条 SQL 单独执行
pub async fn migrate(db: &DBPool, file: impl AsRef<Path>) -> Result<()> {
    let content = tokio::fs::read_to_string(file.as_ref()).await?;

    for sql in content.split(';') {
        if sql.trim().is_empty() {
            continue;
        }
        sqlx::query(sql).execute(db).await?;
    }

    tracing::info!(file = %file.as_ref().display(), "schema applied");
    Ok(())
}

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod content;
pub mod error;
pub mod state;
pub mod storage;

use tracing_subscriber::{EnvFilter, fmt::time::ChronoLocal};

use auth::JwtKeys;
use config::Config;
use state::{AppState, UploadDir};

/// 初始化日志，过滤规则取自环境变量 `INKFEED_LOG`
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
        .with_env_filter(EnvFilter::from_env("INKFEED_LOG"))
        .init();
}

/// 加载配置、连接数据库并启动 HTTP 服务
pub async fn run() -> error::Result<()> {
    init_tracing();

    let config = Config::load()?;
    let pool = storage::init_db(&config).await?;
    if let Some(schema) = &config.schema_file {
        storage::migrate(&pool, schema).await?;
    }

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let app = AppState::new(
        pool,
        JwtKeys::new(config.jwt_secret()?),
        UploadDir::new(&config.upload_dir),
    );

    api::run_server(app, &config.bind).await
}

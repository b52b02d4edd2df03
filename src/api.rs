mod article;
mod auth;
mod draft;
mod extract;
mod upload;

use axum::Router;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::instrument;

use crate::{error::Result, state::AppState};

pub use self::{
    article::{ArticleList, ArticleView, AuthorView, Likes, ListParams, TagView},
    auth::{LoginView, RegisterView, UserView},
    draft::DraftView,
    extract::{JsonBody, PathParam, QueryParams},
    upload::{MAX_IMAGE_BYTES, UploadView},
};

/// 只包含提示信息的响应
#[derive(Debug, Serialize)]
pub struct Message {
    pub msg: &'static str,
}

/// 时间统一输出为毫秒精度的 ISO-8601 UTC 字符串
pub(crate) fn iso8601(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 设置应用的路由。
///
/// 组合认证、文章、草稿和上传接口，`/uploads` 下提供已上传图片的静态访问。
pub fn setup_route(app: AppState) -> Router {
    let uploads = ServeDir::new(app.uploads().path());

    Router::new()
        .merge(auth::setup_route())
        .merge(article::setup_route())
        .merge(draft::setup_route())
        .merge(upload::setup_route())
        .nest_service("/uploads", uploads)
        .with_state(app)
}

/// 启动 HTTP 服务，并使用给定的路由处理请求。
#[instrument(name = "http server", skip(router))]
pub async fn run_server_with_router(router: Router, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;

    tracing::info!("listening on {}", bind);

    axum::serve(listener, router).await?;
    Ok(())
}

/// 启动 HTTP 服务，自动设置路由和中间件。
///
/// 1. 生成路由
/// 2. 添加跨域、日志和追踪中间件
/// 3. 启动服务器
pub async fn run_server(app: AppState, bind: &str) -> Result<()> {
    let router = setup_route(app);
    let router = add_middlewares(router);
    run_server_with_router(router, bind).await
}

/// 为路由添加中间件，包括跨域、请求追踪和失败日志记录。
///
/// 日志记录会在请求失败时输出错误信息。
fn add_middlewares(router: Router) -> Router {
    fn log_failure(
        err: tower_http::classify::ServerErrorsFailureClass,
        _latency: std::time::Duration,
        _span: &tracing::Span,
    ) {
        tracing::error!(error = %err, "request failed");
    }

    router.layer(CorsLayer::permissive()).layer(
        TraceLayer::new_for_http()
            .on_failure(log_failure)
            .on_request(|_req: &_, _span: &tracing::Span| {
                // 关闭请求日志
            }),
    )
}

use std::path::Path;

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State, multipart::MultipartError,
        multipart::MultipartRejection,
    },
    http::StatusCode,
    routing::post,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{ApiError, Error, Result},
    state::{AppState, UploadDir},
};

/// 单张图片大小上限 5MB
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// 配置上传路由。
///
/// `POST /upload/image`：需登录，表单字段 `file`
pub fn setup_route() -> Router<AppState> {
    Router::new()
        .route("/upload/image", post(upload_image))
        // 为 multipart 边界等额外开销预留空间
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadView {
    pub url: String,
    pub filename: String,
}

fn bad_request(msg: &str) -> Error {
    ApiError::BadRequest(msg.to_string()).into()
}

fn multipart_error(e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return bad_request("图片大小不能超过 5MB");
    }
    ApiError::BadRequest(e.body_text()).into()
}

/// 校验图片类型
fn check_mime(mime: &str) -> Result<()> {
    if ALLOWED_MIME_TYPES.contains(&mime) {
        Ok(())
    } else {
        Err(bad_request(
            "不支持的图片格式，请上传 JPG、PNG、GIF 或 WebP 格式",
        ))
    }
}

/// 取原文件名的扩展名，只保留 ASCII 字母数字
fn extension(original: &str) -> String {
    Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

async fn upload_image(
    user: AuthUser,
    State(dir): State<UploadDir>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadView>)> {
    let mut multipart = multipart?;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        check_mime(field.content_type().unwrap_or_default())?;
        let ext = extension(field.file_name().unwrap_or_default());

        let data = field.bytes().await.map_err(multipart_error)?;
        if data.len() > MAX_IMAGE_BYTES {
            return Err(bad_request("图片大小不能超过 5MB"));
        }

        let filename = format!("{}{}", Uuid::new_v4(), ext);
        tokio::fs::create_dir_all(dir.path()).await?;
        tokio::fs::write(dir.join(&filename), &data).await?;

        tracing::info!(user = user.id, %filename, size = data.len(), "image uploaded");

        return Ok((
            StatusCode::CREATED,
            Json(UploadView {
                url: format!("/uploads/{filename}"),
                filename,
            }),
        ));
    }

    Err(bad_request("请选择要上传的图片"))
}

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use axum::extract::FromRef;

use crate::{auth::JwtKeys, storage::DBPool};

/// 图片上传目录
#[derive(Clone, Debug)]
pub struct UploadDir(Arc<Path>);

impl UploadDir {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self(Arc::from(path.as_ref()))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// 目录下某个文件的完整路径
    pub fn join(&self, filename: &str) -> PathBuf {
        self.0.join(filename)
    }
}

/// 应用程序上下文
///
/// [`AppState`] 封装了数据库连接池、JWT 密钥和上传目录，由各个 handler 按需提取。
#[derive(Clone, FromRef)]
pub struct AppState {
    pool: DBPool,
    keys: JwtKeys,
    uploads: UploadDir,
}

impl AppState {
    /// 创建一个新的 [`AppState`] 实例
    pub fn new(pool: DBPool, keys: JwtKeys, uploads: UploadDir) -> Self {
        Self {
            pool,
            keys,
            uploads,
        }
    }

    /// 获取数据库连接池
    pub fn pool(&self) -> &DBPool {
        &self.pool
    }

    /// 获取 JWT 密钥
    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    /// 获取上传目录
    pub fn uploads(&self) -> &UploadDir {
        &self.uploads
    }
}

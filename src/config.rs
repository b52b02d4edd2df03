use std::{
    env,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::{Error, Result};

/// 服务端配置
///
/// 先读取 `INKFEED_CONFIG` 指向的 TOML 文件（可选），再用环境变量覆盖。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Postgres 连接串，对应 `DATABASE_URL`
    pub database_url: Option<String>,
    /// JWT 签名密钥，对应 `JWT_SECRET`
    pub jwt_secret: Option<String>,
    /// 监听地址，对应 `INKFEED_BIND`
    pub bind: String,
    /// 图片上传目录，对应 `UPLOAD_DIR`
    pub upload_dir: PathBuf,
    /// 启动时执行的建表 SQL 文件，对应 `INKFEED_SCHEMA`
    pub schema_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            jwt_secret: None,
            bind: "0.0.0.0:9080".to_string(),
            upload_dir: PathBuf::from("uploads"),
            schema_file: None,
        }
    }
}

impl Config {
    /// 从 `INKFEED_CONFIG` 文件和环境变量加载配置
    pub fn load() -> Result<Self> {
        let mut config = match env::var("INKFEED_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Into::into)
    }

    /// 使用给定的变量来源覆盖配置项
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("DATABASE_URL") {
            self.database_url = Some(v);
        }
        if let Some(v) = var("JWT_SECRET") {
            self.jwt_secret = Some(v);
        }
        if let Some(v) = var("INKFEED_BIND") {
            self.bind = v;
        }
        if let Some(v) = var("UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(v);
        }
        if let Some(v) = var("INKFEED_SCHEMA") {
            self.schema_file = Some(PathBuf::from(v));
        }
    }

    pub fn database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .ok_or(Error::Config("DATABASE_URL"))
    }

    pub fn jwt_secret(&self) -> Result<&str> {
        self.jwt_secret.as_deref().ok_or(Error::Config("JWT_SECRET"))
    }
}

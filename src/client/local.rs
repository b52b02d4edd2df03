use std::{
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{api::UserView, error::Result};

/// 本地草稿的存储键
pub const DRAFT_KEY: &str = "article_draft";
/// 访问令牌的存储键
pub const TOKEN_KEY: &str = "access_token";
/// 用户信息的存储键
pub const USER_KEY: &str = "user";

/// 设备本地的草稿
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalDraft {
    pub title: String,
    pub content: String,
    pub updated_at: DateTime<Utc>,
    /// 是否有尚未推送到云端的修改
    pub needs_sync: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<DateTime<Utc>>,
}

impl LocalDraft {
    /// 标题和内容都为空白
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.content.trim().is_empty()
    }
}

/// 以目录模拟的本地键值存储，每个键对应一个 JSON 文件
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: Arc<Path>,
}

impl LocalStore {
    /// 打开（必要时创建）存储目录
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        std::fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: Arc::from(dir.as_ref()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// 读取键值，不存在或内容损坏时返回 `None`
    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let bytes = match std::fs::read(self.path(key)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key, %e, "discarding corrupted local entry");
                Ok(None)
            }
        }
    }

    /// 先写同目录下唯一命名的临时文件再重命名，避免写到一半的文件
    ///
    /// 并发写同一个键时后完成者覆盖先完成者。
    fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&serde_json::to_vec(value)?)?;
        tmp.persist(self.path(key)).map_err(|e| e.error)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    pub fn draft(&self) -> Result<Option<LocalDraft>> {
        self.read(DRAFT_KEY)
    }

    pub fn set_draft(&self, draft: &LocalDraft) -> Result<()> {
        self.write(DRAFT_KEY, draft)
    }

    pub fn remove_draft(&self) -> Result<()> {
        self.remove(DRAFT_KEY)
    }

    /// 将本地草稿标记为已同步
    ///
    /// 仅当本地草稿的 `updated_at` 仍等于 `pushed` 时清除 `needs_sync`，推送期间又发生的编辑保持未同步。
    /// 两种情况都会记录云端时间 `synced_at`。
    pub fn mark_synced(&self, pushed: DateTime<Utc>, synced_at: DateTime<Utc>) -> Result<bool> {
        let Some(mut draft) = self.draft()? else {
            return Ok(false);
        };

        let unchanged = draft.updated_at == pushed;
        if unchanged {
            draft.needs_sync = false;
        }
        draft.synced_at = Some(synced_at);
        self.set_draft(&draft)?;
        Ok(unchanged)
    }

    pub fn token(&self) -> Result<Option<String>> {
        self.read(TOKEN_KEY)
    }

    pub fn set_token(&self, token: &str) -> Result<()> {
        self.write(TOKEN_KEY, &token)
    }

    pub fn user(&self) -> Result<Option<UserView>> {
        self.read(USER_KEY)
    }

    pub fn set_user(&self, user: &UserView) -> Result<()> {
        self.write(USER_KEY, user)
    }

    /// 清除令牌和用户信息
    pub fn clear_session(&self) -> Result<()> {
        self.remove(TOKEN_KEY)?;
        self.remove(USER_KEY)
    }
}

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

use super::{LocalDraft, LocalStore};
use crate::error::Result;

/// 自动同步的间隔
pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);

/// 云端草稿
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDraft {
    pub title: String,
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

/// 云端草稿接口
pub trait RemoteDrafts: Send + Sync {
    /// 是否持有登录凭证
    fn is_authenticated(&self) -> bool;

    /// 获取云端草稿，没有则返回 `None`
    fn fetch(&self) -> impl std::future::Future<Output = Result<Option<RemoteDraft>>> + Send;

    /// 覆盖保存云端草稿
    fn save(
        &self,
        title: &str,
        content: &str,
    ) -> impl std::future::Future<Output = Result<RemoteDraft>> + Send;

    /// 删除云端草稿
    fn delete(&self) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 编辑器应展示的内容来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftSource {
    Local,
    Remote,
}

/// 编辑器应展示的内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorContent {
    pub title: String,
    pub content: String,
    pub source: DraftSource,
}

impl EditorContent {
    fn from_local(draft: &LocalDraft) -> Self {
        Self {
            title: draft.title.clone(),
            content: draft.content.clone(),
            source: DraftSource::Local,
        }
    }
}

/// 截断到毫秒的当前时间，与服务端返回的精度一致
fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// 同步进行中的标记，离开作用域时自动清除
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        (!flag.swap(true, Ordering::AcqRel)).then_some(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// 单条草稿的本地与云端同步
///
/// 以更新时间做“后写者胜”的合并：云端更新时覆盖本地，本地有未同步修改时推送到云端。
/// 云端的任何失败都只记录日志，退化为仅本地模式。
pub struct DraftSync<R> {
    local: LocalStore,
    remote: R,
    online: AtomicBool,
    syncing: AtomicBool,
}

impl<R: RemoteDrafts> DraftSync<R> {
    pub fn new(local: LocalStore, remote: R, online: bool) -> Self {
        Self {
            local,
            remote,
            online: AtomicBool::new(online),
            syncing: AtomicBool::new(false),
        }
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    fn can_reach_remote(&self) -> bool {
        self.is_online() && self.remote.is_authenticated()
    }

    /// 编辑器挂载时加载草稿
    ///
    /// 1. 先读取本地草稿
    /// 2. 在线且已登录时获取云端草稿
    /// 3. 云端严格更新则覆盖本地并标记已同步，否则本地有未同步修改时推送到云端
    ///
    /// 云端时间不晚于本地记录的 `synced_at` 时，云端就是本设备上次推送的版本，
    /// 本地未同步的编辑优先，即使设备时钟落后于服务端。
    pub async fn load(&self) -> Result<Option<EditorContent>> {
        let local = self.local.draft()?;
        let shown = local.as_ref().map(EditorContent::from_local);

        if !self.can_reach_remote() {
            return Ok(shown);
        }

        let remote = match self.remote.fetch().await {
            Ok(remote) => remote,
            Err(e) => {
                tracing::warn!(%e, "failed to fetch remote draft, using local copy");
                return Ok(shown);
            }
        };

        let local_ms = local
            .as_ref()
            .map_or(0, |d| d.updated_at.timestamp_millis());

        let pushed_by_us = |remote: &RemoteDraft| {
            local.as_ref().is_some_and(|d| {
                d.needs_sync
                    && d.synced_at.is_some_and(|s| {
                        s.timestamp_millis() >= remote.updated_at.timestamp_millis()
                    })
            })
        };

        match remote {
            Some(remote)
                if remote.updated_at.timestamp_millis() > local_ms && !pushed_by_us(&remote) =>
            {
                self.local.set_draft(&LocalDraft {
                    title: remote.title.clone(),
                    content: remote.content.clone(),
                    updated_at: remote.updated_at,
                    needs_sync: false,
                    synced_at: Some(remote.updated_at),
                })?;
                tracing::debug!(updated_at = %remote.updated_at, "remote draft is newer");

                Ok(Some(EditorContent {
                    title: remote.title,
                    content: remote.content,
                    source: DraftSource::Remote,
                }))
            }
            _ => {
                if local.as_ref().is_some_and(|d| d.needs_sync) {
                    self.push().await;
                }
                Ok(shown)
            }
        }
    }

    /// 记录一次编辑，写入本地并标记为待同步
    pub fn record_edit(&self, title: &str, content: &str) -> Result<()> {
        self.save_local(title, content)
    }

    /// 离开编辑器前的最后一次本地保存，不访问云端
    pub fn on_exit(&self, title: &str, content: &str) -> Result<()> {
        self.save_local(title, content)
    }

    fn save_local(&self, title: &str, content: &str) -> Result<()> {
        let previous = self.local.draft()?;
        if previous
            .as_ref()
            .is_some_and(|d| d.title == title && d.content == content)
        {
            return Ok(());
        }

        self.local.set_draft(&LocalDraft {
            title: title.to_string(),
            content: content.to_string(),
            updated_at: now_millis(),
            needs_sync: true,
            synced_at: previous.and_then(|d| d.synced_at),
        })
    }

    /// 立即把本地草稿推送到云端
    ///
    /// 离线、未登录、没有本地草稿、已有同步在进行或推送失败时返回 `false`。
    pub async fn sync_now(&self) -> bool {
        if !self.can_reach_remote() {
            return false;
        }
        self.push().await
    }

    /// 定时器触发：只在有未同步且非空的草稿时推送
    pub async fn tick(&self) -> bool {
        match self.local.draft() {
            Ok(Some(draft)) if draft.needs_sync && !draft.is_blank() => self.sync_now().await,
            Ok(_) => false,
            Err(e) => {
                tracing::warn!(%e, "failed to read local draft");
                false
            }
        }
    }

    /// 更新网络状态，从离线恢复时如有未同步修改则推送一次
    pub async fn set_online(&self, online: bool) -> bool {
        let was_online = self.online.swap(online, Ordering::AcqRel);
        if !online || was_online {
            return false;
        }

        match self.local.draft() {
            Ok(Some(draft)) if draft.needs_sync => self.sync_now().await,
            _ => false,
        }
    }

    /// 发布成功后清除本地和云端草稿，云端删除失败会被忽略
    pub async fn on_published(&self) -> Result<()> {
        self.local.remove_draft()?;
        if self.can_reach_remote() {
            if let Err(e) = self.remote.delete().await {
                tracing::warn!(%e, "failed to delete remote draft");
            }
        }
        Ok(())
    }

    async fn push(&self) -> bool {
        let Some(_guard) = InFlight::acquire(&self.syncing) else {
            tracing::debug!("draft sync already in flight");
            return false;
        };

        let draft = match self.local.draft() {
            Ok(Some(draft)) => draft,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(%e, "failed to read local draft");
                return false;
            }
        };

        let remote = match self.remote.save(&draft.title, &draft.content).await {
            Ok(remote) => remote,
            Err(e) => {
                tracing::warn!(%e, "failed to push draft, staying local");
                return false;
            }
        };

        match self.local.mark_synced(draft.updated_at, remote.updated_at) {
            Ok(marked) => {
                tracing::debug!(marked, "draft pushed");
                true
            }
            Err(e) => {
                tracing::warn!(%e, "failed to mark local draft synced");
                false
            }
        }
    }
}

/// 启动自动同步任务，每个周期调用一次 [`DraftSync::tick`]，直到 `shutdown` 变化或发送端关闭
pub fn spawn_autosave<R>(
    sync: Arc<DraftSync<R>>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    R: RemoteDrafts + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 第一次 tick 立即完成
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    sync.tick().await;
                }
                _ = shutdown.changed() => break,
            }
        }
    })
}

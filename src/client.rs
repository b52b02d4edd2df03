mod api;
mod local;
mod sync;

pub use self::{
    api::ApiClient,
    local::{DRAFT_KEY, LocalDraft, LocalStore, TOKEN_KEY, USER_KEY},
    sync::{
        AUTOSAVE_INTERVAL, DraftSource, DraftSync, EditorContent, RemoteDraft, RemoteDrafts,
        spawn_autosave,
    },
};

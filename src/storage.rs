mod articles;
mod drafts;
mod models;
mod postgres;
mod users;

pub use self::{
    articles::ArticleStore,
    drafts::DraftStore,
    models::{ArticleRow, DraftRow, TagRow, UserRow},
    postgres::{DBPool, init_db, migrate, new_db_pool},
    users::UserStore,
};

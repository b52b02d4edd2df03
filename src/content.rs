mod hashtag;
mod validate;

pub use self::{
    hashtag::{MAX_TAG_CHARS, extract_hashtags, strip_html},
    validate::{
        ArticleInput, ArticlePatch, Credentials, DraftInput, MAX_TITLE_CHARS, MAX_USERNAME_CHARS,
    },
};

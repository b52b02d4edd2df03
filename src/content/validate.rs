use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};

/// 标题最大字符数
pub const MAX_TITLE_CHARS: usize = 255;

/// 用户名最大字符数，与 `users.username` 列宽一致
pub const MAX_USERNAME_CHARS: usize = 64;

const PASSWORD_CHARS: std::ops::RangeInclusive<usize> = 6..=20;

fn bad_request(msg: &str) -> crate::error::Error {
    ApiError::BadRequest(msg.to_string()).into()
}

fn check_title(title: &str) -> Result<()> {
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(bad_request("标题最长255个字符"));
    }
    Ok(())
}

/// 发布文章的请求体
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArticleInput {
    pub title: String,
    pub content: String,
}

impl ArticleInput {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(bad_request("标题不能为空"));
        }
        check_title(&self.title)?;
        if self.content.trim().is_empty() {
            return Err(bad_request("内容不能为空"));
        }
        Ok(())
    }
}

/// 编辑文章的请求体，未提供的字段保持不变
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ArticlePatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl ArticlePatch {
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(bad_request("标题不能为空"));
            }
            check_title(title)?;
        }
        if matches!(&self.content, Some(c) if c.trim().is_empty()) {
            return Err(bad_request("内容不能为空"));
        }
        Ok(())
    }
}

/// 保存草稿的请求体，标题和内容都允许为空
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DraftInput {
    pub title: String,
    pub content: String,
}

impl DraftInput {
    pub fn validate(&self) -> Result<()> {
        check_title(&self.title)
    }
}

/// 注册和登录共用的请求体
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(bad_request("用户名不能为空"));
        }
        if self.username.chars().count() > MAX_USERNAME_CHARS {
            return Err(bad_request("用户名最长64个字符"));
        }
        let len = self.password.chars().count();
        if len < *PASSWORD_CHARS.start() {
            return Err(bad_request("密码长度不能少于6位"));
        }
        if len > *PASSWORD_CHARS.end() {
            return Err(bad_request("密码太长了"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str, content: &str) -> ArticleInput {
        ArticleInput {
            title: title.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_article_input() {
        assert!(article("标题", "<p>正文</p>").validate().is_ok());
        assert!(article("  ", "<p>正文</p>").validate().is_err());
        assert!(article("标题", "   ").validate().is_err());
        assert!(article(&"长".repeat(255), "x").validate().is_ok());
        assert!(article(&"长".repeat(256), "x").validate().is_err());
    }

    #[test]
    fn test_article_patch() {
        assert!(ArticlePatch::default().validate().is_ok());

        let patch = ArticlePatch {
            title: Some(String::new()),
            content: None,
        };
        assert!(patch.validate().is_err());

        let patch = ArticlePatch {
            title: None,
            content: Some("<p>no tags</p>".into()),
        };
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn test_draft_allows_empty_fields() {
        let draft = DraftInput {
            title: String::new(),
            content: String::new(),
        };
        assert!(draft.validate().is_ok());

        let draft = DraftInput {
            title: "x".repeat(256),
            content: String::new(),
        };
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_credentials() {
        let creds = |u: &str, p: &str| Credentials {
            username: u.into(),
            password: p.into(),
        };

        assert!(creds("alice", "123456").validate().is_ok());
        assert!(creds("", "123456").validate().is_err());
        assert!(creds(&"u".repeat(64), "123456").validate().is_ok());
        assert!(creds(&"u".repeat(65), "123456").validate().is_err());
        assert!(creds(&"用".repeat(64), "123456").validate().is_ok());
        assert!(creds("alice", "12345").validate().is_err());
        assert!(creds("alice", &"1".repeat(21)).validate().is_err());
    }
}

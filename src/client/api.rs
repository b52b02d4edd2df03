use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};

use super::{LocalStore, RemoteDraft, RemoteDrafts};
use crate::{
    api::{ArticleList, ArticleView, Likes, LoginView, RegisterView},
    content::{ArticleInput, ArticlePatch, Credentials, DraftInput},
    error::{Error, Result},
};

/// REST 接口客户端
///
/// 访问令牌保存在 [`LocalStore`] 中，登录后自动附加到需要认证的请求上。
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    store: LocalStore,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl ApiClient {
    /// ```ignore
    /// let store = LocalStore::open(".inkfeed")?;
    /// let client = ApiClient::new("http://localhost:9080", store)?;
    /// ```
    pub fn new(base_url: impl Into<String>, store: LocalStore) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store,
        })
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));

        Ok(match self.store.token()? {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    /// 发送请求，非 2xx 响应转为 [`Error::Remote`]
    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T> {
        let resp = builder.send().await?;
        let status = resp.status();

        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.message)
                .unwrap_or(text);
            return Err(Error::Remote {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json().await?)
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<RegisterView> {
        let body = Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };
        Self::send(self.request(Method::POST, "/auth/register")?.json(&body)).await
    }

    /// 登录并把令牌和用户信息写入本地存储
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginView> {
        let body = Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };
        let view: LoginView =
            Self::send(self.request(Method::POST, "/auth/login")?.json(&body)).await?;

        self.store.set_token(&view.access_token)?;
        self.store.set_user(&view.user)?;
        Ok(view)
    }

    /// 登出，无论服务端是否响应都清除本地会话
    pub async fn logout(&self) -> Result<()> {
        let result: Result<serde_json::Value> =
            Self::send(self.request(Method::POST, "/auth/logout")?).await;
        self.store.clear_session()?;
        result.map(|_| ())
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self.store.token(), Ok(Some(_)))
    }

    /// 获取云端草稿，404 视为没有草稿
    pub async fn get_draft(&self) -> Result<Option<RemoteDraft>> {
        match Self::send(self.request(Method::GET, "/draft")?).await {
            Ok(draft) => Ok(Some(draft)),
            Err(Error::Remote { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn save_draft(&self, title: &str, content: &str) -> Result<RemoteDraft> {
        let body = DraftInput {
            title: title.to_string(),
            content: content.to_string(),
        };
        Self::send(self.request(Method::POST, "/draft")?.json(&body)).await
    }

    pub async fn delete_draft(&self) -> Result<()> {
        let _: serde_json::Value = Self::send(self.request(Method::DELETE, "/draft")?).await?;
        Ok(())
    }

    pub async fn publish(&self, title: &str, content: &str) -> Result<ArticleView> {
        let body = ArticleInput {
            title: title.to_string(),
            content: content.to_string(),
        };
        Self::send(self.request(Method::POST, "/articles")?.json(&body)).await
    }

    pub async fn update_article(&self, id: i32, patch: &ArticlePatch) -> Result<ArticleView> {
        let path = format!("/articles/{id}");
        Self::send(self.request(Method::PUT, &path)?.json(patch)).await
    }

    pub async fn delete_article(&self, id: i32) -> Result<()> {
        let path = format!("/articles/{id}");
        let _: serde_json::Value = Self::send(self.request(Method::DELETE, &path)?).await?;
        Ok(())
    }

    pub async fn articles(&self, page: i64, limit: i64) -> Result<ArticleList> {
        let builder = self
            .request(Method::GET, "/articles")?
            .query(&[("page", page), ("limit", limit)]);
        Self::send(builder).await
    }

    pub async fn article(&self, id: i32) -> Result<ArticleView> {
        let path = format!("/articles/{id}");
        Self::send(self.request(Method::GET, &path)?).await
    }

    pub async fn like(&self, id: i32) -> Result<Likes> {
        let path = format!("/articles/{id}/like");
        Self::send(self.request(Method::POST, &path)?).await
    }
}

impl RemoteDrafts for ApiClient {
    fn is_authenticated(&self) -> bool {
        self.is_logged_in()
    }

    async fn fetch(&self) -> Result<Option<RemoteDraft>> {
        self.get_draft().await
    }

    async fn save(&self, title: &str, content: &str) -> Result<RemoteDraft> {
        self.save_draft(title, content).await
    }

    async fn delete(&self) -> Result<()> {
        self.delete_draft().await
    }
}

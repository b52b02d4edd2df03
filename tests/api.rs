use axum::{
    Router,
    body::{Body, Bytes, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::util::ServiceExt;

use inkfeed::{
    api::{self, MAX_IMAGE_BYTES},
    auth::JwtKeys,
    state::{AppState, UploadDir},
    storage::{migrate, new_db_pool},
};

struct TestApp {
    router: Router,
    uploads: tempfile::TempDir,
}

const BOUNDARY: &str = "inkfeed-test-boundary";

/// 构造只有一个文件字段的 multipart 请求体
fn multipart_body(field: &str, filename: &str, mime: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: {mime}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// 8 字节 PNG 文件头加少量数据
fn tiny_png() -> Vec<u8> {
    let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
    data.extend_from_slice(&[0u8; 32]);
    data
}

impl TestApp {
    async fn new() -> Self {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL not set");
        let db = new_db_pool(&url).await.expect("连接数据库失败");

        migrate(&db, "sql/01-CREATE_TABLE.sql")
            .await
            .expect("初始化sql失败");

        let uploads = tempfile::tempdir().expect("创建上传目录失败");
        let app = AppState::new(db, JwtKeys::new("test-secret"), UploadDir::new(uploads.path()));

        Self {
            router: api::setup_route(app),
            uploads,
        }
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Bytes) {
        let resp = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("oneshot fail");

        let status = resp.status();
        let data = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("读取数据失败");
        (status, data)
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::new(body.to_string())),
            None => req.body(Body::empty()),
        }
        .expect("构造请求失败");

        let (status, data) = self.send(req).await;
        let json = if data.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&data).expect("反序列化失败")
        };
        (status, json)
    }

    /// 注册一个随机用户并登录，返回令牌
    async fn user(&self) -> String {
        let username = format!("u_{}", uuid::Uuid::new_v4().simple());
        let creds = json!({ "username": username, "password": "123456" });

        let (status, _) = self
            .call(Method::POST, "/auth/register", None, Some(creds.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED, "注册");

        let (status, body) = self
            .call(Method::POST, "/auth/login", None, Some(creds))
            .await;
        assert_eq!(status, StatusCode::OK, "登录");
        body["access_token"].as_str().expect("缺少令牌").to_string()
    }

    /// 上传图片，返回状态码和 JSON 响应体
    async fn upload(&self, token: Option<&str>, multipart: Vec<u8>) -> (StatusCode, Value) {
        let mut req = Request::builder()
            .method(Method::POST)
            .uri("/upload/image")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = req.body(Body::from(multipart)).expect("构造请求失败");

        let (status, data) = self.send(req).await;
        (status, serde_json::from_slice(&data).expect("上传响应应为 JSON"))
    }

    async fn publish(&self, token: &str, content: &str) -> Value {
        let (status, body) = self
            .call(
                Method::POST,
                "/articles",
                Some(token),
                Some(json!({ "title": "测试文章", "content": content })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "发布文章");
        body
    }
}

fn tag_names(article: &Value) -> Vec<String> {
    let mut names: Vec<String> = article["tags"]
        .as_array()
        .expect("tags 应为数组")
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect();
    names.sort();
    names
}

#[tokio::test]
#[ignore = "API测试 依赖真实数据库"]
async fn test_publish_extracts_tags() {
    let app = TestApp::new().await;
    let token = app.user().await;

    let article = app
        .publish(&token, "<p>#Tech is #tech! <img src='#notag'>#Rust编程</p>")
        .await;
    assert_eq!(tag_names(&article), vec!["rust编程", "tech"]);
    assert!(article["tags"][0]["id"].is_i64());
    assert_eq!(article["likes"], 0);
    assert_eq!(article["views"], 0);
}

#[tokio::test]
#[ignore = "API测试 依赖真实数据库"]
async fn test_views_increment_per_read() {
    let app = TestApp::new().await;
    let token = app.user().await;
    let id = app.publish(&token, "<p>正文</p>").await["id"].as_i64().unwrap();
    let uri = format!("/articles/{id}");

    let (_, first) = app.call(Method::GET, &uri, None, None).await;
    let (_, second) = app.call(Method::GET, &uri, Some(&token), None).await;

    // 每次读取都先加一再返回
    assert_eq!(first["views"], 1);
    assert_eq!(second["views"], 2);

    let (status, _) = app.call(Method::GET, "/articles/999999999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "API测试 依赖真实数据库"]
async fn test_like_has_no_idempotency() {
    let app = TestApp::new().await;
    let token = app.user().await;
    let id = app.publish(&token, "<p>正文</p>").await["id"].as_i64().unwrap();
    let uri = format!("/articles/{id}/like");

    let (status, body) = app.call(Method::POST, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["likes"], 1);

    let (_, body) = app.call(Method::POST, &uri, None, None).await;
    assert_eq!(body["likes"], 2);
}

#[tokio::test]
#[ignore = "API测试 依赖真实数据库"]
async fn test_update_replaces_tags() {
    let app = TestApp::new().await;
    let token = app.user().await;
    let id = app.publish(&token, "<p>#old #keep</p>").await["id"].as_i64().unwrap();
    let uri = format!("/articles/{id}");

    let (status, body) = app
        .call(
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({ "content": "<p>#keep #new</p>" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tag_names(&body), vec!["keep", "new"]);
    assert_eq!(body["title"], "测试文章");

    let (status, body) = app
        .call(
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({ "title": "新标题", "content": "<p>没有标签</p>" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(tag_names(&body).is_empty(), "旧标签应被全部解除关联");
    assert_eq!(body["title"], "新标题");
}

#[tokio::test]
#[ignore = "API测试 依赖真实数据库"]
async fn test_only_owner_can_modify() {
    let app = TestApp::new().await;
    let owner = app.user().await;
    let other = app.user().await;
    let id = app.publish(&owner, "<p>#mine</p>").await["id"].as_i64().unwrap();
    let uri = format!("/articles/{id}");

    let (status, _) = app.call(Method::DELETE, &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            Method::PUT,
            &uri,
            Some(&other),
            Some(json!({ "content": "<p>#hijack</p>" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.call(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK, "非作者删除后文章应仍然存在");
    assert_eq!(tag_names(&body), vec!["mine"]);

    let (status, _) = app.call(Method::DELETE, &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.call(Method::DELETE, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "文章已删除");

    let (status, _) = app.call(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "API测试 依赖真实数据库"]
async fn test_article_list_is_clamped() {
    let app = TestApp::new().await;
    let token = app.user().await;
    app.publish(&token, "<p>正文</p>").await;

    let (status, body) = app
        .call(Method::GET, "/articles?page=1&limit=500", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["articles"].as_array().unwrap().len() <= 50);
    assert!(body["total"].as_i64().unwrap() >= 1);

    let (_, body) = app.call(Method::GET, "/articles?limit=1", None, None).await;
    assert_eq!(body["articles"].as_array().unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "API测试 依赖真实数据库"]
async fn test_draft_upsert_and_delete() {
    let app = TestApp::new().await;
    let token = app.user().await;

    let (status, _) = app.call(Method::GET, "/draft", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.call(Method::GET, "/draft", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, first) = app
        .call(
            Method::POST,
            "/draft",
            Some(&token),
            Some(json!({ "title": "草稿", "content": "<p>1</p>" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(first["updatedAt"].as_str().unwrap().ends_with('Z'));

    let (_, second) = app
        .call(
            Method::POST,
            "/draft",
            Some(&token),
            Some(json!({ "title": "草稿2", "content": "<p>2</p>" })),
        )
        .await;
    assert_eq!(first["id"], second["id"], "每个用户只有一条草稿");

    let (status, fetched) = app.call(Method::GET, "/draft", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "草稿2");

    for _ in 0..2 {
        let (status, body) = app.call(Method::DELETE, "/draft", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["msg"], "草稿已删除");
    }

    let (status, _) = app.call(Method::GET, "/draft", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "API测试 依赖真实数据库"]
async fn test_auth_errors() {
    let app = TestApp::new().await;
    let username = format!("u_{}", uuid::Uuid::new_v4().simple());
    let creds = json!({ "username": username, "password": "123456" });

    let (status, _) = app
        .call(Method::POST, "/auth/register", None, Some(creds.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .call(Method::POST, "/auth/register", None, Some(creds))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "用户名已存在");

    let (status, _) = app
        .call(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": username, "password": "wrong-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "username": "short", "password": "123" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "username": "u".repeat(65), "password": "123456" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "用户名最长64个字符");
}

#[tokio::test]
#[ignore = "API测试 依赖真实数据库"]
async fn test_upload_image_is_stored_and_served() {
    let app = TestApp::new().await;
    let token = app.user().await;
    let png = tiny_png();

    let (status, body) = app
        .upload(Some(&token), multipart_body("file", "Cat.PNG", "image/png", &png))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let filename = body["filename"].as_str().expect("缺少文件名");
    assert!(filename.ends_with(".png"));
    assert_eq!(body["url"], format!("/uploads/{filename}"));

    let saved = std::fs::read(app.uploads.path().join(filename)).expect("文件未写入上传目录");
    assert_eq!(saved, png);

    let req = Request::get(format!("/uploads/{filename}"))
        .body(Body::empty())
        .unwrap();
    let (status, served) = app.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(served.as_ref(), png.as_slice());
}

#[tokio::test]
#[ignore = "API测试 依赖真实数据库"]
async fn test_upload_rejections() {
    let app = TestApp::new().await;
    let token = app.user().await;
    let png = tiny_png();

    let (status, _) = app
        .upload(None, multipart_body("file", "a.png", "image/png", &png))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .upload(Some(&token), multipart_body("avatar", "a.png", "image/png", &png))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "缺少 file 字段");
    assert_eq!(body["statusCode"], 400);

    let (status, _) = app
        .upload(Some(&token), multipart_body("file", "a.txt", "text/plain", b"hello"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "不支持的类型");

    let just_over = vec![0u8; MAX_IMAGE_BYTES + 1];
    let (status, body) = app
        .upload(Some(&token), multipart_body("file", "big.png", "image/png", &just_over))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "超过 5MB");
    assert_eq!(body["message"], "图片大小不能超过 5MB");

    let far_over = vec![0u8; MAX_IMAGE_BYTES + 256 * 1024];
    let (status, _) = app
        .upload(Some(&token), multipart_body("file", "huge.png", "image/png", &far_over))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "超过请求体上限");

    let stored = std::fs::read_dir(app.uploads.path())
        .map(|dir| dir.count())
        .unwrap_or(0);
    assert_eq!(stored, 0, "被拒绝的上传不应写入文件");
}

#[tokio::test]
#[ignore = "API测试 依赖真实数据库"]
async fn test_huge_page_returns_empty_list() {
    let app = TestApp::new().await;

    let uri = format!("/articles?page={}&limit=50", i64::MAX);
    let (status, body) = app.call(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["articles"].as_array().unwrap().is_empty());
}

#[tokio::test]
#[ignore = "API测试 依赖真实数据库"]
async fn test_malformed_requests_use_json_errors() {
    let app = TestApp::new().await;

    let (status, body) = app
        .call(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "username": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["statusCode"], 400);

    let (status, body) = app.call(Method::GET, "/articles/abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["statusCode"], 400);
}

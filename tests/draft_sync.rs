use inkfeed::{
    api,
    auth::JwtKeys,
    client::{ApiClient, DraftSource, DraftSync, LocalStore},
    state::{AppState, UploadDir},
    storage::{migrate, new_db_pool},
};

/// 在随机端口上启动服务，返回基础地址
async fn spawn_server(uploads: &std::path::Path) -> String {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL not set");
    let db = new_db_pool(&url).await.expect("连接数据库失败");
    migrate(&db, "sql/01-CREATE_TABLE.sql")
        .await
        .expect("初始化sql失败");

    let app = AppState::new(db, JwtKeys::new("test-secret"), UploadDir::new(uploads));
    let router = api::setup_route(app);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("绑定端口失败");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await });

    format!("http://{addr}")
}

/// 同一用户的两台设备
async fn two_devices(base: &str) -> (tempfile::TempDir, DraftSync<ApiClient>, DraftSync<ApiClient>) {
    let dirs = tempfile::tempdir().unwrap();
    let username = format!("u_{}", uuid::Uuid::new_v4().simple());

    let mut devices = Vec::new();
    for name in ["a", "b"] {
        let store = LocalStore::open(dirs.path().join(name)).unwrap();
        let client = ApiClient::new(base, store.clone()).unwrap();
        if name == "a" {
            client.register(&username, "123456").await.expect("注册失败");
        }
        client.login(&username, "123456").await.expect("登录失败");
        devices.push(DraftSync::new(store, client, true));
    }

    let b = devices.pop().unwrap();
    let a = devices.pop().unwrap();
    (dirs, a, b)
}

#[tokio::test]
#[ignore = "API测试 依赖真实数据库"]
async fn test_last_writer_wins_between_devices() {
    let uploads = tempfile::tempdir().unwrap();
    let base = spawn_server(uploads.path()).await;
    let (_dirs, a, b) = two_devices(&base).await;

    // 设备 a 编辑并同步
    a.record_edit("来自 a", "<p>a</p>").unwrap();
    assert!(a.sync_now().await);

    // 设备 b 挂载时拿到更新的云端草稿
    let shown = b.load().await.unwrap().unwrap();
    assert_eq!(shown.source, DraftSource::Remote);
    assert_eq!(shown.content, "<p>a</p>");
    assert!(!b.local().draft().unwrap().unwrap().needs_sync);

    // 设备 b 之后的离线修改在恢复网络时推送
    b.set_online(false).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    b.record_edit("来自 b", "<p>b</p>").unwrap();
    assert!(b.set_online(true).await);

    let remote = b.remote().get_draft().await.unwrap().unwrap();
    assert_eq!(remote.title, "来自 b");

    // 设备 a 重新挂载时被覆盖
    let shown = a.load().await.unwrap().unwrap();
    assert_eq!(shown.source, DraftSource::Remote);
    assert_eq!(shown.title, "来自 b");
}

#[tokio::test]
#[ignore = "API测试 依赖真实数据库"]
async fn test_publish_clears_drafts() {
    let uploads = tempfile::tempdir().unwrap();
    let base = spawn_server(uploads.path()).await;
    let (_dirs, a, _b) = two_devices(&base).await;

    a.record_edit("发布", "<p>#Rust #rust #发布</p>").unwrap();
    assert!(a.sync_now().await);

    let article = a.remote().publish("发布", "<p>#Rust #rust #发布</p>").await.unwrap();
    let mut tags: Vec<_> = article.tags.iter().map(|t| t.name.as_str()).collect();
    tags.sort();
    assert_eq!(tags, vec!["rust", "发布"]);

    a.on_published().await.unwrap();
    assert!(a.local().draft().unwrap().is_none());
    assert!(a.remote().get_draft().await.unwrap().is_none());
}

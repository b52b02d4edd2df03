use crate::error::Result;

/// bcrypt 计算代价
const COST: u32 = 10;

/// 在阻塞线程池中计算密码哈希
pub async fn hash_password(password: String) -> Result<String> {
    let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, COST))
        .await
        .map_err(std::io::Error::other)??;
    Ok(hashed)
}

/// 在阻塞线程池中校验密码
pub async fn verify_password(password: String, hashed: String) -> Result<bool> {
    let ok = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed))
        .await
        .map_err(std::io::Error::other)??;
    Ok(ok)
}

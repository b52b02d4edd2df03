use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// 令牌有效天数
pub const TOKEN_TTL_DAYS: i64 = 7;

/// JWT 载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// 用户 id 的字符串形式
    pub sub: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 签名和校验所需的密钥对
#[derive(Clone)]
pub struct JwtKeys {
    inner: Arc<Keys>,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        Self {
            inner: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret),
                decoding: DecodingKey::from_secret(secret),
            }),
        }
    }

    /// 为用户签发访问令牌
    pub fn issue(&self, user_id: i32, username: &str) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.inner.encoding)?)
    }

    /// 校验令牌并返回载荷
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.inner.decoding, &Validation::default())?;
        Ok(data.claims)
    }
}

impl Claims {
    /// 载荷中的用户 id
    pub fn user_id(&self) -> Option<i32> {
        self.sub.parse().ok()
    }
}

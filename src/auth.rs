mod extract;
mod password;
mod token;

pub use self::{
    extract::AuthUser,
    password::{hash_password, verify_password},
    token::{Claims, JwtKeys, TOKEN_TTL_DAYS},
};

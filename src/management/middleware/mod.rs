//! # 管理端中间件

pub mod auth;

pub use auth::internal_auth;

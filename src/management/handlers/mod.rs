//! # 请求处理器

pub mod allowlist;
pub mod cache;
pub mod logs;
pub mod mirror;
pub mod mirrors;
pub mod resolve;
pub mod service;
pub mod system;

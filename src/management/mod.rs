//! # 管理与对外HTTP模块
//!
//! 公共路由（launcher / health / resolve / 镜像内容）与
//! 令牌保护的内部管理路由共用一个监听端口。

pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;

pub use server::{AppState, MirrorServer};

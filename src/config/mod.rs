//! # 配置管理模块
//!
//! 应用配置从环境变量装载，启动时校验失败则以非零码退出

mod app_config;

pub use app_config::AppConfig;

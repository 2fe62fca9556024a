//! # 应用配置结构定义
//!
//! 所有配置项来自环境变量（`MIRROR_*`），未设置时取默认值。

use crate::ensure_config;
use crate::error::{ProxyError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// 应用主配置结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP监听地址
    pub host: String,
    /// HTTP监听端口
    pub port: u16,
    /// 对外访问的基础URL（可选，用于生成完整的 launch URL）
    pub public_base_url: Option<String>,
    /// 内部管理接口令牌（必填，至少8个字符）
    pub internal_token: String,
    /// 白名单JSON文件路径
    pub allowlist_path: PathBuf,
    /// SQLite数据库文件路径
    pub db_path: PathBuf,
    /// 文件缓存目录
    pub cache_dir: PathBuf,
    /// 缓存条目存活时间（秒）
    pub cache_ttl_seconds: u64,
    /// 缓存目录总大小上限（字节）
    pub cache_max_bytes: u64,
    /// 上游请求超时（毫秒，每个重定向跳各自计时）
    pub upstream_timeout_ms: u64,
    /// HTML响应体大小上限（字节）
    pub max_html_bytes: usize,
    /// 非HTML响应体大小上限（字节）
    pub max_binary_bytes: usize,
    /// 是否允许镜像 http:// 目标
    pub enable_http: bool,
    /// 启动时即处于停用状态
    pub disable_service: bool,
    /// 事件日志的JSON-lines镜像文件（可选）
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8085,
            public_base_url: None,
            internal_token: String::new(),
            allowlist_path: PathBuf::from("data/allowlist.json"),
            db_path: PathBuf::from("data/mirror.db"),
            cache_dir: PathBuf::from("data/cache"),
            cache_ttl_seconds: 7200,
            cache_max_bytes: 1024 * 1024 * 1024,
            upstream_timeout_ms: 12_000,
            max_html_bytes: 5 * 1024 * 1024,
            max_binary_bytes: 25 * 1024 * 1024,
            enable_http: false,
            disable_service: false,
            log_file: None,
        }
    }
}

impl AppConfig {
    /// 从环境变量装载配置并校验
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            host: env_string("HOST").unwrap_or(defaults.host),
            port: env_parse("PORT")?.unwrap_or(defaults.port),
            public_base_url: env_string("MIRROR_PUBLIC_BASE_URL"),
            internal_token: env_string("MIRROR_INTERNAL_TOKEN").unwrap_or_default(),
            allowlist_path: env_string("MIRROR_ALLOWLIST_PATH")
                .map_or(defaults.allowlist_path, PathBuf::from),
            db_path: env_string("MIRROR_DB_PATH").map_or(defaults.db_path, PathBuf::from),
            cache_dir: env_string("MIRROR_CACHE_DIR").map_or(defaults.cache_dir, PathBuf::from),
            cache_ttl_seconds: env_parse("MIRROR_CACHE_TTL_SECONDS")?
                .unwrap_or(defaults.cache_ttl_seconds),
            cache_max_bytes: env_parse("MIRROR_CACHE_MAX_BYTES")?
                .unwrap_or(defaults.cache_max_bytes),
            upstream_timeout_ms: env_parse("MIRROR_UPSTREAM_TIMEOUT_MS")?
                .unwrap_or(defaults.upstream_timeout_ms),
            max_html_bytes: env_parse("MIRROR_MAX_HTML_BYTES")?.unwrap_or(defaults.max_html_bytes),
            max_binary_bytes: env_parse("MIRROR_MAX_BINARY_BYTES")?
                .unwrap_or(defaults.max_binary_bytes),
            enable_http: env_bool("MIRROR_ENABLE_HTTP").unwrap_or(defaults.enable_http),
            disable_service: env_bool("MIRROR_DISABLE_SERVICE").unwrap_or(defaults.disable_service),
            log_file: env_string("MIRROR_LOG_FILE").map(PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    /// 校验配置合法性
    pub fn validate(&self) -> Result<()> {
        ensure_config!(
            !self.internal_token.is_empty(),
            "MIRROR_INTERNAL_TOKEN 必须设置"
        );
        ensure_config!(
            self.internal_token.len() >= 8,
            "MIRROR_INTERNAL_TOKEN 长度至少8个字符"
        );
        ensure_config!(self.port > 0, "PORT 不能为0");
        ensure_config!(self.cache_ttl_seconds > 0, "MIRROR_CACHE_TTL_SECONDS 不能为0");
        ensure_config!(self.cache_max_bytes > 0, "MIRROR_CACHE_MAX_BYTES 不能为0");
        ensure_config!(self.max_html_bytes > 0, "MIRROR_MAX_HTML_BYTES 不能为0");
        ensure_config!(self.max_binary_bytes > 0, "MIRROR_MAX_BINARY_BYTES 不能为0");
        Ok(())
    }

    /// SQLite连接URL
    #[must_use]
    pub fn database_url(&self) -> String {
        format!("sqlite://{}", self.db_path.display())
    }

    /// 监听地址
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env_string(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ProxyError::config(format!("{key} 取值非法: {e}"))),
    }
}

fn env_bool(key: &str) -> Option<bool> {
    env_string(key).map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.port, 8085);
        assert_eq!(config.cache_ttl_seconds, 7200);
        assert_eq!(config.cache_max_bytes, 1024 * 1024 * 1024);
        assert_eq!(config.upstream_timeout_ms, 12_000);
        assert_eq!(config.max_html_bytes, 5 * 1024 * 1024);
        assert_eq!(config.max_binary_bytes, 25 * 1024 * 1024);
        assert!(!config.enable_http);
    }

    #[test]
    fn validate_rejects_short_token() {
        let config = AppConfig {
            internal_token: "short".to_string(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            internal_token: "long-enough-token".to_string(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn database_url_from_path() {
        let config = AppConfig {
            db_path: PathBuf::from("data/mirror.db"),
            ..AppConfig::default()
        };
        assert_eq!(config.database_url(), "sqlite://data/mirror.db");
    }
}

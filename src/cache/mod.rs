//! # 文件缓存模块
//!
//! 按 (slug, cacheKey) 内容寻址的磁盘缓存：
//! 每个条目为一对文件（元数据JSON + 响应体），TTL过期 + 按写入时间先老先逐出。

mod keys;
mod store;

use serde::Serialize;
use std::collections::BTreeMap;

pub use keys::{cache_key, entry_stem, safe_slug};
pub use store::FileCache;

/// 一条缓存的上游响应
#[derive(Debug, Clone)]
pub struct CachedResponse {
    /// 2xx状态码
    pub status: u16,
    /// 过滤后的响应头（仅字符串值）
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    /// 写入时刻（epoch毫秒）
    pub cached_at: i64,
}

/// 缓存统计信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: u64,
    pub used_bytes: u64,
}

//! # 磁盘缓存存储
//!
//! 每个条目两个文件：`<stem>.json`（元数据）与 `<stem>.bin`（响应体）。
//! 单文件写入使用临时文件+重命名，保证整文件原子性；
//! 读取与逐出并发时观测到"有元数据无响应体"一律按未命中处理。

use super::{CacheStats, CachedResponse, entry_stem, safe_slug};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 条目元数据（磁盘JSON形态）
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheMeta {
    status: u16,
    headers: BTreeMap<String, String>,
    content_type: Option<String>,
    /// 写入时刻（epoch毫秒）
    cached_at: i64,
    /// 响应体字节数
    size: u64,
}

/// 磁盘文件缓存
pub struct FileCache {
    dir: PathBuf,
    ttl_seconds: u64,
    max_bytes: u64,
}

impl FileCache {
    /// 打开缓存目录（不存在则创建）
    pub fn open(dir: impl Into<PathBuf>, ttl_seconds: u64, max_bytes: u64) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            ttl_seconds,
            max_bytes,
        })
    }

    fn meta_path(&self, slug: &str, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", entry_stem(slug, key)))
    }

    fn body_path(&self, slug: &str, key: &str) -> PathBuf {
        self.dir.join(format!("{}.bin", entry_stem(slug, key)))
    }

    /// 读取缓存条目
    ///
    /// 元数据损坏、条目过期或响应体缺失都按未命中处理并清理残留文件。
    pub async fn get(&self, slug: &str, key: &str) -> Result<Option<CachedResponse>> {
        let meta_path = self.meta_path(slug, key);
        let body_path = self.body_path(slug, key);

        let raw = match tokio::fs::read_to_string(&meta_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let meta: CacheMeta = match serde_json::from_str(&raw) {
            Ok(meta) => meta,
            Err(_) => {
                // 元数据损坏：清理孤儿
                warn!(path = %meta_path.display(), "缓存元数据损坏，移除");
                remove_quiet(&meta_path).await;
                remove_quiet(&body_path).await;
                return Ok(None);
            }
        };

        let age_seconds = (now_millis() - meta.cached_at) / 1000;
        if age_seconds > self.ttl_seconds as i64 {
            debug!(slug = slug, key = key, age = age_seconds, "缓存过期，移除");
            remove_quiet(&meta_path).await;
            remove_quiet(&body_path).await;
            return Ok(None);
        }

        let body = match tokio::fs::read(&body_path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                remove_quiet(&meta_path).await;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Some(CachedResponse {
            status: meta.status,
            headers: meta.headers,
            body,
            content_type: meta.content_type,
            cached_at: meta.cached_at,
        }))
    }

    /// 写入缓存条目
    ///
    /// 超过单条目上限（总容量一半）的响应静默拒绝；
    /// 先写响应体再写元数据，保证读到元数据即有响应体可读。
    pub async fn set(&self, slug: &str, key: &str, response: &CachedResponse) -> Result<()> {
        let size = response.body.len() as u64;
        if size > self.max_bytes / 2 {
            debug!(slug = slug, size = size, "条目超过单项上限，跳过缓存");
            return Ok(());
        }

        let meta = CacheMeta {
            status: response.status,
            headers: response.headers.clone(),
            content_type: response.content_type.clone(),
            cached_at: response.cached_at,
            size,
        };

        write_atomic(&self.dir, &self.body_path(slug, key), &response.body)?;
        write_atomic(
            &self.dir,
            &self.meta_path(slug, key),
            serde_json::to_string(&meta)?.as_bytes(),
        )?;

        self.prune().await?;
        Ok(())
    }

    /// 清空整个缓存目录，返回移除的条目数
    pub async fn purge_all(&self) -> Result<u64> {
        let mut removed = 0u64;
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            if entry.file_type().await?.is_file() {
                remove_quiet(&entry.path()).await;
                removed += 1;
            }
        }
        Ok(removed / 2)
    }

    /// 移除指定slug的全部条目
    pub async fn purge_by_slug(&self, slug: &str) -> Result<u64> {
        let prefix = format!("{}_", safe_slug(slug));
        let mut removed = 0u64;
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with(&prefix) {
                remove_quiet(&entry.path()).await;
                removed += 1;
            }
        }
        Ok(removed / 2)
    }

    /// 统计未过期条目数与字节总量
    pub async fn stats(&self) -> Result<CacheStats> {
        let now = now_millis();
        let mut entries = 0u64;
        let mut used_bytes = 0u64;

        for item in self.walk_metas().await? {
            let age_seconds = (now - item.meta.cached_at) / 1000;
            if age_seconds <= self.ttl_seconds as i64 {
                entries += 1;
                used_bytes += item.meta.size;
            }
        }

        Ok(CacheStats {
            entries,
            used_bytes,
        })
    }

    /// 清理过期条目与孤儿文件，总量超限时按写入时间先老先逐出
    pub async fn prune(&self) -> Result<()> {
        let now = now_millis();
        let mut live: Vec<MetaItem> = Vec::new();
        let mut total: u64 = 0;

        for item in self.walk_metas().await? {
            let age_seconds = (now - item.meta.cached_at) / 1000;
            if age_seconds > self.ttl_seconds as i64 {
                remove_quiet(&item.meta_path).await;
                remove_quiet(&item.body_path).await;
                continue;
            }
            if !item.body_path.exists() {
                remove_quiet(&item.meta_path).await;
                continue;
            }
            total += item.meta.size;
            live.push(item);
        }

        if total <= self.max_bytes {
            return Ok(());
        }

        // 先老先逐出（按写入时间，非访问时间）
        live.sort_by_key(|item| item.meta.cached_at);
        for item in live {
            if total <= self.max_bytes {
                break;
            }
            debug!(path = %item.meta_path.display(), "容量超限，逐出最旧条目");
            remove_quiet(&item.meta_path).await;
            remove_quiet(&item.body_path).await;
            total = total.saturating_sub(item.meta.size);
        }
        Ok(())
    }

    /// 遍历所有元数据文件；解析失败的元数据与无主响应体就地清理
    async fn walk_metas(&self) -> Result<Vec<MetaItem>> {
        let mut out = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            match path.extension().and_then(|e| e.to_str()) {
                Some("json") => {}
                Some("bin") => {
                    // 无主响应体：对应元数据不存在时清理
                    if !path.with_extension("json").exists() {
                        remove_quiet(&path).await;
                    }
                    continue;
                }
                _ => continue,
            }

            let raw = match tokio::fs::read_to_string(&path).await {
                Ok(raw) => raw,
                Err(_) => continue,
            };
            match serde_json::from_str::<CacheMeta>(&raw) {
                Ok(meta) => out.push(MetaItem {
                    body_path: path.with_extension("bin"),
                    meta_path: path,
                    meta,
                }),
                Err(_) => {
                    warn!(path = %path.display(), "缓存元数据损坏，移除");
                    remove_quiet(&path.with_extension("bin")).await;
                    remove_quiet(&path).await;
                }
            }
        }
        Ok(out)
    }
}

struct MetaItem {
    meta_path: PathBuf,
    body_path: PathBuf,
    meta: CacheMeta,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// 写临时文件后原子重命名
fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path)
        .map_err(|e| crate::error::ProxyError::cache_with_source("缓存文件写入失败", e.error))?;
    Ok(())
}

async fn remove_quiet(path: &Path) {
    let _ = tokio::fs::remove_file(path).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn response(body: &[u8]) -> CachedResponse {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "text/html".to_string());
        CachedResponse {
            status: 200,
            headers,
            body: body.to_vec(),
            content_type: Some("text/html".to_string()),
            cached_at: now_millis(),
        }
    }

    #[tokio::test]
    async fn set_then_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::open(dir.path(), 3600, 1024 * 1024).unwrap();

        cache.set("example-com", "abc", &response(b"hello")).await.unwrap();
        let hit = cache.get("example-com", "abc").await.unwrap().unwrap();
        assert_eq!(hit.status, 200);
        assert_eq!(hit.body, b"hello");
        assert_eq!(hit.headers.get("content-type").unwrap(), "text/html");

        assert!(cache.get("example-com", "other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_entry_is_removed_on_get() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::open(dir.path(), 60, 1024 * 1024).unwrap();

        let mut resp = response(b"stale");
        resp.cached_at = now_millis() - 120_000;
        cache.set("example-com", "abc", &resp).await.unwrap();

        assert!(cache.get("example-com", "abc").await.unwrap().is_none());
        assert!(!dir.path().join("example-com_abc.json").exists());
        assert!(!dir.path().join("example-com_abc.bin").exists());
    }

    #[tokio::test]
    async fn missing_body_returns_miss_and_cleans_meta() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::open(dir.path(), 3600, 1024 * 1024).unwrap();

        cache.set("example-com", "abc", &response(b"x")).await.unwrap();
        std::fs::remove_file(dir.path().join("example-com_abc.bin")).unwrap();

        assert!(cache.get("example-com", "abc").await.unwrap().is_none());
        assert!(!dir.path().join("example-com_abc.json").exists());
    }

    #[tokio::test]
    async fn corrupt_meta_returns_miss() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::open(dir.path(), 3600, 1024 * 1024).unwrap();

        std::fs::write(dir.path().join("example-com_abc.json"), "not json").unwrap();
        assert!(cache.get("example-com", "abc").await.unwrap().is_none());
        assert!(!dir.path().join("example-com_abc.json").exists());
    }

    #[tokio::test]
    async fn oversized_entry_is_refused_silently() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::open(dir.path(), 3600, 100).unwrap();

        cache
            .set("example-com", "abc", &response(&vec![0u8; 51]))
            .await
            .unwrap();
        assert!(cache.get("example-com", "abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn prune_evicts_oldest_first() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::open(dir.path(), 3600, 100).unwrap();

        let mut oldest = response(&vec![b'a'; 40]);
        oldest.cached_at = now_millis() - 30_000;
        let mut middle = response(&vec![b'b'; 40]);
        middle.cached_at = now_millis() - 20_000;

        cache.set("s", "k1", &oldest).await.unwrap();
        cache.set("s", "k2", &middle).await.unwrap();
        // 第三条写入使总量达到120，触发逐出最旧的 k1
        cache.set("s", "k3", &response(&vec![b'c'; 40])).await.unwrap();

        assert!(cache.get("s", "k1").await.unwrap().is_none());
        assert!(cache.get("s", "k2").await.unwrap().is_some());
        assert!(cache.get("s", "k3").await.unwrap().is_some());

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.used_bytes, 80);
    }

    #[tokio::test]
    async fn purge_all_and_by_slug() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::open(dir.path(), 3600, 1024 * 1024).unwrap();

        cache.set("alpha", "k1", &response(b"a")).await.unwrap();
        cache.set("beta", "k2", &response(b"b")).await.unwrap();

        assert_eq!(cache.purge_by_slug("alpha").await.unwrap(), 1);
        assert!(cache.get("alpha", "k1").await.unwrap().is_none());
        assert!(cache.get("beta", "k2").await.unwrap().is_some());

        assert_eq!(cache.purge_all().await.unwrap(), 1);
        let stats = cache.stats().await.unwrap();
        assert_eq!(
            stats,
            CacheStats {
                entries: 0,
                used_bytes: 0
            }
        );
    }
}

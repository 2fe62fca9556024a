//! # 白名单存储
//!
//! 内存快照 + 磁盘JSON。写入采用临时文件+原子重命名；
//! `reload` 一步替换快照指针，读取方可能看到任一先前快照。

use super::{AllowlistEntry, AllowlistFile, AllowlistPatch, normalize_host};
use crate::error::{ProxyError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};
use url::Url;

/// 白名单存储
pub struct AllowlistStore {
    path: PathBuf,
    snapshot: RwLock<Arc<Vec<AllowlistEntry>>>,
}

impl AllowlistStore {
    /// 从磁盘装载；文件不存在时以空列表启动
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = read_entries(&path)?;
        info!(
            path = %path.display(),
            entries = entries.len(),
            "白名单已装载"
        );
        Ok(Self {
            path,
            snapshot: RwLock::new(Arc::new(entries)),
        })
    }

    fn current(&self) -> Arc<Vec<AllowlistEntry>> {
        self.snapshot
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn replace(&self, entries: Vec<AllowlistEntry>) {
        *self
            .snapshot
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Arc::new(entries);
    }

    /// 所有规则
    #[must_use]
    pub fn list(&self) -> Vec<AllowlistEntry> {
        self.current().as_ref().clone()
    }

    /// 按id查找
    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<AllowlistEntry> {
        self.current().iter().find(|e| e.id == id).cloned()
    }

    /// 新增或整体替换一条规则
    ///
    /// host 归一化；schemes 为空时缺省为 `["https"]`。
    pub fn upsert(&self, mut entry: AllowlistEntry) -> Result<AllowlistEntry> {
        entry.host = normalize_host(&entry.host);
        if entry.host.is_empty() {
            return Err(ProxyError::invalid_body("host 不能为空"));
        }
        if entry.id.trim().is_empty() {
            entry.id = entry.host.replace('.', "-");
        }
        entry.schemes = sanitize_schemes(entry.schemes)?;

        let mut entries = self.current().as_ref().clone();
        match entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry.clone(),
            None => entries.push(entry.clone()),
        }
        self.persist_and_swap(entries)?;
        Ok(entry)
    }

    /// 部分更新一条规则
    pub fn patch(&self, id: &str, patch: AllowlistPatch) -> Result<AllowlistEntry> {
        let mut entries = self.current().as_ref().clone();
        let Some(existing) = entries.iter_mut().find(|e| e.id == id) else {
            return Err(ProxyError::not_found(format!("白名单规则 {id}")));
        };

        if let Some(host) = patch.host {
            let host = normalize_host(&host);
            if host.is_empty() {
                return Err(ProxyError::invalid_body("host 不能为空"));
            }
            existing.host = host;
        }
        if let Some(allow_subdomains) = patch.allow_subdomains {
            existing.allow_subdomains = allow_subdomains;
        }
        if let Some(schemes) = patch.schemes {
            existing.schemes = sanitize_schemes(schemes)?;
        }
        if let Some(enabled) = patch.enabled {
            existing.enabled = enabled;
        }
        if let Some(label) = patch.label {
            existing.label = if label.is_empty() { None } else { Some(label) };
        }

        let updated = existing.clone();
        self.persist_and_swap(entries)?;
        Ok(updated)
    }

    /// 删除一条规则，返回是否存在
    pub fn remove(&self, id: &str) -> Result<bool> {
        let mut entries = self.current().as_ref().clone();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        if entries.len() == before {
            return Ok(false);
        }
        self.persist_and_swap(entries)?;
        Ok(true)
    }

    /// 重新从磁盘读取，返回装载的规则数
    pub fn reload(&self) -> Result<usize> {
        let entries = read_entries(&self.path)?;
        let count = entries.len();
        self.replace(entries);
        info!(entries = count, "白名单已重载");
        Ok(count)
    }

    /// 匹配URL，返回命中的规则
    #[must_use]
    pub fn match_url(&self, url: &Url) -> Option<AllowlistEntry> {
        let host = url.host_str()?.to_ascii_lowercase();
        let scheme = url.scheme();
        self.current()
            .iter()
            .find(|e| e.matches(scheme, &host))
            .cloned()
    }

    /// URL是否被允许
    #[must_use]
    pub fn is_allowed(&self, url: &Url) -> bool {
        self.match_url(url).is_some()
    }

    /// 先落盘再替换快照，保证磁盘与内存一致
    fn persist_and_swap(&self, entries: Vec<AllowlistEntry>) -> Result<()> {
        persist_atomic(&self.path, &entries)?;
        self.replace(entries);
        Ok(())
    }
}

fn read_entries(path: &Path) -> Result<Vec<AllowlistEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path)?;
    let file: AllowlistFile = serde_json::from_str(&raw).map_err(|e| {
        ProxyError::config_with_source(format!("白名单文件解析失败: {}", path.display()), e)
    })?;
    let mut entries = file.entries;
    for entry in &mut entries {
        entry.host = normalize_host(&entry.host);
        if entry.schemes.is_empty() {
            entry.schemes = vec!["https".to_string()];
        }
    }
    Ok(entries)
}

/// 写临时文件后原子重命名
fn persist_atomic(path: &Path, entries: &[AllowlistEntry]) -> Result<()> {
    let file = AllowlistFile {
        version: 1,
        entries: entries.to_vec(),
    };
    let json = serde_json::to_string_pretty(&file)?;

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dir
        && !dir.exists()
    {
        std::fs::create_dir_all(dir)?;
    }

    let mut tmp = tempfile::NamedTempFile::new_in(dir.unwrap_or_else(|| Path::new(".")))?;
    tmp.write_all(json.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| {
        warn!(path = %path.display(), "白名单落盘失败");
        ProxyError::internal_with_source("白名单文件写入失败", e.error)
    })?;
    Ok(())
}

fn sanitize_schemes(schemes: Vec<String>) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    for scheme in schemes {
        let scheme = scheme.trim().to_ascii_lowercase();
        if scheme.is_empty() {
            continue;
        }
        if scheme != "https" && scheme != "http" {
            return Err(ProxyError::invalid_body(format!(
                "不支持的scheme: {scheme}"
            )));
        }
        if !out.contains(&scheme) {
            out.push(scheme);
        }
    }
    if out.is_empty() {
        out.push("https".to_string());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> AllowlistStore {
        AllowlistStore::load(dir.path().join("allowlist.json")).unwrap()
    }

    fn entry(host: &str) -> AllowlistEntry {
        AllowlistEntry {
            id: String::new(),
            host: host.to_string(),
            allow_subdomains: false,
            schemes: Vec::new(),
            enabled: true,
            label: None,
        }
    }

    #[test]
    fn upsert_defaults_and_persists() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let saved = store.upsert(entry("Example.COM")).unwrap();
        assert_eq!(saved.id, "example-com");
        assert_eq!(saved.host, "example.com");
        assert_eq!(saved.schemes, vec!["https"]);

        // 磁盘文档可独立重新装载
        let reopened = store_in(&dir);
        assert_eq!(reopened.list().len(), 1);
        assert_eq!(reopened.list()[0].host, "example.com");
    }

    #[test]
    fn match_url_honors_scheme_and_subdomains() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut e = entry("example.com");
        e.allow_subdomains = true;
        store.upsert(e).unwrap();

        assert!(store.is_allowed(&Url::parse("https://example.com/x").unwrap()));
        assert!(store.is_allowed(&Url::parse("https://a.example.com/").unwrap()));
        assert!(!store.is_allowed(&Url::parse("http://example.com/").unwrap()));
        assert!(!store.is_allowed(&Url::parse("https://evilexample.com/").unwrap()));
    }

    #[test]
    fn patch_and_remove() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.upsert(entry("example.com")).unwrap();

        let patched = store
            .patch(
                "example-com",
                AllowlistPatch {
                    enabled: Some(false),
                    ..AllowlistPatch::default()
                },
            )
            .unwrap();
        assert!(!patched.enabled);
        assert!(!store.is_allowed(&Url::parse("https://example.com/").unwrap()));

        assert!(store.remove("example-com").unwrap());
        assert!(!store.remove("example-com").unwrap());
        assert!(store.list().is_empty());
    }

    #[test]
    fn reload_reflects_external_edits() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("allowlist.json");
        let store = AllowlistStore::load(&path).unwrap();
        assert_eq!(store.list().len(), 0);

        std::fs::write(
            &path,
            r#"{"version":1,"entries":[{"id":"blocked-test","host":"blocked.test","enabled":false}]}"#,
        )
        .unwrap();
        assert_eq!(store.reload().unwrap(), 1);
        let entry = store.get_by_id("blocked-test").unwrap();
        assert!(!entry.enabled);
        assert_eq!(entry.schemes, vec!["https"]);
    }

    #[test]
    fn rejects_unknown_scheme() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut e = entry("example.com");
        e.schemes = vec!["gopher".to_string()];
        assert!(store.upsert(e).is_err());
    }
}

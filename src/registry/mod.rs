//! # 镜像注册模块
//!
//! slug ↔ 目标origin 的映射与分配，以及只追加的事件日志。
//! 创建路径持有单写锁，保证同一 targetOrigin 并发解析时至多创建一条记录。

mod slug;

use crate::allowlist::AllowlistStore;
use crate::error::{ProxyError, Result};
use crate::guard;
use chrono::Utc;
use entity::{events, mirrors};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use serde_json::{Value, json};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use url::Url;

pub use slug::base_slug;

/// slug 数字后缀的尝试上限
const SLUG_SUFFIX_MAX: u32 = 999;

/// 解析操作的结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveOutcome {
    pub slug: String,
    pub target_origin: String,
    pub launch_url: String,
    pub created: bool,
}

/// 镜像注册表
pub struct MirrorRegistry {
    db: Arc<DatabaseConnection>,
    allowlist: Arc<AllowlistStore>,
    enable_http: bool,
    log_file: Option<PathBuf>,
    /// 序列化创建路径，防止同一 origin 并发建出多条记录
    create_lock: tokio::sync::Mutex<()>,
}

impl MirrorRegistry {
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        allowlist: Arc<AllowlistStore>,
        enable_http: bool,
        log_file: Option<PathBuf>,
    ) -> Self {
        Self {
            db,
            allowlist,
            enable_http,
            log_file,
            create_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// 解析目标URL：校验 → 查找或创建镜像记录 → 生成 launch URL
    ///
    /// 成功记 `resolve` 事件，失败记 `resolve-fail` 事件。
    pub async fn resolve_target_url(&self, raw_url: &str) -> Result<ResolveOutcome> {
        match self.resolve_inner(raw_url).await {
            Ok(outcome) => {
                self.record_event(
                    "info",
                    "resolve",
                    Some(&outcome.slug),
                    &format!("解析 {} -> {}", raw_url, outcome.launch_url),
                    Some(json!({ "url": raw_url, "created": outcome.created })),
                )
                .await;
                Ok(outcome)
            }
            Err(e) => {
                self.record_event(
                    "warn",
                    "resolve-fail",
                    None,
                    &e.to_string(),
                    Some(json!({ "url": raw_url, "error": e.kind() })),
                )
                .await;
                Err(e)
            }
        }
    }

    async fn resolve_inner(&self, raw_url: &str) -> Result<ResolveOutcome> {
        let url = Url::parse(raw_url.trim())
            .map_err(|e| ProxyError::invalid_url(format!("{raw_url}: {e}")))?;

        guard::assert_safe_url(&url, self.enable_http).await?;

        if self.allowlist.match_url(&url).is_none() {
            return Err(ProxyError::domain_not_allowed(
                url.host_str().unwrap_or_default().to_string(),
            ));
        }

        let target_origin = url.origin().ascii_serialization();
        let launch_path = launch_path_of(&url);
        let last_path = (!launch_path.is_empty()).then(|| launch_path.clone());

        // 创建路径单写锁（见并发模型：允许写锁或事务二选一）
        let _guard = self.create_lock.lock().await;

        let existing = mirrors::Entity::find()
            .filter(mirrors::Column::TargetOrigin.eq(&target_origin))
            .filter(mirrors::Column::Disabled.eq(false))
            .one(self.db.as_ref())
            .await?;

        if let Some(record) = existing {
            self.touch(record.id, last_path).await?;
            return Ok(ResolveOutcome {
                launch_url: format!("/m/{}{launch_path}", record.slug),
                slug: record.slug,
                target_origin,
                created: false,
            });
        }

        let host = url.host_str().unwrap_or_default();
        let slug = self.allocate_slug(host).await?;
        let now = Utc::now();
        mirrors::ActiveModel {
            slug: Set(slug.clone()),
            target_origin: Set(target_origin.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            last_path: Set(last_path),
            disabled: Set(false),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await?;

        Ok(ResolveOutcome {
            launch_url: format!("/m/{slug}{launch_path}"),
            slug,
            target_origin,
            created: true,
        })
    }

    /// 分配唯一slug：主干 → `-2`…`-999` → 随机hex后缀
    async fn allocate_slug(&self, host: &str) -> Result<String> {
        let base = base_slug(host);
        if self.find_by_slug(&base).await?.is_none() {
            return Ok(base);
        }
        for n in 2..=SLUG_SUFFIX_MAX {
            let candidate = format!("{base}-{n}");
            if self.find_by_slug(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        let suffix: u32 = rand::random::<u32>() & 0x00ff_ffff;
        Ok(format!("{base}-{suffix:06x}"))
    }

    /// 按slug查找
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<mirrors::Model>> {
        Ok(mirrors::Entity::find()
            .filter(mirrors::Column::Slug.eq(slug))
            .one(self.db.as_ref())
            .await?)
    }

    /// 更新 lastPath 与 updatedAt
    pub async fn touch(&self, id: i32, last_path: Option<String>) -> Result<()> {
        let mut model = mirrors::ActiveModel {
            id: Set(id),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        if let Some(path) = last_path.filter(|p| !p.is_empty()) {
            model.last_path = Set(Some(path));
        }
        model.update(self.db.as_ref()).await?;
        Ok(())
    }

    /// 所有镜像记录（按创建时间倒序）
    pub async fn list_mirrors(&self) -> Result<Vec<mirrors::Model>> {
        Ok(mirrors::Entity::find()
            .order_by_desc(mirrors::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?)
    }

    /// 镜像记录总数
    pub async fn count_mirrors(&self) -> Result<u64> {
        Ok(mirrors::Entity::find().count(self.db.as_ref()).await?)
    }

    /// 切换镜像的停用状态
    pub async fn set_disabled(&self, slug: &str, disabled: bool) -> Result<mirrors::Model> {
        let Some(record) = self.find_by_slug(slug).await? else {
            return Err(ProxyError::mirror_not_found(slug.to_string()));
        };
        let mut model: mirrors::ActiveModel = record.into();
        model.disabled = Set(disabled);
        model.updated_at = Set(Utc::now());
        Ok(model.update(self.db.as_ref()).await?)
    }

    /// 查询最近事件（按id倒序）
    pub async fn recent_events(
        &self,
        limit: u64,
        kind: Option<&str>,
        slug: Option<&str>,
    ) -> Result<Vec<events::Model>> {
        let mut query = events::Entity::find().order_by_desc(events::Column::Id);
        if let Some(kind) = kind {
            query = query.filter(events::Column::Kind.eq(kind));
        }
        if let Some(slug) = slug {
            query = query.filter(events::Column::Slug.eq(slug));
        }
        Ok(query.limit(limit).all(self.db.as_ref()).await?)
    }

    /// 追加一条审计事件
    ///
    /// 事件写入失败不影响请求本身，只记警告；
    /// 配置了 `MIRROR_LOG_FILE` 时同步追加JSON行。
    pub async fn record_event(
        &self,
        level: &str,
        kind: &str,
        slug: Option<&str>,
        message: &str,
        meta: Option<Value>,
    ) {
        let now = Utc::now();
        let meta_json = meta.as_ref().map(Value::to_string);

        let insert = events::ActiveModel {
            at: Set(now),
            level: Set(level.to_string()),
            kind: Set(kind.to_string()),
            slug: Set(slug.map(ToString::to_string)),
            message: Set(message.to_string()),
            meta_json: Set(meta_json),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await;

        if let Err(e) = insert {
            warn!(kind = kind, error = %e, "事件写入失败");
        }

        if let Some(path) = &self.log_file {
            let line = json!({
                "at": now.to_rfc3339(),
                "level": level,
                "kind": kind,
                "slug": slug,
                "message": message,
                "meta": meta,
            });
            let appended = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .and_then(|mut f| writeln!(f, "{line}"));
            if let Err(e) = appended {
                warn!(path = %path.display(), error = %e, "事件日志文件写入失败");
            }
        }
    }
}

/// launch URL 的路径部分：pathname（为 `/` 时省略）+ search
fn launch_path_of(url: &Url) -> String {
    let path = url.path();
    let search = url.query().map(|q| format!("?{q}")).unwrap_or_default();
    if path == "/" {
        search
    } else {
        format!("{path}{search}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_path_omits_bare_root() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(launch_path_of(&url), "");
        let url = Url::parse("https://example.com/foo?q=1").unwrap();
        assert_eq!(launch_path_of(&url), "/foo?q=1");
        let url = Url::parse("https://example.com/?q=1").unwrap();
        assert_eq!(launch_path_of(&url), "?q=1");
    }
}

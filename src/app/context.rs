//! 应用上下文（DI 容器）
//!
//! 持有跨模块共享的服务实例（配置/数据库/缓存/白名单/注册表等），
//! 便于在测试中注入替身实现。

use crate::allowlist::AllowlistStore;
use crate::cache::FileCache;
use crate::config::AppConfig;
use crate::error::{ProxyError, Result};
use crate::registry::MirrorRegistry;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub database: Arc<DatabaseConnection>,
    pub cache: Arc<FileCache>,
    pub allowlist: Arc<AllowlistStore>,
    pub registry: Arc<MirrorRegistry>,
    pub http_client: reqwest::Client,
    /// 服务停用开关（管理端切换，请求路径只读）
    service_disabled: AtomicBool,
    started_at: Instant,
}

impl AppContext {
    /// 组装完整的应用上下文
    pub fn build(config: AppConfig, database: DatabaseConnection) -> Result<Self> {
        let config = Arc::new(config);
        let database = Arc::new(database);

        let cache = Arc::new(FileCache::open(
            &config.cache_dir,
            config.cache_ttl_seconds,
            config.cache_max_bytes,
        )?);
        let allowlist = Arc::new(AllowlistStore::load(&config.allowlist_path)?);
        let registry = Arc::new(MirrorRegistry::new(
            database.clone(),
            allowlist.clone(),
            config.enable_http,
            config.log_file.clone(),
        ));

        // 重定向手动跟随：每一跳都要重新过防护与白名单
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ProxyError::config_with_source("HTTP客户端初始化失败", e))?;

        Ok(Self {
            service_disabled: AtomicBool::new(config.disable_service),
            config,
            database,
            cache,
            allowlist,
            registry,
            http_client,
            started_at: Instant::now(),
        })
    }

    /// 服务是否处于停用状态
    #[must_use]
    pub fn is_service_disabled(&self) -> bool {
        self.service_disabled.load(Ordering::Relaxed)
    }

    /// 切换服务停用状态
    pub fn set_service_disabled(&self, disabled: bool) {
        self.service_disabled.store(disabled, Ordering::Relaxed);
    }

    /// 进程运行秒数
    #[must_use]
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

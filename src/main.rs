//! # Mirror Proxy
//!
//! 私有白名单网站镜像反向代理入口：
//! 装载配置 → 初始化数据库 → 组装上下文 → 启动HTTP服务。

use mirror_proxy::app::AppContext;
use mirror_proxy::management::MirrorServer;
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    mirror_proxy::logging::init_logging();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // 启动失败以非零码退出，交由进程管理器处理
            eprintln!("启动失败: {e}");
            tracing::error!(error = %e, "启动失败");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> mirror_proxy::Result<()> {
    let config = mirror_proxy::AppConfig::from_env()?;

    let db = mirror_proxy::database::init_database(&config.database_url())
        .await
        .map_err(|e| mirror_proxy::ProxyError::database_with_source("数据库初始化失败", e))?;
    mirror_proxy::database::run_migrations(&db)
        .await
        .map_err(|e| mirror_proxy::ProxyError::database_with_source("数据库迁移失败", e))?;

    let context = Arc::new(AppContext::build(config, db)?);

    MirrorServer::new(context).serve().await
}

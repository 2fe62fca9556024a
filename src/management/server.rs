//! # HTTP服务器
//!
//! Axum服务器：公共镜像路由 + 内部管理API，单端口监听。

use crate::app::AppContext;
use crate::error::{ProxyError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{linfo, lwarn};
use axum::Router;
use axum::http::HeaderValue;
use axum::response::Response;
use std::ops::Deref;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// 服务器应用状态
#[derive(Clone)]
pub struct AppState {
    context: Arc<AppContext>,
}

impl AppState {
    #[must_use]
    pub const fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    #[must_use]
    pub const fn context_arc(&self) -> &Arc<AppContext> {
        &self.context
    }
}

impl Deref for AppState {
    type Target = AppContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

/// 镜像代理服务器
pub struct MirrorServer {
    state: AppState,
    router: Router,
}

impl MirrorServer {
    /// 创建服务器并装配路由
    #[must_use]
    pub fn new(context: Arc<AppContext>) -> Self {
        let state = AppState::new(context);
        let router = Self::create_router(state.clone());
        Self { state, router }
    }

    fn create_router(state: AppState) -> Router {
        let cors = CorsLayer::new()
            .allow_methods(Any)
            .allow_headers(Any)
            .allow_origin(Any);

        super::routes::create_routes(state)
            .layer(axum::middleware::map_response(add_robots_header))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    /// 绑定端口并服务至收到停止信号
    pub async fn serve(self) -> Result<()> {
        let addr = self.state.config.bind_address();
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            ProxyError::config_with_source(format!("无法监听 {addr}"), e)
        })?;

        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::ServerSetup,
            "server_listen",
            &format!("镜像代理已监听 http://{addr}")
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ProxyError::internal_with_source("服务器异常退出", e))?;

        linfo!(
            "system",
            LogStage::Shutdown,
            LogComponent::ServerSetup,
            "server_stop",
            "镜像代理已停止"
        );
        Ok(())
    }
}

/// 所有出站响应都带 `x-robots-tag`（镜像响应已自带则保留原值）
async fn add_robots_header(mut response: Response) -> Response {
    response
        .headers_mut()
        .entry("x-robots-tag")
        .or_insert(HeaderValue::from_static("noindex, nofollow"));
    response
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        lwarn!(
            "system",
            LogStage::Shutdown,
            LogComponent::ServerSetup,
            "signal_error",
            &format!("停止信号监听失败: {e}")
        );
    }
}

//! # 统一日志工具模块
//!
//! 提供结构化日志宏与日志系统初始化：
//! - 业务日志按 request_id / stage / component / operation 四要素组织
//! - 初始化时压制 hyper / sqlx 等底层库的噪音输出

use crate::error::{ErrorCategory, ProxyError};
use std::env;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// 日志阶段枚举
#[derive(Debug, Clone, Copy)]
pub enum LogStage {
    Startup,
    Shutdown,
    Resolve,
    CacheRead,
    CacheWrite,
    UpstreamFetch,
    Rewrite,
    Response,
    ResponseFailure,
    Admin,
    Db,
    Internal,
}

impl LogStage {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Shutdown => "shutdown",
            Self::Resolve => "resolve",
            Self::CacheRead => "cache_read",
            Self::CacheWrite => "cache_write",
            Self::UpstreamFetch => "upstream_fetch",
            Self::Rewrite => "rewrite",
            Self::Response => "response",
            Self::ResponseFailure => "response_failure",
            Self::Admin => "admin",
            Self::Db => "db",
            Self::Internal => "internal",
        }
    }
}

/// 组件枚举
#[derive(Debug, Clone, Copy)]
pub enum LogComponent {
    Main,
    ServerSetup,
    Config,
    Database,
    Guard,
    Allowlist,
    Cache,
    Registry,
    Pipeline,
    HtmlRewriter,
    CssRewriter,
    Admin,
}

impl LogComponent {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::ServerSetup => "server_setup",
            Self::Config => "config",
            Self::Database => "database",
            Self::Guard => "guard",
            Self::Allowlist => "allowlist",
            Self::Cache => "cache",
            Self::Registry => "registry",
            Self::Pipeline => "pipeline",
            Self::HtmlRewriter => "html_rewriter",
            Self::CssRewriter => "css_rewriter",
            Self::Admin => "admin",
        }
    }
}

/// 标准日志宏 - 信息级别
#[macro_export]
macro_rules! linfo {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $description:expr, $($rest:tt)*) => {
        tracing::info!(
            request_id = %$request_id,
            stage = $stage.as_str(),
            operation = $operation,
            component = $component.as_str(),
            message = %$description,
            $($rest)*
        )
    };
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $description:expr) => {
        tracing::info!(
            request_id = %$request_id,
            stage = $stage.as_str(),
            operation = $operation,
            component = $component.as_str(),
            message = %$description,
        )
    };
}

/// 标准日志宏 - 调试级别
#[macro_export]
macro_rules! ldebug {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $description:expr, $($rest:tt)*) => {
        tracing::debug!(
            request_id = %$request_id,
            stage = $stage.as_str(),
            operation = $operation,
            component = $component.as_str(),
            message = %$description,
            $($rest)*
        )
    };
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $description:expr) => {
        tracing::debug!(
            request_id = %$request_id,
            stage = $stage.as_str(),
            operation = $operation,
            component = $component.as_str(),
            message = %$description,
        )
    };
}

/// 标准日志宏 - 警告级别
#[macro_export]
macro_rules! lwarn {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $description:expr, $($rest:tt)*) => {
        tracing::warn!(
            request_id = %$request_id,
            stage = $stage.as_str(),
            operation = $operation,
            component = $component.as_str(),
            message = %$description,
            $($rest)*
        )
    };
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $description:expr) => {
        tracing::warn!(
            request_id = %$request_id,
            stage = $stage.as_str(),
            operation = $operation,
            component = $component.as_str(),
            message = %$description,
        )
    };
}

/// 标准日志宏 - 错误级别
#[macro_export]
macro_rules! lerror {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $description:expr, $($rest:tt)*) => {
        tracing::error!(
            request_id = %$request_id,
            stage = $stage.as_str(),
            operation = $operation,
            component = $component.as_str(),
            message = %$description,
            $($rest)*
        )
    };
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $description:expr) => {
        tracing::error!(
            request_id = %$request_id,
            stage = $stage.as_str(),
            operation = $operation,
            component = $component.as_str(),
            message = %$description,
        )
    };
}

/// 统一记录 `ProxyError` 的辅助函数：客户端错误记 warn，服务端错误记 error
pub fn log_proxy_error(
    request_id: &str,
    stage: LogStage,
    component: LogComponent,
    operation: &str,
    message: &str,
    error: &ProxyError,
) {
    let status_code = error.status_code().as_u16();
    let kind = error.kind();
    let error_message = error.to_string();

    match error.category() {
        ErrorCategory::Client => {
            lwarn!(
                request_id,
                stage,
                component,
                operation,
                message,
                error_kind = %kind,
                error_message = %error_message,
                status_code = status_code
            );
        }
        ErrorCategory::Server => {
            lerror!(
                request_id,
                stage,
                component,
                operation,
                message,
                error_kind = %kind,
                error_message = %error_message,
                status_code = status_code
            );
        }
    }
}

/// 初始化日志系统
///
/// 过滤器优先级：`RUST_LOG` 环境变量 > 内置默认值。
pub fn init_logging() {
    let default_filter =
        "info,mirror_proxy=debug,sqlx=warn,sea_orm=warn,hyper=warn,reqwest=warn,h2=warn";

    let log_filter = env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());

    let env_filter = EnvFilter::try_new(&log_filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Main,
        "log_init",
        &format!("日志系统已启动 | 过滤器: {log_filter}")
    );
}

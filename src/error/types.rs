//! # 错误类型定义
//!
//! 错误标识（`kind`）是对外 API 契约的一部分，映射关系见 `status_code`。

use axum::http::StatusCode;
use thiserror::Error;

/// 错误归属：客户端错误记 warn，服务端错误记 error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Client,
    Server,
}

/// 应用主要错误类型
#[derive(Debug, Error)]
pub enum ProxyError {
    /// URL 无法解析
    #[error("无效URL: {message}")]
    InvalidUrl { message: String },

    /// 非 http/https，或 http 未被允许
    #[error("无效scheme: {message}")]
    InvalidScheme { message: String },

    /// 请求体无法解析
    #[error("无效请求体: {message}")]
    InvalidBody { message: String },

    /// 请求体缺少 url 字段
    #[error("缺少url参数")]
    MissingUrl,

    /// URL 携带用户名或密码
    #[error("URL不允许携带凭据: {message}")]
    CredentialsNotAllowed { message: String },

    /// 内部令牌校验失败
    #[error("未授权: {message}")]
    Unauthorized { message: String },

    /// 主机不在白名单内
    #[error("域名未被允许: {message}")]
    DomainNotAllowed { message: String },

    /// SSRF防护拦截
    #[error("SSRF拦截: {message}")]
    SsrfBlocked { message: String },

    /// slug 未注册或已停用
    #[error("镜像不存在: {message}")]
    MirrorNotFound { message: String },

    /// 通用资源未找到
    #[error("资源不存在: {message}")]
    NotFound { message: String },

    /// 仅支持 GET / HEAD
    #[error("方法不允许: {message}")]
    MethodNotAllowed { message: String },

    /// HTML响应超过大小限制
    #[error("HTML过大: {size} 字节，上限 {limit}")]
    HtmlTooLarge { size: usize, limit: usize },

    /// 非HTML响应超过大小限制
    #[error("响应体过大: {size} 字节，上限 {limit}")]
    BinaryTooLarge { size: usize, limit: usize },

    /// 速率限制（由前置网关触发，此处仅保留映射）
    #[error("请求过于频繁")]
    RateLimited,

    /// 服务被管理端停用
    #[error("服务已停用")]
    ServiceDisabled,

    /// 重定向链超过上限
    #[error("重定向次数过多: {hops} 跳")]
    TooManyRedirects { hops: u32 },

    /// DNS解析失败
    #[error("DNS解析失败: {message}")]
    DnsResolutionFailed {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 上游请求超时
    #[error("上游超时: {message} ({timeout_ms}ms)")]
    UpstreamTimeout {
        message: String,
        timeout_ms: u64,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 其他上游/代理失败
    #[error("网关错误: {message}")]
    BadGateway {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 配置相关错误
    #[error("配置错误: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 数据库相关错误
    #[error("数据库错误: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 缓存相关错误
    #[error("缓存错误: {message}")]
    Cache {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// IO相关错误
    #[error("IO错误: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// 序列化/反序列化错误
    #[error("序列化错误: {message}")]
    Serialization {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    /// 系统内部错误
    #[error("内部错误: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl ProxyError {
    /// 对外错误标识（snake_case，随响应体返回）
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUrl { .. } => "invalid_url",
            Self::InvalidScheme { .. } => "invalid_scheme",
            Self::InvalidBody { .. } => "invalid_body",
            Self::MissingUrl => "missing_url",
            Self::CredentialsNotAllowed { .. } => "credentials_not_allowed",
            Self::Unauthorized { .. } => "unauthorized",
            Self::DomainNotAllowed { .. } => "domain_not_allowed",
            Self::SsrfBlocked { .. } => "ssrf_blocked",
            Self::MirrorNotFound { .. } => "mirror_not_found",
            Self::NotFound { .. } => "not_found",
            Self::MethodNotAllowed { .. } => "method_not_allowed",
            Self::HtmlTooLarge { .. } => "html_too_large",
            Self::BinaryTooLarge { .. } => "binary_too_large",
            Self::RateLimited => "rate_limited",
            Self::ServiceDisabled => "service_disabled",
            Self::TooManyRedirects { .. } => "too_many_redirects",
            Self::DnsResolutionFailed { .. } => "dns_resolution_failed",
            Self::UpstreamTimeout { .. } => "upstream_timeout",
            Self::BadGateway { .. } => "bad_gateway",
            Self::Config { .. }
            | Self::Database { .. }
            | Self::Cache { .. }
            | Self::Io { .. }
            | Self::Serialization { .. }
            | Self::Internal { .. } => "internal_error",
        }
    }

    /// 映射HTTP状态码
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidUrl { .. }
            | Self::InvalidScheme { .. }
            | Self::InvalidBody { .. }
            | Self::MissingUrl
            | Self::CredentialsNotAllowed { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::DomainNotAllowed { .. } | Self::SsrfBlocked { .. } => StatusCode::FORBIDDEN,
            Self::MirrorNotFound { .. } | Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::HtmlTooLarge { .. } | Self::BinaryTooLarge { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::ServiceDisabled => StatusCode::SERVICE_UNAVAILABLE,
            Self::TooManyRedirects { .. }
            | Self::DnsResolutionFailed { .. }
            | Self::UpstreamTimeout { .. }
            | Self::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            Self::Config { .. }
            | Self::Database { .. }
            | Self::Cache { .. }
            | Self::Io { .. }
            | Self::Serialization { .. }
            | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 错误归属分类
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        if self.status_code().as_u16() < 500 {
            ErrorCategory::Client
        } else {
            ErrorCategory::Server
        }
    }

    /// 代理失败对应的事件类型（见事件日志 kind 取值）
    #[must_use]
    pub const fn event_kind(&self) -> &'static str {
        match self {
            Self::SsrfBlocked { .. } => "ssrf-blocked",
            Self::UpstreamTimeout { .. } => "upstream-timeout",
            _ => "proxy-error",
        }
    }

    /// 创建无效URL错误
    pub fn invalid_url<T: Into<String>>(message: T) -> Self {
        Self::InvalidUrl {
            message: message.into(),
        }
    }

    /// 创建无效scheme错误
    pub fn invalid_scheme<T: Into<String>>(message: T) -> Self {
        Self::InvalidScheme {
            message: message.into(),
        }
    }

    /// 创建无效请求体错误
    pub fn invalid_body<T: Into<String>>(message: T) -> Self {
        Self::InvalidBody {
            message: message.into(),
        }
    }

    /// 创建凭据拦截错误
    pub fn credentials_not_allowed<T: Into<String>>(message: T) -> Self {
        Self::CredentialsNotAllowed {
            message: message.into(),
        }
    }

    /// 创建未授权错误
    pub fn unauthorized<T: Into<String>>(message: T) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// 创建白名单拦截错误
    pub fn domain_not_allowed<T: Into<String>>(message: T) -> Self {
        Self::DomainNotAllowed {
            message: message.into(),
        }
    }

    /// 创建SSRF拦截错误
    pub fn ssrf_blocked<T: Into<String>>(message: T) -> Self {
        Self::SsrfBlocked {
            message: message.into(),
        }
    }

    /// 创建镜像未找到错误
    pub fn mirror_not_found<T: Into<String>>(message: T) -> Self {
        Self::MirrorNotFound {
            message: message.into(),
        }
    }

    /// 创建资源未找到错误
    pub fn not_found<T: Into<String>>(message: T) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// 创建方法不允许错误
    pub fn method_not_allowed<T: Into<String>>(message: T) -> Self {
        Self::MethodNotAllowed {
            message: message.into(),
        }
    }

    /// 创建重定向超限错误
    #[must_use]
    pub const fn too_many_redirects(hops: u32) -> Self {
        Self::TooManyRedirects { hops }
    }

    /// 创建DNS解析失败错误
    pub fn dns_resolution_failed<T: Into<String>>(message: T) -> Self {
        Self::DnsResolutionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的DNS解析失败错误
    pub fn dns_resolution_failed_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::DnsResolutionFailed {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建上游超时错误
    pub fn upstream_timeout<T: Into<String>>(message: T, timeout_ms: u64) -> Self {
        Self::UpstreamTimeout {
            message: message.into(),
            timeout_ms,
            source: None,
        }
    }

    /// 创建带来源的上游超时错误
    pub fn upstream_timeout_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        timeout_ms: u64,
        source: E,
    ) -> Self {
        Self::UpstreamTimeout {
            message: message.into(),
            timeout_ms,
            source: Some(source.into()),
        }
    }

    /// 创建网关错误
    pub fn bad_gateway<T: Into<String>>(message: T) -> Self {
        Self::BadGateway {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的网关错误
    pub fn bad_gateway_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::BadGateway {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建配置错误
    pub fn config<T: Into<String>>(message: T) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的配置错误
    pub fn config_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建数据库错误
    pub fn database<T: Into<String>>(message: T) -> Self {
        Self::Database {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的数据库错误
    pub fn database_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Database {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建缓存错误
    pub fn cache<T: Into<String>>(message: T) -> Self {
        Self::Cache {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的缓存错误
    pub fn cache_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Cache {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建内部错误
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的内部错误
    pub fn internal_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

// 自动转换常见错误类型
impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: "文件操作失败".to_string(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: "JSON处理失败".to_string(),
            source: err.into(),
        }
    }
}

impl From<sea_orm::error::DbErr> for ProxyError {
    fn from(err: sea_orm::error::DbErr) -> Self {
        Self::database_with_source("数据库操作失败", err)
    }
}

impl From<url::ParseError> for ProxyError {
    fn from(err: url::ParseError) -> Self {
        Self::invalid_url(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_http_status() {
        assert_eq!(
            ProxyError::ssrf_blocked("127.0.0.1").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ProxyError::ssrf_blocked("x").kind(), "ssrf_blocked");
        assert_eq!(
            ProxyError::too_many_redirects(6).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(ProxyError::internal("boom").kind(), "internal_error");
    }

    #[test]
    fn category_follows_status() {
        assert_eq!(ProxyError::MissingUrl.category(), ErrorCategory::Client);
        assert_eq!(
            ProxyError::bad_gateway("x").category(),
            ErrorCategory::Server
        );
    }

    #[test]
    fn event_kind_classification() {
        assert_eq!(ProxyError::ssrf_blocked("x").event_kind(), "ssrf-blocked");
        assert_eq!(
            ProxyError::upstream_timeout("x", 12000).event_kind(),
            "upstream-timeout"
        );
        assert_eq!(ProxyError::bad_gateway("x").event_kind(), "proxy-error");
    }
}

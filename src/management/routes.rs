//! # 路由配置
//!
//! 公共路由直接暴露（Basic Auth由前置反代负责）；
//! `/internal` 下的管理路由经内部令牌认证。

use crate::management::handlers;
use crate::management::middleware::internal_auth;
use crate::management::server::AppState;
use axum::Router;
use axum::middleware;
use axum::routing::{any, get, post, put};

/// 创建所有路由
pub fn create_routes(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::system::launcher))
        .route("/health", get(handlers::system::health))
        .route("/api/resolve", post(handlers::resolve::resolve))
        .route("/m/{slug}", any(handlers::mirror::mirror_root))
        .route("/m/{slug}/{*tail}", any(handlers::mirror::mirror_tail))
        .with_state(state.clone());

    let internal_routes = Router::new()
        .route(
            "/allowlist",
            get(handlers::allowlist::list).post(handlers::allowlist::create),
        )
        .route("/allowlist/reload", post(handlers::allowlist::reload))
        .route(
            "/allowlist/{id}",
            put(handlers::allowlist::upsert)
                .patch(handlers::allowlist::patch_entry)
                .delete(handlers::allowlist::remove),
        )
        .route("/cache/purge", post(handlers::cache::purge_all))
        .route("/cache/purge/{slug}", post(handlers::cache::purge_by_slug))
        .route("/service/disable", post(handlers::service::disable))
        .route("/service/enable", post(handlers::service::enable))
        .route("/summary", get(handlers::system::summary))
        .route("/logs", get(handlers::logs::list))
        .route("/mirrors", get(handlers::mirrors::list))
        .route("/mirrors/{slug}/disable", post(handlers::mirrors::disable))
        .route("/mirrors/{slug}/enable", post(handlers::mirrors::enable))
        .route("/resolve-test", post(handlers::resolve::resolve_test))
        .layer(middleware::from_fn_with_state(state.clone(), internal_auth))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .nest("/internal", internal_routes)
}

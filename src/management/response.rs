//! # API 响应结构
//!
//! 对外契约：成功 `{ok: true, …}`，失败 `{ok: false, error: <标识>}`。

use crate::error::ProxyError;
use axum::Json;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

/// 成功响应：在数据对象上合并 `ok: true`
pub fn ok_with(mut data: Value) -> Response {
    if let Some(map) = data.as_object_mut() {
        map.insert("ok".to_string(), Value::Bool(true));
    }
    Json(data).into_response()
}

/// 无附加数据的成功响应
pub fn ok_empty() -> Response {
    ok_with(json!({}))
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "ok": false,
            "error": self.kind(),
        }));
        (status, body).into_response()
    }
}

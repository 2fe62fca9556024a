//! # 系统处理器：launcher页、健康检查与概要信息

use crate::error::ProxyError;
use crate::management::response::ok_with;
use crate::management::server::AppState;
use axum::extract::State;
use axum::response::{Html, Response};
use serde_json::json;

/// 极简launcher页：提交URL换取镜像入口
const LAUNCHER_HTML: &str = r#"<!doctype html>
<html lang="zh">
<head>
<meta charset="utf-8">
<meta name="robots" content="noindex,nofollow">
<title>镜像代理</title>
<style>
body { font-family: system-ui, sans-serif; max-width: 40rem; margin: 4rem auto; padding: 0 1rem; }
input[type=url] { width: 100%; padding: .5rem; }
button { margin-top: .5rem; padding: .5rem 1.5rem; }
#result { margin-top: 1rem; word-break: break-all; }
</style>
</head>
<body>
<h1>镜像代理</h1>
<p>输入白名单内的站点URL，生成镜像入口。</p>
<form id="f">
  <input type="url" id="url" placeholder="https://example.com/" required>
  <button type="submit">生成镜像</button>
</form>
<div id="result"></div>
<script>
document.getElementById('f').addEventListener('submit', async (e) => {
  e.preventDefault();
  const r = document.getElementById('result');
  r.textContent = '…';
  const resp = await fetch('/api/resolve', {
    method: 'POST',
    headers: { 'content-type': 'application/json' },
    body: JSON.stringify({ url: document.getElementById('url').value }),
  });
  const data = await resp.json();
  if (data.ok) {
    r.innerHTML = '<a href="' + data.launchUrl + '">' + data.launchUrl + '</a>';
  } else {
    r.textContent = '失败: ' + data.error;
  }
});
</script>
</body>
</html>
"#;

/// `GET /` launcher页
pub async fn launcher() -> Html<&'static str> {
    Html(LAUNCHER_HTML)
}

/// `GET /health` 健康检查
pub async fn health(State(state): State<AppState>) -> Response {
    ok_with(json!({
        "serviceDisabled": state.is_service_disabled(),
        "uptimeSec": state.uptime_seconds(),
    }))
}

/// `GET /internal/summary` 运行概要
pub async fn summary(State(state): State<AppState>) -> Result<Response, ProxyError> {
    let mirrors = state.registry.count_mirrors().await?;
    let cache = state.cache.stats().await?;

    Ok(ok_with(json!({
        "mirrors": mirrors,
        "cache": cache,
        "serviceDisabled": state.is_service_disabled(),
        "uptimeSec": state.uptime_seconds(),
        "publicBaseUrl": state.config.public_base_url,
        "version": env!("CARGO_PKG_VERSION"),
    })))
}

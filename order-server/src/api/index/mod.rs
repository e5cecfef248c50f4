//! 首页
//!
//! `GET /` 返回 `{static_dir}/index.html`，一个按 id 查询订单的小页面。
//! 文件不存在时返回 404。

use axum::Router;
use std::path::Path;
use tower_http::services::ServeFile;

/// 首页路由 (无状态)
pub fn router(static_dir: &str) -> Router {
    let index = Path::new(static_dir).join("index.html");
    Router::new().route_service("/", ServeFile::new(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_serves_index_html() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>orders</h1>").unwrap();

        let app = router(&dir.path().to_string_lossy());
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"<h1>orders</h1>");
    }

    #[tokio::test]
    async fn test_missing_index_is_404() {
        let dir = tempfile::tempdir().unwrap();

        let app = router(&dir.path().to_string_lossy());
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

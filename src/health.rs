//! Liveness endpoint for host keep-alive checks.

use std::net::SocketAddr;

use axum::Router;
use axum::routing::get;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub fn router(family_name: &str) -> Router {
    let body = format!("{family_name} is up.");
    Router::new().route(
        "/",
        get(move || {
            let body = body.clone();
            async move { body }
        }),
    )
}

/// Serve `GET /` on all interfaces until `shutdown` is cancelled.
pub async fn serve(port: u16, family_name: &str, shutdown: CancellationToken) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("💓 Liveness endpoint on {}", addr);

    axum::serve(listener, router(family_name))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_root_says_up() {
        let response = router("Test Family")
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"Test Family is up.");
    }

    #[tokio::test]
    async fn test_other_paths_404() {
        let response = router("Test Family")
            .oneshot(Request::builder().uri("/admin").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

//! API Routes
//!
//! Configures the Axum routers for the peer endpoint and the front-end API.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{api_get_handler, health_handler, peer_get_handler, stats_handler, AppState};
use crate::group::Group;

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Creates the router peers talk to.
///
/// `base_path` must start and end with `/`, e.g. `/_peercache/`.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests for debugging
pub fn create_peer_router(state: AppState, base_path: &str) -> Router {
    let value_route = format!("{}:group/:key", base_path);

    Router::new()
        .route(&value_route, get(peer_get_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Creates the front-end router for a single group.
pub fn create_api_router(group: Arc<Group>) -> Router {
    Router::new()
        .route("/api", get(api_get_handler))
        .route("/health", get(health_handler))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EvictionPolicy;
    use crate::error::CacheError;
    use crate::group::{GetterFunc, GroupRegistry};
    use crate::peers::DEFAULT_BASE_PATH;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    fn test_registry() -> Arc<GroupRegistry> {
        let registry = Arc::new(GroupRegistry::new());
        registry.new_group(
            "scores",
            2 << 10,
            EvictionPolicy::Lfu,
            GetterFunc(|key: String| async move {
                match key.as_str() {
                    "Tom" => Ok(b"630".to_vec()),
                    _ => Err(CacheError::LoadFailed(format!("{} not exist", key))),
                }
            }),
        );
        registry
    }

    fn create_test_app() -> Router {
        create_peer_router(AppState::new(test_registry()), DEFAULT_BASE_PATH)
    }

    async fn get(app: Router, uri: &str) -> axum::response::Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = get(create_test_app(), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_peer_value_endpoint() {
        let response = get(create_test_app(), "/_peercache/scores/Tom").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_peer_value_not_found() {
        let response = get(create_test_app(), "/_peercache/scores/kkk").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = get(create_test_app(), "/_peercache/other/Tom").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_api_endpoint() {
        let group = test_registry().get("scores").unwrap();
        let app = create_api_router(group);

        let response = get(app.clone(), "/api?key=Tom").await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = get(app, "/api").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

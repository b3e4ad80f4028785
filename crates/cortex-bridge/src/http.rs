//! HTTP query surface
//!
//! Read-only REST view of the registry cache, plus optional static file
//! serving for the browser UI.
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /api/modules` | all modules, sorted by name |
//! | `GET /api/modules/:name/params` | parameters of one module (empty if unknown) |
//! | `GET /api/health` | `{"status": "ok", "modules": N, "clients": M}` |

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use cortex_core::{ModuleDescriptor, ParamDescriptor};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::broadcast::Broadcaster;
use crate::registry::Registry;

/// Options for [`router`]
#[derive(Debug, Clone, Default)]
pub struct HttpOptions {
    /// Permissive CORS
    pub cors: bool,
    /// Directory served for paths outside `/api`
    pub static_dir: Option<PathBuf>,
}

#[derive(Clone)]
struct AppState {
    registry: Arc<Registry>,
    broadcaster: Arc<Broadcaster>,
}

/// Build the HTTP router
pub fn router(
    registry: Arc<Registry>,
    broadcaster: Arc<Broadcaster>,
    options: &HttpOptions,
) -> Router {
    let state = AppState {
        registry,
        broadcaster,
    };

    let mut router = Router::new()
        .route("/api/modules", get(list_modules))
        .route("/api/modules/:name/params", get(module_params))
        .route("/api/health", get(health))
        .with_state(state);

    if let Some(dir) = &options.static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    if options.cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router.layer(TraceLayer::new_for_http())
}

/// Serve `router` on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("HTTP server listening on {}", addr);
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn list_modules(State(state): State<AppState>) -> Json<Vec<ModuleDescriptor>> {
    Json(state.registry.list_modules())
}

async fn module_params(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<Vec<ParamDescriptor>> {
    Json(state.registry.params_for(&name))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "modules": state.registry.module_count(),
        "clients": state.broadcaster.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_router() -> (Arc<Registry>, Router) {
        let registry = Arc::new(Registry::new());
        let router = router(
            registry.clone(),
            Arc::new(Broadcaster::new()),
            &HttpOptions::default(),
        );
        (registry, router)
    }

    #[tokio::test]
    async fn test_health() {
        let (_, router) = test_router();
        let response = router
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_without_static_dir() {
        let (_, router) = test_router();
        let response = router
            .oneshot(Request::get("/index.html").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

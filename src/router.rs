use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    middleware::{log_errors, rate_limit},
    routes,
};

// 只有记录访问的接口需要限流
fn hit_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/hit", post(routes::metrics::record_hit))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit,
        ))
}

fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(routes::metrics::get_stats))
        .route("/reset", get(routes::metrics::reset_stats))
        .route("/health", get(routes::metrics::health))
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(hit_routes(&state))
        .merge(stats_routes());

    let router = Router::new()
        .nest("/api", api)
        .layer(axum::middleware::from_fn(log_errors))
        .layer(TraceLayer::new_for_http());

    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    router.with_state(state)
}

//! HTTP routes. JSON endpoints live under `/api/`; stored attachments are served from `/files/`.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::AppState;
use crate::config::MAX_SUBMISSION_BYTES;

pub fn build_router(state: AppState) -> Router {
    // NOTE: Path params use `:param` syntax (axum 0.7).
    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/health/ai", get(endpoints::health::ai))
        .route(
            "/reports",
            post(endpoints::reports::submit).layer(DefaultBodyLimit::max(MAX_SUBMISSION_BYTES)),
        )
        .route("/reports/mine", get(endpoints::reports::mine))
        .route("/reports/:id", get(endpoints::reports::detail))
        .route("/admin/incidents", get(endpoints::admin::list))
        .route("/admin/incidents.csv", get(endpoints::admin::export_csv))
        .route(
            "/admin/incidents/:id/status",
            post(endpoints::admin::update_status),
        )
        .route("/admin/analytics", get(endpoints::admin::analytics));

    let files = ServeDir::new(state.blobs.root());

    Router::new()
        .nest("/api", api)
        .nest_service("/files", files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

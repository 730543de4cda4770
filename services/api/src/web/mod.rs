pub mod middleware;
pub mod rest;
pub mod state;

pub use middleware::require_auth;
pub use rest::{
    class_disabled_dates_handler, create_reservation_handler, disabled_dates_handler,
    disabled_time_slots_handler, list_reservations_handler, openapi_handler,
};

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use state::AppState;

/// Builds the HTTP router. Only booking requires a logged-in user; the calendar
/// views are public.
pub fn router(app_state: Arc<AppState>) -> Router {
    let create = post(create_reservation_handler).layer(axum_middleware::from_fn_with_state(
        app_state.clone(),
        require_auth,
    ));

    Router::new()
        .route("/reservations", get(list_reservations_handler).merge(create))
        .route("/reservations/disabled-dates", get(disabled_dates_handler))
        .route(
            "/reservations/disabled-time-slots",
            get(disabled_time_slots_handler),
        )
        .route(
            "/classes/{class_id}/disabled-dates",
            get(class_disabled_dates_handler),
        )
        .route("/api-docs/openapi.json", get(openapi_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

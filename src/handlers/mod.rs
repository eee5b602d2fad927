pub mod checkout;
pub mod purchases;
pub mod webhooks;

pub use checkout::*;
pub use purchases::*;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use serde::Serialize;

use crate::db::AppState;
use crate::extractors::Json;
use crate::middleware::user_auth;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Purchase API, mounted under `/api/v1/purchase`.
pub fn router(state: AppState) -> Router<AppState> {
    // Buyer/creator routes (bearer token auth)
    let user_routes = Router::new()
        .route("/checkout/create-checkout-session", post(create_checkout_session))
        .route(
            "/course/{course_id}/detail-with-status",
            get(get_course_detail_with_purchase_status),
        )
        .route("/", get(get_all_purchased_courses))
        .layer(middleware::from_fn_with_state(state, user_auth));

    user_routes.merge(webhooks::router())
}

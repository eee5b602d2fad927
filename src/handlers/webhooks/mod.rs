pub mod cashfree;
pub mod common;

pub use cashfree::handle_cashfree_webhook;

use axum::{Router, routing::post};

use crate::db::AppState;

/// Gateway callbacks. No user auth: requests are authenticated by signature.
pub fn router() -> Router<AppState> {
    Router::new().route("/cashfree-webhook", post(handle_cashfree_webhook))
}

mod from_row;
mod schema;
pub mod queries;

pub use schema::init_db;

use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::{CheckoutSettings, PurchasedPolicy};
use crate::payments::{PaymentGateway, WebhookVerifier};

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Creates hosted payment orders
    pub gateway: Arc<dyn PaymentGateway>,
    /// Authenticates incoming gateway webhooks
    pub webhook_verifier: Arc<dyn WebhookVerifier>,
    /// Fixed parts of every gateway order (currency, redirect and notify URLs)
    pub checkout: CheckoutSettings,
    pub purchased_policy: PurchasedPolicy,
    /// Mark all of a course's lectures as free preview when a purchase completes
    pub unlock_previews_on_purchase: bool,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
    });
    Pool::builder().max_size(10).build(manager)
}

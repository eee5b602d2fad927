mod cashfree;

pub use cashfree::*;

use async_trait::async_trait;
use axum::http::HeaderMap;
use rust_decimal::Decimal;

use crate::error::Result;

/// Everything the gateway needs to open a hosted payment page for one order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// Merchant order ID; the gateway echoes it back in webhooks
    pub order_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub customer_id: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub return_url: String,
    pub notify_url: String,
}

/// Outbound side of a payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Provider name for logging (e.g. "cashfree")
    fn provider_name(&self) -> &'static str;

    /// Create a hosted order. Returns the checkout session handle, or `None`
    /// if the provider accepted the request but issued no session.
    async fn create_order(&self, order: &NewOrder) -> Result<Option<String>>;
}

/// Authenticity check for incoming provider webhooks.
///
/// `Ok(false)` means the request is well-formed but not from the provider;
/// `Err` means the signature headers are missing or malformed.
pub trait WebhookVerifier: Send + Sync {
    fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<bool>;
}

/// Accepts every webhook. Only wired up in dev mode when verification is
/// explicitly switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipVerification;

impl WebhookVerifier for SkipVerification {
    fn verify(&self, _headers: &HeaderMap, _body: &[u8]) -> Result<bool> {
        Ok(true)
    }
}

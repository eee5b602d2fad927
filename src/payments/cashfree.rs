use async_trait::async_trait;
use axum::http::HeaderMap;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::CashfreeConfig;
use crate::error::{AppError, Result, msg};

use super::{NewOrder, PaymentGateway, WebhookVerifier};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-webhook-signature";
pub const TIMESTAMP_HEADER: &str = "x-webhook-timestamp";

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    order_id: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    order_amount: Decimal,
    order_currency: &'a str,
    customer_details: CustomerDetails<'a>,
    order_meta: OrderMeta<'a>,
}

#[derive(Debug, Serialize)]
struct CustomerDetails<'a> {
    customer_id: &'a str,
    customer_email: &'a str,
    customer_phone: &'a str,
}

#[derive(Debug, Serialize)]
struct OrderMeta<'a> {
    return_url: &'a str,
    notify_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateOrderResponse {
    #[serde(default)]
    payment_session_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CashfreeClient {
    client: Client,
    config: CashfreeConfig,
}

impl CashfreeClient {
    pub fn new(config: &CashfreeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn orders_url(&self) -> String {
        format!("{}/orders", self.config.base_url.trim_end_matches('/'))
    }

    /// Create a Cashfree order and return its `payment_session_id`.
    pub async fn create_order_session(&self, order: &NewOrder) -> Result<Option<String>> {
        let request = CreateOrderRequest {
            order_id: &order.order_id,
            order_amount: order.amount,
            order_currency: &order.currency,
            customer_details: CustomerDetails {
                customer_id: &order.customer_id,
                customer_email: &order.customer_email,
                customer_phone: &order.customer_phone,
            },
            order_meta: OrderMeta {
                return_url: &order.return_url,
                notify_url: &order.notify_url,
            },
        };

        let response = self
            .client
            .post(self.orders_url())
            .header("x-api-version", &self.config.api_version)
            .header("x-client-id", &self.config.client_id)
            .header("x-client-secret", &self.config.client_secret)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::PaymentSession(format!("Cashfree API error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::PaymentSession(format!(
                "Cashfree API error ({}): {}",
                status, error_text
            )));
        }

        let created: CreateOrderResponse = response.json().await.map_err(|e| {
            AppError::PaymentSession(format!("Failed to parse Cashfree response: {}", e))
        })?;

        Ok(created.payment_session_id.filter(|s| !s.is_empty()))
    }

    /// Maximum webhook age before it's rejected (seconds).
    const WEBHOOK_TIMESTAMP_TOLERANCE_SECS: i64 = 300;

    /// Verify a Cashfree webhook signature.
    ///
    /// Cashfree signs `timestamp + raw_body` with HMAC-SHA256 keyed by the client
    /// secret and sends the base64 digest. The timestamp is in milliseconds.
    pub fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature: &str,
        timestamp: &str,
    ) -> Result<bool> {
        let timestamp_ms: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| AppError::BadRequest(msg::INVALID_TIMESTAMP.into()))?;

        let age = chrono::Utc::now().timestamp() - timestamp_ms / 1000;

        if age > Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS {
            tracing::warn!(
                "Cashfree webhook rejected: timestamp too old (age={}s, max={}s)",
                age,
                Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS
            );
            return Ok(false);
        }

        // Clock skew tolerance: 60 seconds
        if age < -60 {
            tracing::warn!("Cashfree webhook rejected: timestamp in the future (age={}s)", age);
            return Ok(false);
        }

        let mut mac = HmacSha256::new_from_slice(self.config.client_secret.as_bytes())
            .map_err(|_| AppError::Internal(msg::INVALID_WEBHOOK_SECRET.into()))?;
        mac.update(timestamp.trim().as_bytes());
        mac.update(payload);
        let expected = BASE64.encode(mac.finalize().into_bytes());

        let expected_bytes = expected.as_bytes();
        let provided_bytes = signature.trim().as_bytes();

        // Digest length is public (44 base64 chars for SHA-256)
        if expected_bytes.len() != provided_bytes.len() {
            return Ok(false);
        }

        Ok(expected_bytes.ct_eq(provided_bytes).into())
    }
}

#[async_trait]
impl PaymentGateway for CashfreeClient {
    fn provider_name(&self) -> &'static str {
        "cashfree"
    }

    async fn create_order(&self, order: &NewOrder) -> Result<Option<String>> {
        self.create_order_session(order).await
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str> {
    headers
        .get(name)
        .ok_or_else(|| AppError::BadRequest(msg::MISSING_SIGNATURE.into()))?
        .to_str()
        .map_err(|e| {
            tracing::debug!("Invalid UTF-8 in {} header: {}", name, e);
            AppError::BadRequest(msg::INVALID_SIGNATURE_HEADER.into())
        })
}

impl WebhookVerifier for CashfreeClient {
    fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<bool> {
        let signature = header_str(headers, SIGNATURE_HEADER)?;
        let timestamp = header_str(headers, TIMESTAMP_HEADER)?;
        self.verify_webhook_signature(body, signature, timestamp)
    }
}

// ============ Webhook payload ============
//
// Every field is optional so a malformed payload surfaces as a validation
// error rather than a deserialization failure.

#[derive(Debug, Default, Deserialize)]
pub struct CashfreeWebhookEvent {
    #[serde(default)]
    pub data: Option<CashfreeWebhookData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CashfreeWebhookData {
    #[serde(default)]
    pub order: Option<CashfreeWebhookOrder>,
    #[serde(default)]
    pub payment: Option<CashfreeWebhookPayment>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CashfreeWebhookOrder {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub order_amount: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CashfreeWebhookPayment {
    #[serde(default)]
    pub payment_status: Option<String>,
    /// Sent as a number by Cashfree; strings are accepted too.
    #[serde(default)]
    pub cf_payment_id: Option<serde_json::Value>,
}

impl CashfreeWebhookPayment {
    pub fn cf_payment_id(&self) -> Option<String> {
        match self.cf_payment_id.as_ref()? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cf_payment_id_accepts_number_or_string() {
        let payment: CashfreeWebhookPayment =
            serde_json::from_str(r#"{"payment_status":"SUCCESS","cf_payment_id":5114910611}"#).unwrap();
        assert_eq!(payment.cf_payment_id().as_deref(), Some("5114910611"));

        let payment: CashfreeWebhookPayment =
            serde_json::from_str(r#"{"payment_status":"SUCCESS","cf_payment_id":"cf1"}"#).unwrap();
        assert_eq!(payment.cf_payment_id().as_deref(), Some("cf1"));

        let payment: CashfreeWebhookPayment =
            serde_json::from_str(r#"{"payment_status":"SUCCESS","cf_payment_id":""}"#).unwrap();
        assert_eq!(payment.cf_payment_id(), None);
    }

    #[test]
    fn order_amount_parses_from_number() {
        let order: CashfreeWebhookOrder =
            serde_json::from_str(r#"{"order_id":"order_1","order_amount":499.5}"#).unwrap();
        assert_eq!(order.order_amount, Some(Decimal::new(4995, 1)));
    }

    #[test]
    fn create_order_request_shape() {
        let request = CreateOrderRequest {
            order_id: "order_1",
            order_amount: Decimal::new(499, 0),
            order_currency: "INR",
            customer_details: CustomerDetails {
                customer_id: "usr_1",
                customer_email: "buyer@example.com",
                customer_phone: "9999999999",
            },
            order_meta: OrderMeta {
                return_url: "http://localhost:5173/course-progress/crs_1",
                notify_url: "http://localhost:8080/api/v1/purchase/cashfree-webhook",
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["order_amount"], serde_json::json!(499.0));
        assert_eq!(json["customer_details"]["customer_phone"], "9999999999");
        assert_eq!(json["order_meta"]["return_url"], "http://localhost:5173/course-progress/crs_1");
    }
}

use axum::{body::Bytes, extract::State, http::HeaderMap};
use serde::Serialize;

use crate::db::AppState;
use crate::error::{AppError, Result, msg};
use crate::extractors::Json;
use crate::payments::CashfreeWebhookEvent;

use super::common::{GatewayPaymentStatus, PaymentNotification, ReconcileOutcome, reconcile_payment};

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub success: bool,
    pub message: &'static str,
}

impl WebhookAck {
    fn received() -> Self {
        Self {
            success: true,
            message: "Webhook received",
        }
    }
}

/// Pull the fields reconciliation needs out of a Cashfree webhook body.
///
/// `order_id`, `payment_status` and `cf_payment_id` are required;
/// `order_amount` is optional.
pub fn parse_notification(body: &[u8]) -> Result<PaymentNotification> {
    let event: CashfreeWebhookEvent = serde_json::from_slice(body).map_err(|e| {
        tracing::warn!("Cashfree webhook: unparseable body: {}", e);
        AppError::InvalidPayload(msg::INVALID_WEBHOOK_PAYLOAD.into())
    })?;

    let invalid = || AppError::InvalidPayload(msg::INVALID_WEBHOOK_PAYLOAD.into());

    let data = event.data.ok_or_else(invalid)?;
    let order = data.order.ok_or_else(invalid)?;
    let payment = data.payment.ok_or_else(invalid)?;

    let order_id = order.order_id.filter(|s| !s.is_empty()).ok_or_else(invalid)?;
    let gateway_payment_id = payment.cf_payment_id().ok_or_else(invalid)?;
    let status = payment
        .payment_status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(GatewayPaymentStatus::parse)
        .ok_or_else(invalid)?;

    Ok(PaymentNotification {
        order_id,
        gateway_payment_id,
        amount: order.order_amount,
        status,
    })
}

/// Axum handler for Cashfree payment webhooks.
///
/// Needs the raw body: the signature covers the exact bytes sent.
pub async fn handle_cashfree_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>> {
    if !state.webhook_verifier.verify(&headers, &body)? {
        tracing::warn!("Cashfree webhook rejected: invalid signature");
        return Err(AppError::Unauthorized);
    }

    let notification = parse_notification(&body)?;

    let mut conn = state.db.get()?;
    let outcome = reconcile_payment(&mut conn, &notification, state.unlock_previews_on_purchase)
        .inspect_err(|e| {
            tracing::warn!(
                "Cashfree webhook for order {} not applied: {}",
                notification.order_id,
                e
            );
        })?;

    match outcome {
        ReconcileOutcome::Completed {
            purchase_id,
            newly_enrolled,
            lectures_unlocked,
        } => tracing::info!(
            "Purchase {} completed (order {}, payment {}): newly_enrolled={}, lectures_unlocked={}",
            purchase_id,
            notification.order_id,
            notification.gateway_payment_id,
            newly_enrolled,
            lectures_unlocked
        ),
        ReconcileOutcome::Failed { purchase_id } => tracing::info!(
            "Purchase {} failed (order {}, payment {})",
            purchase_id,
            notification.order_id,
            notification.gateway_payment_id
        ),
        ReconcileOutcome::AlreadyCompleted { purchase_id } => tracing::info!(
            "Purchase {} already completed, failure notice ignored",
            purchase_id
        ),
        ReconcileOutcome::Ignored {
            purchase_id,
            status,
        } => tracing::debug!(
            "Cashfree webhook status {} for purchase {} ignored",
            status,
            purchase_id
        ),
    }

    Ok(Json(WebhookAck::received()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn parses_success_payload() {
        let body = br#"{
            "type": "PAYMENT_SUCCESS_WEBHOOK",
            "data": {
                "order": {"order_id": "order_1", "order_amount": 499},
                "payment": {"payment_status": "SUCCESS", "cf_payment_id": "cf1"},
                "customer_details": {"customer_id": "usr_1"}
            }
        }"#;

        let n = parse_notification(body).unwrap();
        assert_eq!(n.order_id, "order_1");
        assert_eq!(n.gateway_payment_id, "cf1");
        assert_eq!(n.amount, Some(Decimal::new(499, 0)));
        assert_eq!(n.status, GatewayPaymentStatus::Success);
    }

    #[test]
    fn missing_required_fields_are_invalid() {
        let cases: [&[u8]; 5] = [
            br#"not json"#,
            br#"{"data":{"payment":{"payment_status":"SUCCESS","cf_payment_id":"cf1"}}}"#,
            br#"{"data":{"order":{"order_id":"order_1"},"payment":{"cf_payment_id":"cf1"}}}"#,
            br#"{"data":{"order":{"order_id":"order_1"},"payment":{"payment_status":"SUCCESS"}}}"#,
            br#"{"data":{"order":{"order_id":""},"payment":{"payment_status":"SUCCESS","cf_payment_id":"cf1"}}}"#,
        ];

        for body in cases {
            assert!(
                matches!(parse_notification(body), Err(AppError::InvalidPayload(_))),
                "expected InvalidPayload for {}",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn missing_amount_is_allowed() {
        let body =
            br#"{"data":{"order":{"order_id":"order_1"},"payment":{"payment_status":"FAILED","cf_payment_id":42}}}"#;
        let n = parse_notification(body).unwrap();
        assert_eq!(n.amount, None);
        assert_eq!(n.gateway_payment_id, "42");
        assert_eq!(n.status, GatewayPaymentStatus::Failed);
    }
}

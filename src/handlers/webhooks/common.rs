//! Provider-agnostic payment reconciliation.
//!
//! Provider modules turn their webhook payloads into a `PaymentNotification`;
//! `reconcile_payment` applies it to the matching purchase.

use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::db::queries;
use crate::error::{OptionExt, Result, msg};
use crate::models::PurchaseStatus;

/// Final payment status as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayPaymentStatus {
    Success,
    Failed,
    Expired,
    /// Anything else (e.g. `USER_DROPPED`, `PENDING`); acknowledged without changes
    Other(String),
}

impl GatewayPaymentStatus {
    /// Parse a gateway status string. Matching is exact (gateways send upper case).
    pub fn parse(s: &str) -> Self {
        match s {
            "SUCCESS" => Self::Success,
            "FAILED" => Self::Failed,
            "EXPIRED" => Self::Expired,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A payment outcome extracted from a webhook.
#[derive(Debug, Clone)]
pub struct PaymentNotification {
    /// Merchant order ID, matched against `purchases.payment_id`
    pub order_id: String,
    pub gateway_payment_id: String,
    /// Amount the gateway charged; `None` if the payload omitted it
    pub amount: Option<Decimal>,
    pub status: GatewayPaymentStatus,
}

/// What reconciliation did to the purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Completed {
        purchase_id: String,
        newly_enrolled: bool,
        lectures_unlocked: usize,
    },
    Failed {
        purchase_id: String,
    },
    /// Failure reported for a purchase that already completed
    AlreadyCompleted {
        purchase_id: String,
    },
    /// Status with no mapping; nothing changed
    Ignored {
        purchase_id: String,
        status: String,
    },
}

/// Apply a payment notification to its purchase.
///
/// - `Success` completes the purchase, overwrites its amount with the charged
///   amount and enrolls the buyer, all in one transaction. Redelivery is safe:
///   enrollment has set semantics.
/// - `Failed`/`Expired` mark the purchase failed, unless it already completed.
///   A failed purchase can still complete later (the buyer retried on the
///   same order).
/// - Any other status is a no-op.
pub fn reconcile_payment(
    conn: &mut Connection,
    notification: &PaymentNotification,
    unlock_previews: bool,
) -> Result<ReconcileOutcome> {
    let purchase = queries::get_purchase_by_payment_id(conn, &notification.order_id)?
        .or_not_found(msg::PURCHASE_NOT_FOUND)?;

    match &notification.status {
        GatewayPaymentStatus::Success => {
            if purchase.status == PurchaseStatus::Completed {
                tracing::info!(
                    "Purchase {} already completed, re-applying (order {})",
                    purchase.id,
                    notification.order_id
                );
            }

            let outcome = queries::apply_payment_success(
                conn,
                &purchase,
                notification.amount,
                &notification.gateway_payment_id,
                unlock_previews,
            )?;

            Ok(ReconcileOutcome::Completed {
                purchase_id: purchase.id,
                newly_enrolled: outcome.newly_enrolled,
                lectures_unlocked: outcome.lectures_unlocked,
            })
        }
        GatewayPaymentStatus::Failed | GatewayPaymentStatus::Expired => {
            // A success may commit between the read above and this write
            let marked = purchase.status != PurchaseStatus::Completed
                && queries::mark_purchase_failed(
                    conn,
                    &purchase.id,
                    &notification.gateway_payment_id,
                )?;

            if !marked {
                tracing::warn!(
                    "Ignoring {:?} for completed purchase {} (order {})",
                    notification.status,
                    purchase.id,
                    notification.order_id
                );
                return Ok(ReconcileOutcome::AlreadyCompleted {
                    purchase_id: purchase.id,
                });
            }

            Ok(ReconcileOutcome::Failed {
                purchase_id: purchase.id,
            })
        }
        GatewayPaymentStatus::Other(status) => Ok(ReconcileOutcome::Ignored {
            purchase_id: purchase.id,
            status: status.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing_is_exact() {
        assert_eq!(GatewayPaymentStatus::parse("SUCCESS"), GatewayPaymentStatus::Success);
        assert_eq!(GatewayPaymentStatus::parse("FAILED"), GatewayPaymentStatus::Failed);
        assert_eq!(GatewayPaymentStatus::parse("EXPIRED"), GatewayPaymentStatus::Expired);
        assert_eq!(
            GatewayPaymentStatus::parse("success"),
            GatewayPaymentStatus::Other("success".to_string())
        );
        assert_eq!(
            GatewayPaymentStatus::parse("USER_DROPPED"),
            GatewayPaymentStatus::Other("USER_DROPPED".to_string())
        );
    }
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Course;

/// Lifecycle of a purchase: created `Pending` at checkout, moved to a terminal
/// state by the payment gateway's webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Pending,
    Completed,
    Failed,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for PurchaseStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One checkout attempt and its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: String,
    pub course_id: String,
    pub user_id: String,
    /// Creator of the purchased course (denormalized for sales queries)
    pub creator_id: String,
    /// Course price at checkout; replaced by the gateway-reported amount on success
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub status: PurchaseStatus,
    /// Merchant order ID sent to the gateway. Webhooks are matched on this.
    pub payment_id: String,
    /// Gateway's own payment ID, recorded when the outcome arrives
    pub gateway_payment_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct CreatePurchase {
    pub course_id: String,
    pub user_id: String,
    pub creator_id: String,
    pub amount: Decimal,
    pub payment_id: String,
}

/// A purchase with its course embedded, for sales listings.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseWithCourse {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub course: Course,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [PurchaseStatus::Pending, PurchaseStatus::Completed, PurchaseStatus::Failed] {
            assert_eq!(status.as_str().parse::<PurchaseStatus>(), Ok(status));
        }
        assert!("refunded".parse::<PurchaseStatus>().is_err());
    }
}

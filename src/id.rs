//! Identifier generation.
//!
//! Entity IDs are `{prefix}_{uuid_simple}` (32 hex chars, no hyphens).
//! Merchant order IDs sent to the payment gateway are time-based: `order_{unix_millis}`.

use chrono::Utc;
use uuid::Uuid;

const ALL_PREFIXES: &[&str] = &["usr_", "crs_", "lec_", "pur_"];

/// Cheap format check to reject garbage IDs before hitting the database.
pub fn is_valid_prefixed_id(s: &str) -> bool {
    let Some(prefix) = ALL_PREFIXES.iter().find(|p| s.starts_with(*p)) else {
        return false;
    };

    let hex_part = &s[prefix.len()..];
    hex_part.len() == 32 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
}

#[derive(Debug, Clone, Copy)]
pub enum EntityType {
    User,
    Course,
    Lecture,
    Purchase,
}

impl EntityType {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::User => "usr",
            Self::Course => "crs",
            Self::Lecture => "lec",
            Self::Purchase => "pur",
        }
    }

    pub fn gen_id(&self) -> String {
        format!("{}_{}", self.prefix(), Uuid::new_v4().as_simple())
    }
}

/// Merchant order ID for a new checkout. Derived from the clock only; two
/// checkouts in the same millisecond get the same ID.
pub fn generate_order_id() -> String {
    format!("order_{}", Utc::now().timestamp_millis())
}

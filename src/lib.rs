//! Course purchases - checkout and payment reconciliation for a course marketplace
//!
//! This library provides checkout session creation against the Cashfree payment
//! gateway, webhook reconciliation of payment outcomes, and purchase-status queries.

pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod id;
pub mod middleware;
pub mod models;
pub mod payments;

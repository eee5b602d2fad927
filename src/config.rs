use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

const SANDBOX_BASE_URL: &str = "https://sandbox.cashfree.com/pg";
const PRODUCTION_BASE_URL: &str = "https://api.cashfree.com/pg";
const DEFAULT_API_VERSION: &str = "2022-09-01";
const DEFAULT_RETURN_URL: &str = "http://localhost:5173/course-progress/{course_id}";
const WEBHOOK_PATH: &str = "/api/v1/purchase/cashfree-webhook";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Which Cashfree environment orders are created in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CashfreeEnvironment {
    Sandbox,
    Production,
}

impl CashfreeEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Sandbox => SANDBOX_BASE_URL,
            Self::Production => PRODUCTION_BASE_URL,
        }
    }
}

impl FromStr for CashfreeEnvironment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sandbox" | "test" => Ok(Self::Sandbox),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(()),
        }
    }
}

/// Credentials and endpoint for the Cashfree PG API.
#[derive(Debug, Clone)]
pub struct CashfreeConfig {
    pub client_id: String,
    pub client_secret: String,
    pub api_version: String,
    /// API root, e.g. `https://sandbox.cashfree.com/pg`. Orders are created at `{base_url}/orders`.
    pub base_url: String,
    pub timeout: Duration,
}

impl CashfreeConfig {
    /// Sandbox config with the given credentials.
    pub fn sandbox(client_id: &str, client_secret: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            base_url: SANDBOX_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Fixed parts of every order sent to the gateway.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub currency: String,
    /// Cashfree requires a phone number; we don't collect one.
    pub customer_phone: String,
    /// Redirect after payment. `{course_id}` is replaced with the purchased course.
    pub return_url_template: String,
    pub notify_url: String,
}

impl CheckoutSettings {
    pub fn return_url(&self, course_id: &str) -> String {
        self.return_url_template.replace("{course_id}", course_id)
    }
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            currency: "INR".to_string(),
            customer_phone: "9999999999".to_string(),
            return_url_template: DEFAULT_RETURN_URL.to_string(),
            notify_url: format!("http://localhost:8080{}", WEBHOOK_PATH),
        }
    }
}

/// Which purchases count when answering "has this user purchased this course".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PurchasedPolicy {
    /// Any purchase record counts, including pending and failed ones.
    #[default]
    AnyStatus,
    /// Only completed purchases count.
    CompletedOnly,
}

impl FromStr for PurchasedPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "any" => Ok(Self::AnyStatus),
            "completed" => Ok(Self::CompletedOnly),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub base_url: String,
    pub dev_mode: bool,
    pub cors_origin: Option<String>,
    pub cashfree: CashfreeConfig,
    pub checkout: CheckoutSettings,
    pub purchased_policy: PurchasedPolicy,
    pub unlock_previews_on_purchase: bool,
    /// Only honored in dev mode.
    pub skip_webhook_verification: bool,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parse_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(v) => match v.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value: v }),
        },
    }
}

impl Config {
    /// Load configuration from the process environment (and `.env` if present).
    ///
    /// Gateway credentials are required: startup fails rather than sending
    /// empty credentials to Cashfree.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("APP_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = match env::var("PORT") {
            Ok(p) => p
                .parse()
                .map_err(|_| ConfigError::Invalid { name: "PORT", value: p })?,
            Err(_) => 8080,
        };

        let base_url = env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        // APP_ID is the legacy name for the client id
        let client_id = required("CASHFREE_APP_ID")
            .or_else(|_| required("APP_ID"))
            .map_err(|_| ConfigError::Missing("CASHFREE_APP_ID"))?;
        let client_secret = required("CASHFREE_SECRET_KEY")?;

        let environment = match env::var("CASHFREE_ENV") {
            Ok(v) => v.parse::<CashfreeEnvironment>().map_err(|_| ConfigError::Invalid {
                name: "CASHFREE_ENV",
                value: v,
            })?,
            Err(_) => CashfreeEnvironment::Sandbox,
        };

        let timeout_secs: u64 = match env::var("CASHFREE_TIMEOUT_SECS") {
            Ok(v) => v.parse().map_err(|_| ConfigError::Invalid {
                name: "CASHFREE_TIMEOUT_SECS",
                value: v,
            })?,
            Err(_) => 30,
        };

        let cashfree = CashfreeConfig {
            client_id,
            client_secret,
            api_version: env::var("CASHFREE_API_VERSION")
                .unwrap_or_else(|_| DEFAULT_API_VERSION.to_string()),
            base_url: environment.base_url().to_string(),
            timeout: Duration::from_secs(timeout_secs),
        };

        let checkout = CheckoutSettings {
            currency: env::var("CHECKOUT_CURRENCY").unwrap_or_else(|_| "INR".to_string()),
            customer_phone: env::var("CHECKOUT_CUSTOMER_PHONE")
                .unwrap_or_else(|_| "9999999999".to_string()),
            return_url_template: env::var("CHECKOUT_RETURN_URL")
                .unwrap_or_else(|_| DEFAULT_RETURN_URL.to_string()),
            notify_url: env::var("CASHFREE_NOTIFY_URL")
                .unwrap_or_else(|_| format!("{}{}", base_url, WEBHOOK_PATH)),
        };

        let purchased_policy = match env::var("PURCHASED_POLICY") {
            Ok(v) => v.parse::<PurchasedPolicy>().map_err(|_| ConfigError::Invalid {
                name: "PURCHASED_POLICY",
                value: v,
            })?,
            Err(_) => PurchasedPolicy::default(),
        };

        Ok(Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "course_purchases.db".to_string()),
            base_url,
            dev_mode,
            cors_origin: env::var("CORS_ORIGIN").ok(),
            cashfree,
            checkout,
            purchased_policy,
            unlock_previews_on_purchase: parse_bool("UNLOCK_PREVIEWS_ON_PURCHASE", true)?,
            skip_webhook_verification: parse_bool("SKIP_WEBHOOK_VERIFICATION", false)?,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_url_substitutes_course_id() {
        let settings = CheckoutSettings::default();
        assert_eq!(
            settings.return_url("crs_123"),
            "http://localhost:5173/course-progress/crs_123"
        );
    }

    #[test]
    fn purchased_policy_parses() {
        assert_eq!("any".parse(), Ok(PurchasedPolicy::AnyStatus));
        assert_eq!("COMPLETED".parse(), Ok(PurchasedPolicy::CompletedOnly));
        assert!("sometimes".parse::<PurchasedPolicy>().is_err());
    }

    #[test]
    fn cashfree_environment_selects_base_url() {
        let env: CashfreeEnvironment = "production".parse().unwrap();
        assert_eq!(env.base_url(), "https://api.cashfree.com/pg");
        assert_eq!(CashfreeEnvironment::Sandbox.base_url(), SANDBOX_BASE_URL);
    }
}

//! Test utilities and fixtures for course purchase integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderMap, Request, Response},
    routing::get,
    Router,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rust_decimal::Decimal;
use sha2::Sha256;
use tempfile::TempDir;
use tower::ServiceExt;

pub use course_purchases::config::{CashfreeConfig, CheckoutSettings, PurchasedPolicy};
pub use course_purchases::db::{AppState, DbPool, init_db, queries};
pub use course_purchases::error::{AppError, Result};
pub use course_purchases::handlers;
pub use course_purchases::models::*;
pub use course_purchases::payments::{
    CashfreeClient, NewOrder, PaymentGateway, SkipVerification, WebhookVerifier,
};

pub const TEST_CLIENT_ID: &str = "TEST_APP_ID";
pub const TEST_CLIENT_SECRET: &str = "cfsk_test_secret_123";
pub const WEBHOOK_URI: &str = "/api/v1/purchase/cashfree-webhook";
pub const CHECKOUT_URI: &str = "/api/v1/purchase/checkout/create-checkout-session";

// ============ Test doubles ============

/// What the fake gateway answers to `create_order`.
#[derive(Debug, Clone)]
pub enum GatewayBehavior {
    Session(String),
    NoSession,
    Fail,
}

/// Records every order and answers with a configurable behavior.
pub struct FakeGateway {
    pub orders: Mutex<Vec<NewOrder>>,
    behavior: Mutex<GatewayBehavior>,
}

impl FakeGateway {
    pub fn new(behavior: GatewayBehavior) -> Self {
        Self {
            orders: Mutex::new(Vec::new()),
            behavior: Mutex::new(behavior),
        }
    }

    pub fn set_behavior(&self, behavior: GatewayBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn orders(&self) -> Vec<NewOrder> {
        self.orders.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    fn provider_name(&self) -> &'static str {
        "fake"
    }

    async fn create_order(&self, order: &NewOrder) -> Result<Option<String>> {
        self.orders.lock().unwrap().push(order.clone());
        match self.behavior.lock().unwrap().clone() {
            GatewayBehavior::Session(id) => Ok(Some(id)),
            GatewayBehavior::NoSession => Ok(None),
            GatewayBehavior::Fail => Err(AppError::PaymentSession("gateway unavailable".into())),
        }
    }
}

/// Verifier that rejects every webhook as not coming from the gateway.
pub struct RejectAll;

impl WebhookVerifier for RejectAll {
    fn verify(&self, _headers: &HeaderMap, _body: &[u8]) -> Result<bool> {
        Ok(false)
    }
}

// ============ App setup ============

/// A full application wired to a temp-file database and test doubles.
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub gateway: Arc<FakeGateway>,
    // Keeps the database directory alive for the test's duration
    _dir: TempDir,
}

pub struct TestAppBuilder {
    verifier: Arc<dyn WebhookVerifier>,
    behavior: GatewayBehavior,
    purchased_policy: PurchasedPolicy,
    unlock_previews: bool,
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self {
            verifier: Arc::new(SkipVerification),
            behavior: GatewayBehavior::Session("session_test_123".to_string()),
            purchased_policy: PurchasedPolicy::AnyStatus,
            unlock_previews: true,
        }
    }
}

impl TestAppBuilder {
    pub fn verifier(mut self, verifier: Arc<dyn WebhookVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    /// Verify webhooks with the real Cashfree HMAC scheme and the test secret.
    pub fn cashfree_verifier(self) -> Self {
        let client = CashfreeClient::new(&test_cashfree_config("http://127.0.0.1:9"))
            .expect("Failed to build Cashfree client");
        self.verifier(Arc::new(client))
    }

    pub fn gateway(mut self, behavior: GatewayBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn purchased_policy(mut self, policy: PurchasedPolicy) -> Self {
        self.purchased_policy = policy;
        self
    }

    pub fn unlock_previews(mut self, unlock: bool) -> Self {
        self.unlock_previews = unlock;
        self
    }

    pub fn build(self) -> TestApp {
        let (dir, pool) = setup_test_pool();
        let gateway = Arc::new(FakeGateway::new(self.behavior));

        let state = AppState {
            db: pool,
            gateway: gateway.clone(),
            webhook_verifier: self.verifier,
            checkout: CheckoutSettings::default(),
            purchased_policy: self.purchased_policy,
            unlock_previews_on_purchase: self.unlock_previews,
        };

        let app = Router::new()
            .route("/health", get(handlers::health))
            .nest("/api/v1/purchase", handlers::router(state.clone()))
            .with_state(state.clone());

        TestApp {
            app,
            state,
            gateway,
            _dir: dir,
        }
    }
}

pub fn test_app() -> TestApp {
    TestAppBuilder::default().build()
}

/// File-backed pool in a fresh temp dir. In-memory SQLite would give each
/// pooled connection its own database.
pub fn setup_test_pool() -> (TempDir, DbPool) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("test.db");
    let manager = SqliteConnectionManager::file(&path).with_init(|conn| {
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
    });
    let pool = Pool::builder()
        .max_size(4)
        .build(manager)
        .expect("Failed to create pool");
    {
        let conn = pool.get().unwrap();
        init_db(&conn).expect("Failed to initialize schema");
    }
    (dir, pool)
}

pub fn test_cashfree_config(base_url: &str) -> CashfreeConfig {
    let mut config = CashfreeConfig::sandbox(TEST_CLIENT_ID, TEST_CLIENT_SECRET);
    config.base_url = base_url.to_string();
    config
}

// ============ Fixtures ============

/// Create a user with a bearer token. Returns the user and the raw token.
pub fn create_test_user(conn: &rusqlite::Connection, name: &str, email: &str) -> (User, String) {
    let token = course_purchases::crypto::generate_api_token();
    let user = queries::create_user(
        conn,
        &CreateUser {
            name: name.to_string(),
            email: email.to_string(),
        },
        Some(&token),
    )
    .expect("Failed to create test user");
    (user, token)
}

pub fn create_test_course(conn: &rusqlite::Connection, creator_id: &str, price: Decimal) -> Course {
    queries::create_course(
        conn,
        &CreateCourse {
            title: "Test Course".to_string(),
            price,
            creator_id: creator_id.to_string(),
        },
    )
    .expect("Failed to create test course")
}

/// Add `count` lectures to a course; only the first is a free preview.
pub fn add_test_lectures(
    conn: &rusqlite::Connection,
    course_id: &str,
    count: usize,
) -> Vec<Lecture> {
    (0..count)
        .map(|i| {
            queries::create_lecture(
                conn,
                course_id,
                &CreateLecture {
                    title: format!("Lecture {}", i + 1),
                    is_preview_free: i == 0,
                },
            )
            .expect("Failed to create test lecture")
        })
        .collect()
}

/// A pending purchase for `order_id`, as checkout would have recorded it.
pub fn create_test_purchase(
    conn: &rusqlite::Connection,
    user_id: &str,
    course: &Course,
    order_id: &str,
) -> Purchase {
    queries::create_purchase(
        conn,
        &CreatePurchase {
            course_id: course.id.clone(),
            user_id: user_id.to_string(),
            creator_id: course.creator_id.clone(),
            amount: course.price,
            payment_id: order_id.to_string(),
        },
    )
    .expect("Failed to create test purchase")
}

/// Creator, buyer, a 499 course with three lectures, and the buyer's token.
pub struct Marketplace {
    pub creator: User,
    pub creator_token: String,
    pub buyer: User,
    pub buyer_token: String,
    pub course: Course,
}

pub fn seed_marketplace(pool: &DbPool) -> Marketplace {
    let conn = pool.get().unwrap();
    let (creator, creator_token) = create_test_user(&conn, "Creator", "creator@example.com");
    let (buyer, buyer_token) = create_test_user(&conn, "Buyer", "buyer@example.com");
    let course = create_test_course(&conn, &creator.id, Decimal::new(499, 0));
    add_test_lectures(&conn, &course.id, 3);
    let course = queries::get_course_by_id(&conn, &course.id).unwrap().unwrap();
    Marketplace {
        creator,
        creator_token,
        buyer,
        buyer_token,
        course,
    }
}

// ============ Webhook helpers ============

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Cashfree signature: base64(HMAC-SHA256(secret, timestamp + body)).
pub fn sign_cashfree(body: &[u8], secret: &str, timestamp: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(timestamp.as_bytes());
    mac.update(body);
    BASE64.encode(mac.finalize().into_bytes())
}

pub fn webhook_payload(
    order_id: &str,
    amount: Option<f64>,
    status: &str,
    cf_payment_id: &str,
) -> String {
    let mut order = serde_json::json!({ "order_id": order_id });
    if let Some(amount) = amount {
        order["order_amount"] = serde_json::json!(amount);
    }
    serde_json::json!({
        "type": "PAYMENT_SUCCESS_WEBHOOK",
        "data": {
            "order": order,
            "payment": { "payment_status": status, "cf_payment_id": cf_payment_id },
            "customer_details": { "customer_email": "buyer@example.com" }
        }
    })
    .to_string()
}

pub fn webhook_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(WEBHOOK_URI)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn signed_webhook_request(body: &str, secret: &str) -> Request<Body> {
    let timestamp = now_millis().to_string();
    let signature = sign_cashfree(body.as_bytes(), secret, &timestamp);
    Request::builder()
        .method("POST")
        .uri(WEBHOOK_URI)
        .header("Content-Type", "application/json")
        .header("x-webhook-timestamp", timestamp)
        .header("x-webhook-signature", signature)
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ============ Request helpers ============

pub fn authed_get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub fn checkout_request(course_id: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(CHECKOUT_URI)
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::json!({ "courseId": course_id }).to_string()))
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).expect("Response body should be JSON")
}

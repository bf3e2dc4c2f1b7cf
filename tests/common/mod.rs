//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{Router, body::Body, http::Request, response::Response};
use rusqlite::Connection;
use serde_json::Value;
use tempfile::TempDir;
use uuid::Uuid;

use legacy_radio::app::build_router;
use legacy_radio::db::{AppState, DbPool, create_pool, queries};
use legacy_radio::discounts;
use legacy_radio::error::{AppError, Result};
use legacy_radio::jwt::TokenIssuer;
use legacy_radio::models::*;
use legacy_radio::payments::{
    PaymentGateway, PaymentIntent, PaymentMethod, PaymentOrder, PaymentStatus, Payments,
};
use legacy_radio::pricing::{PriceList, SubscriptionDuration};
use legacy_radio::purchase::PurchaseRequest;
use legacy_radio::util::now;

pub const TEST_SECRET: &str = "test-signing-secret";

/// Stands in for an argon2 hash on accounts that never log in.
pub const UNUSED_PASSWORD_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$unused$unused";

// ============ Mock payment gateway ============

#[derive(Debug, Clone)]
pub enum MockOutcome {
    Succeed,
    Pending,
    Fail(String),
    /// Gateway could not be reached
    Error,
}

/// Scripted gateway that records every call.
pub struct MockGateway {
    outcome: Mutex<MockOutcome>,
    delay: Option<Duration>,
    confirm_calls: AtomicUsize,
    intent_calls: AtomicUsize,
}

impl MockGateway {
    pub fn new(outcome: MockOutcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            delay: None,
            confirm_calls: AtomicUsize::new(0),
            intent_calls: AtomicUsize::new(0),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(MockOutcome::Succeed)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_outcome(&self, outcome: MockOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    pub fn confirm_calls(&self) -> usize {
        self.confirm_calls.load(Ordering::SeqCst)
    }

    pub fn intent_calls(&self) -> usize {
        self.intent_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_intent(&self, order: &PaymentOrder) -> Result<PaymentIntent> {
        self.intent_calls.fetch_add(1, Ordering::SeqCst);
        let id = format!("pi_mock_{}_{}", order.amount_cents, Uuid::new_v4().simple());
        Ok(PaymentIntent {
            client_secret: format!("{}_secret", id),
            id,
        })
    }

    async fn confirm_payment(
        &self,
        _order: &PaymentOrder,
        reference: Option<&str>,
    ) -> Result<PaymentStatus> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reference = reference
            .map(String::from)
            .unwrap_or_else(|| format!("pi_mock_{}", Uuid::new_v4().simple()));
        let outcome = self.outcome.lock().unwrap().clone();
        match outcome {
            MockOutcome::Succeed => Ok(PaymentStatus::Succeeded { reference }),
            MockOutcome::Pending => Ok(PaymentStatus::Pending { reference }),
            MockOutcome::Fail(reason) => Ok(PaymentStatus::Failed { reason }),
            MockOutcome::Error => Err(AppError::Internal("connection reset".into())),
        }
    }
}

// ============ App state ============

/// Application state over a throwaway file-backed database.
/// Keep it alive for the duration of the test; dropping it deletes the database.
pub struct TestContext {
    pub state: AppState,
    pub gateway: Arc<MockGateway>,
    _dir: TempDir,
}

impl TestContext {
    pub fn conn(&self) -> r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager> {
        self.state.db.get().unwrap()
    }

    pub fn pool(&self) -> DbPool {
        self.state.db.clone()
    }

    pub fn app(&self) -> Router {
        build_router(self.state.clone(), &[])
    }

    pub fn bearer(&self, user: &User) -> String {
        format!("Bearer {}", self.state.tokens.issue(user).unwrap())
    }
}

pub fn create_test_context() -> TestContext {
    create_test_context_with(MockGateway::succeeding(), Duration::from_secs(5))
}

pub fn create_test_context_with(gateway: MockGateway, payment_timeout: Duration) -> TestContext {
    let dir = tempfile::tempdir().unwrap();
    let pool = create_pool(dir.path().join("test.db"), 16).unwrap();
    let gateway = Arc::new(gateway);

    let state = AppState {
        db: pool,
        tokens: Arc::new(TokenIssuer::from_days(TEST_SECRET, 7)),
        payments: Payments::new()
            .with_card(gateway.clone())
            .with_wallet(gateway.clone()),
        prices: PriceList::default(),
        payment_timeout,
        bootstrap_admin_email: Some("root@legacyradio.test".into()),
    };

    TestContext {
        state,
        gateway,
        _dir: dir,
    }
}

// ============ Fixtures ============

pub fn future_timestamp(days: i64) -> i64 {
    now() + days * 86400
}

pub fn create_test_user(conn: &Connection, email: &str, role: Role) -> User {
    queries::create_user(
        conn,
        &CreateUser {
            email: email.into(),
            username: email.split('@').next().unwrap_or("user").into(),
            password_hash: UNUSED_PASSWORD_HASH.into(),
            role,
        },
    )
    .unwrap()
}

pub fn create_test_server(conn: &Connection, name: &str) -> Server {
    queries::create_server(
        conn,
        &CreateServer {
            name: name.into(),
            description: format!("{} dispatch channel", name),
        },
    )
    .unwrap()
}

/// Create a code as of `created_at` (so tests can put expiry anywhere after it).
pub fn create_test_code_at(
    conn: &Connection,
    admin: &User,
    server: &Server,
    code: &str,
    expires_at: i64,
    max_uses: Option<i64>,
    created_at: i64,
) -> DiscountCode {
    discounts::create(
        conn,
        &CreateDiscountCode {
            code: code.into(),
            server_id: server.id.clone(),
            expires_at,
            max_uses,
        },
        &admin.id,
        created_at,
    )
    .unwrap()
}

pub fn create_test_code(
    conn: &Connection,
    admin: &User,
    server: &Server,
    code: &str,
    max_uses: Option<i64>,
) -> DiscountCode {
    create_test_code_at(conn, admin, server, code, future_timestamp(30), max_uses, now())
}

pub fn purchase_request(
    server: &Server,
    months: u32,
    code: Option<&str>,
    reference: Option<&str>,
) -> PurchaseRequest {
    PurchaseRequest {
        server_id: server.id.clone(),
        duration: SubscriptionDuration::try_from(months).unwrap(),
        payment_method: PaymentMethod::Card,
        discount_code: code.map(String::from),
        payment_reference: reference.map(String::from),
    }
}

pub fn subscription_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM subscriptions", [], |row| row.get(0))
        .unwrap()
}

pub fn receipt_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM payment_receipts", [], |row| row.get(0))
        .unwrap()
}

// ============ HTTP helpers ============

pub fn json_request(method: &str, uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

//! HTTP client for the Legacy Radio API

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use crate::error::{LegacyRadioError, LegacyRadioErrorCode, Result, map_api_error_code};
use crate::session::{Session, unix_now};
use crate::storage::{MemoryStorage, StorageAdapter};
use crate::types::*;

/// Legacy Radio API client with an explicit session
///
/// The session is populated by [`login`](Self::login) and
/// [`register`](Self::register), persisted through the storage adapter, and
/// cleared by [`logout`](Self::logout), [`invalidate`](Self::invalidate), or
/// any 401 response from the API.
pub struct LegacyRadioClient {
    base_url: String,
    http: reqwest::Client,
    storage: Arc<dyn StorageAdapter>,
    session: RwLock<Option<Session>>,
}

impl LegacyRadioClient {
    /// Create a client with in-memory storage
    ///
    /// `base_url` is the API root, e.g. `http://localhost:4000/api`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_storage(base_url, Arc::new(MemoryStorage::new()))
    }

    /// Create a client with custom storage, restoring any saved session
    pub fn with_storage(base_url: impl Into<String>, storage: Arc<dyn StorageAdapter>) -> Self {
        let session = Session::load(storage.as_ref());
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            storage,
            session: RwLock::new(session),
        }
    }

    // ==================== Session ====================

    /// Current session, if signed in
    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Whether a session is held locally (not checked against the server)
    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Verify the stored session
    ///
    /// Returns false without a network call when there is no token or its
    /// expiry has passed. Otherwise refreshes the user from the server.
    /// Any failure, including failing to persist the refreshed user, clears
    /// the session.
    pub async fn check_auth(&self) -> bool {
        let Some(session) = self.session().await else {
            return false;
        };

        let refreshed = if session.is_expired(unix_now()) {
            false
        } else {
            match self.profile().await {
                Ok(user) => self
                    .set_session(Session {
                        token: session.token,
                        user,
                    })
                    .await
                    .is_ok(),
                Err(_) => false,
            }
        };

        if !refreshed {
            // A stale copy left in storage is dropped again on the next check
            self.invalidate().await.ok();
        }
        refreshed
    }

    /// Drop the session locally and from storage
    ///
    /// The in-memory session is always cleared; the error reports storage
    /// that could not be updated.
    pub async fn invalidate(&self) -> Result<()> {
        *self.session.write().await = None;
        Session::clear(self.storage.as_ref())
    }

    /// Persist first, so a session that cannot be saved is never held
    async fn set_session(&self, session: Session) -> Result<()> {
        session.save(self.storage.as_ref())?;
        *self.session.write().await = Some(session);
        Ok(())
    }

    // ==================== Auth ====================

    /// Create an account and sign in
    pub async fn register(&self, email: &str, username: &str, password: &str) -> Result<User> {
        let body = serde_json::json!({
            "email": email,
            "username": username,
            "password": password,
        });
        let response: AuthResponse = self.post("/auth/register", &body, false).await?;
        self.start_session(response).await
    }

    /// Sign in with email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let body = serde_json::json!({ "email": email, "password": password });
        let response: AuthResponse = self.post("/auth/login", &body, false).await?;
        self.start_session(response).await
    }

    /// Sign out (local only; tokens expire on their own)
    pub async fn logout(&self) -> Result<()> {
        self.invalidate().await
    }

    async fn start_session(&self, response: AuthResponse) -> Result<User> {
        let user = response.user.clone();
        self.set_session(Session {
            token: response.token,
            user: response.user,
        })
        .await?;
        Ok(user)
    }

    /// Fetch the signed-in user
    pub async fn profile(&self) -> Result<User> {
        self.get("/auth/profile", true).await
    }

    // ==================== Servers & Subscriptions ====================

    /// List all servers (no sign-in needed)
    pub async fn servers(&self) -> Result<Vec<Server>> {
        self.get("/servers", false).await
    }

    /// List the signed-in user's subscriptions
    pub async fn subscriptions(&self) -> Result<Vec<SubscriptionWithServer>> {
        self.get("/subscriptions", true).await
    }

    /// Check a discount code without using it
    pub async fn validate_discount(&self, code: &str) -> Result<DiscountValidation> {
        self.post("/apply-discount", &serde_json::json!({ "code": code }), true)
            .await
    }

    /// Start a payment for a plan
    pub async fn create_payment_intent(
        &self,
        request: &CreateIntentRequest,
    ) -> Result<PaymentIntentResponse> {
        self.post("/payments/create-intent", request, true).await
    }

    /// Complete a purchase once payment has been made
    ///
    /// Fails with [`LegacyRadioErrorCode::PaymentPending`] if the provider has
    /// not settled the payment yet.
    pub async fn subscribe(&self, request: &SubscribeRequest) -> Result<Subscription> {
        self.post("/subscribe", request, true).await
    }

    // ==================== Admin ====================

    /// Admin: create a server
    pub async fn create_server(&self, request: &CreateServerRequest) -> Result<Server> {
        self.post("/admin/servers", request, true).await
    }

    /// Admin: edit a server
    pub async fn update_server(&self, id: &str, request: &UpdateServerRequest) -> Result<Server> {
        self.send(
            self.request(Method::PUT, &format!("/admin/servers/{}", id))
                .json(request),
            true,
        )
        .await
    }

    /// Admin: list discount codes
    pub async fn discount_codes(&self) -> Result<Vec<DiscountCodeWithServer>> {
        self.get("/admin/discount-codes", true).await
    }

    /// Admin: create a discount code
    pub async fn create_discount_code(
        &self,
        request: &CreateDiscountCodeRequest,
    ) -> Result<DiscountCode> {
        self.post("/admin/discount-codes", request, true).await
    }

    /// Admin: list redemptions of a discount code
    pub async fn discount_usage(&self, code_id: &str) -> Result<Vec<DiscountCodeUsage>> {
        self.get(&format!("/admin/discount-usage/{}", code_id), true)
            .await
    }

    // ==================== Transport ====================

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, authed: bool) -> Result<T> {
        self.send(self.request(Method::GET, path), authed).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        authed: bool,
    ) -> Result<T> {
        self.send(self.request(Method::POST, path).json(body), authed)
            .await
    }

    async fn send<T: DeserializeOwned>(&self, mut builder: RequestBuilder, authed: bool) -> Result<T> {
        if authed {
            let token = self
                .session
                .read()
                .await
                .as_ref()
                .map(|s| s.token.clone())
                .ok_or_else(LegacyRadioError::no_token)?;
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| LegacyRadioError::network(e.to_string()))?;
        let status = response.status();

        // 202 carries a pending-payment error body, not a result
        if status.is_success() && status != StatusCode::ACCEPTED {
            return response
                .json()
                .await
                .map_err(|e| LegacyRadioError::network(format!("Invalid response: {}", e)));
        }

        let body = response.json::<ApiErrorBody>().await.ok();
        let code = map_api_error_code(status.as_u16(), body.as_ref().and_then(|b| b.code.as_deref()));
        let message = body
            .map(|b| b.message)
            .unwrap_or_else(|| format!("Request failed with status {}", status));

        if code == LegacyRadioErrorCode::Unauthorized {
            self.invalidate().await.ok();
        }

        Err(LegacyRadioError::with_status(code, message, status.as_u16()))
    }
}

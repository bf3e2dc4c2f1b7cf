//! Legacy Radio SDK for Rust
//!
//! Client for the Legacy Radio subscription API. Holds an explicit session
//! (token + user) that survives restarts through a [`StorageAdapter`].
//!
//! # Example
//!
//! ```no_run
//! use legacy_radio_sdk::{LegacyRadioClient, PaymentMethod, SubscribeRequest};
//!
//! # async fn example() -> legacy_radio_sdk::Result<()> {
//! let client = LegacyRadioClient::new("http://localhost:4000/api");
//!
//! if !client.check_auth().await {
//!     client.login("listener@example.com", "hunter22").await?;
//! }
//!
//! let servers = client.servers().await?;
//! let subscription = client
//!     .subscribe(&SubscribeRequest {
//!         server_id: servers[0].id.clone(),
//!         duration: 3,
//!         payment_method: PaymentMethod::Card,
//!         discount_code: Some("SAVE10".into()),
//!         payment_reference: Some("pi_123".into()),
//!     })
//!     .await?;
//! println!("Active until {}", subscription.expires_at);
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod session;
mod storage;
mod types;

pub use client::LegacyRadioClient;
pub use error::{LegacyRadioError, LegacyRadioErrorCode, Result};
pub use session::{Session, token_expiry};
#[cfg(feature = "native-storage")]
pub use storage::FileStorage;
pub use storage::{MemoryStorage, StorageAdapter, keys};
pub use types::*;

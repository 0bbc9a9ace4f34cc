#![doc = include_str!("../README.md")]

pub mod api;
#[cfg(feature = "client")]
pub mod client;
pub mod config;
pub mod error;
#[cfg(feature = "notify")]
pub mod notify;
pub mod session;
pub mod stats;
pub mod token;
pub mod types;
pub mod validate;

// Re-exports for convenient access
pub use api::{AuthApi, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
#[cfg(feature = "client")]
pub use client::{ApiClient, FrontendLog};
pub use config::ClientConfig;
pub use error::Error;
#[cfg(feature = "notify")]
pub use notify::{NotificationChannel, NotificationDisplay, Subscription};
pub use session::{SETUP_INSTRUCTIONS, Session, SessionStore};
pub use stats::{LogRecord, LogSource, LogStatRecord, LogStats, group_log_stats};
pub use token::decode_identity;
pub use types::{Credential, Identity, NotificationEvent, RegistrationResult, UserId};
pub use validate::{RegistrationForm, is_valid_email};

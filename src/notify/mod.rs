//! Realtime notification channel.
//!
//! The backend pushes authentication-code events over Socket.IO. This module
//! keeps one WebSocket connection open for the lifetime of its owner and
//! hands the most recent `authCode` event to a single display.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use authcode_client::notify::{NotificationChannel, NotificationDisplay};
//!
//! let channel = NotificationChannel::connect(config.notify_url()).await?;
//! let mut subscription = channel.subscribe();
//! let mut display = NotificationDisplay::new();
//!
//! while let Some(event) = subscription.next().await {
//!     display.show(&event);
//! }
//!
//! channel.close().await;
//! ```

pub mod codec;

mod channel;
mod display;

pub use channel::{AUTH_CODE_EVENT, NotificationChannel, Subscription};
pub use display::{DEFAULT_DISPLAY_DURATION, NotificationDisplay};

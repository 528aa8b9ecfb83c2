//! Notification fan-out for run reports
//!
//! Channels are independent sinks implementing one capability: deliver a
//! [`BatchReport`](crate::report::BatchReport). The manager invokes every
//! registered channel unconditionally and independently, so one channel's
//! failure can never suppress another's delivery.
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │      NotificationManager                   │
//! │  - Channel registry (env-driven)           │
//! │  - Independent dispatch                    │
//! └────────────────────────────────────────────┘
//!                     │
//!            ┌────────┴────────┐
//!            ▼                 ▼
//!      ┌─────────┐       ┌──────────┐
//!      │ Webhook │       │ Telegram │
//!      │ Channel │       │ Channel  │
//!      └─────────┘       └──────────┘
//! ```

pub mod channels;
mod manager;

pub use channels::telegram::TelegramChannel;
pub use channels::webhook::WebhookChannel;
pub use channels::{Channel, ChannelError, ChannelResult, DeliveryStatus};
pub use manager::NotificationManager;

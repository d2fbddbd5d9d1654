//! reviewwatch - relays homework review status changes to a Telegram chat.
//!
//! ## Architecture
//!
//! A single sequential loop, one network call in flight at a time:
//! - **Fetcher** ([`PracticumClient`]): GET the review statuses since the cursor
//! - **Validator** ([`check_response`]): enforce the documented response shape
//! - **Status extractor** ([`parse_status`]): record → verdict message
//! - **Notifier** ([`TelegramNotifier`]): send the message to the chat
//! - **Driver** ([`Poller`]): dedupe, route errors, sleep a fixed period
//!
//! The fetcher and notifier sit behind the [`StatusSource`] and
//! [`Notifier`] traits so the driver can be exercised without a network.

pub mod client;
pub mod models;
pub mod pipeline;

// Re-exports for convenience
pub use client::{Notifier, PracticumClient, StatusSource, TelegramNotifier};
pub use models::{BotError, Config, Credentials, HomeworkStatus, Result};
pub use pipeline::{CycleOutcome, PollState, Poller, check_response, latest_status, parse_status};

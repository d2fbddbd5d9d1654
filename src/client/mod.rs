//! HTTP clients: the homework status API and the Telegram notifier.

mod practicum;
mod telegram;

pub use practicum::*;
pub use telegram::*;

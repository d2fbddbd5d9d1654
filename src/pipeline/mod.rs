//! Pipeline module - response checks, status formatting and the polling loop.

mod check;
mod poller;
mod status;

pub use check::*;
pub use poller::*;
pub use status::*;

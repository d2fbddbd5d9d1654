//! Core data models for reviewwatch.

mod config;
mod error;
mod homework;

pub use config::*;
pub use error::*;
pub use homework::*;

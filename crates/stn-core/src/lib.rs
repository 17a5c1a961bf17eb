//! Core domain + application logic for the Telegram notification relay.
//!
//! Framework-agnostic: the chat transport and the record stores live behind
//! ports (traits) implemented in adapter crates.

pub mod bot;
pub mod config;
pub mod credentials;
pub mod crypto;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod ingest;
pub mod logging;
pub mod messaging;
pub mod registry;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use errors::{Error, Result};

//! # Klangkiste Common Library
//!
//! Shared code for the Klangkiste console crates including:
//! - Error taxonomy (`Error` enum)
//! - Console event types (`ConsoleEvent` enum) and the broadcast `EventBus`
//! - Configuration loading

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{ConsoleEvent, EventBus};

//! Core types, identifiers, and error types for the Plumb realignment engine.
//!
//! This crate provides the foundational types shared by every plumb crate:
//! - Identifier newtypes for nodes, subscriptions, and monitors
//! - Alignment modes, encoding tags, and baseline snapshots
//! - Default configuration
//! - The host traits the engine consumes
//! - Error types

pub mod config;
pub mod errors;
pub mod host;
pub mod types;

pub use config::*;
pub use errors::*;
pub use host::*;
pub use types::*;

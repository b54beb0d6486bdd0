//! Error types for the realignment engine.
//!
//! Only construction-time programmer errors are represented here. Runtime
//! drift (undecodable transforms, stale notifications, missing widths) is
//! never an error and degrades to doing nothing for that tick.

use crate::types::{MonitorId, NodeId};
use thiserror::Error;

/// Errors raised while building or addressing a monitor.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Container selector {selector:?} matched no element")]
    ContainerNotFound { selector: String },

    #[error("Container {node} is not an element of this document")]
    InvalidContainer { node: NodeId },

    #[error(transparent)]
    InvalidSelector(#[from] SelectorError),

    #[error("Node {node} is already observed by monitor {owner}")]
    AlreadyObserved { node: NodeId, owner: MonitorId },

    #[error("Unknown monitor: {id}")]
    UnknownMonitor { id: MonitorId },
}

/// Errors in selector syntax.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("Empty selector")]
    Empty,

    #[error("Invalid selector {selector:?} at offset {offset}: {reason}")]
    Syntax {
        selector: String,
        offset: usize,
        reason: String,
    },

    #[error("Selector {selector:?} rejected by host: {reason}")]
    Host { selector: String, reason: String },
}

/// An alignment name that is not one of `left`, `center`, `right`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown alignment: {0:?}")]
pub struct UnknownAlign(pub String);

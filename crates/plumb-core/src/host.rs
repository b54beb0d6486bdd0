//! Traits through which the engine reaches the document it realigns.
//!
//! A host owns the element tree. The engine never holds element references,
//! only [`NodeId`]s, and asks the host to resolve, read, write, measure, and
//! observe them.

use crate::errors::SelectorError;
use crate::types::{NodeId, ObserveConfig, SubscriptionId};

/// Element access required by the realignment engine.
pub trait Host {
    /// The document root, used when no scope is given.
    fn root(&self) -> NodeId;

    /// True if `node` is a live element of this document.
    fn contains(&self, node: NodeId) -> bool;

    /// True if `node` has any children or text.
    fn has_content(&self, node: NodeId) -> bool;

    /// First descendant of `scope` matching `selector`.
    fn query_selector(&self, scope: NodeId, selector: &str) -> Result<Option<NodeId>, SelectorError>;

    /// All descendants of `scope` matching `selector`, in document order.
    fn query_selector_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, SelectorError>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);

    fn remove_attribute(&mut self, node: NodeId, name: &str);

    /// Rendered content width, or `None` if it cannot be measured.
    fn measure_width(&self, node: NodeId) -> Option<f64>;

    /// Start delivering change notifications for `node` under `subscription`.
    fn observe(&mut self, node: NodeId, config: ObserveConfig, subscription: SubscriptionId);

    /// Stop delivering notifications for `subscription`. Unknown ids are ignored.
    fn disconnect(&mut self, subscription: SubscriptionId);

    /// The engine keeps no reference to `node` any more.
    ///
    /// Hosts that intern elements on first sight may forget it here. Marked
    /// nodes are still in use and must stay resolvable.
    fn release(&mut self, _node: NodeId) {}
}

/// One batch of change records for a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub subscription: SubscriptionId,
    /// Number of raw records coalesced into this batch
    pub records: usize,
}

/// A host that queues notifications for the caller to drain.
pub trait ChangeFeed: Host {
    /// Take every queued batch, oldest first.
    fn drain_notifications(&mut self) -> Vec<Notification>;
}

//! Observer bookkeeping and the coalescing notification queue.

use indexmap::IndexMap;
use plumb_core::{NodeId, Notification, ObserveConfig, SubscriptionId};

/// The kind of a raw mutation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Attribute,
    CharacterData,
    ChildList,
}

/// A registered observer.
#[derive(Debug, Clone, Copy)]
pub struct Observer {
    pub node: NodeId,
    pub config: ObserveConfig,
}

impl Observer {
    pub fn accepts(&self, kind: MutationKind) -> bool {
        match kind {
            MutationKind::Attribute => self.config.attributes,
            MutationKind::CharacterData => self.config.character_data,
            MutationKind::ChildList => self.config.child_list,
        }
    }
}

/// Observers plus the batches queued for them.
///
/// Records for the same subscription merge into one batch until drained.
#[derive(Debug, Default)]
pub struct MutationQueue {
    observers: IndexMap<SubscriptionId, Observer>,
    pending: IndexMap<SubscriptionId, usize>,
}

impl MutationQueue {
    pub fn observe(&mut self, subscription: SubscriptionId, node: NodeId, config: ObserveConfig) {
        self.observers.insert(subscription, Observer { node, config });
    }

    /// Remove the observer and drop anything still queued for it.
    pub fn disconnect(&mut self, subscription: SubscriptionId) {
        self.observers.shift_remove(&subscription);
        self.pending.shift_remove(&subscription);
    }

    pub fn observers(&self) -> impl Iterator<Item = (SubscriptionId, &Observer)> {
        self.observers.iter().map(|(id, observer)| (*id, observer))
    }

    pub fn push(&mut self, subscription: SubscriptionId) {
        *self.pending.entry(subscription).or_insert(0) += 1;
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn drain(&mut self) -> Vec<Notification> {
        self.pending
            .drain(..)
            .map(|(subscription, records)| Notification { subscription, records })
            .collect()
    }
}

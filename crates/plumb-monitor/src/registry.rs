//! The observation registry.
//!
//! [`RegistryState`] owns every subscription and monitor record. All
//! operations take the state and the host explicitly; nothing lives in
//! process-wide statics.
//!
//! Subscription lifecycle:
//!
//! ```text
//! register ──> Active ──stop──> Stopped ──start──> Active
//!                │                 │
//!                └─ destroy/release ┴──> (purged)
//! ```

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};
use plumb_codec::encode;
use plumb_core::{
    Align, Baseline, ChangeFeed, Defaults, DefaultsPatch, EncodingKind, Host, MonitorError,
    MonitorId, NodeId, ObserveConfig, SubscriptionId, MONITOR_ID_ATTR, OBSERVER_ID_ATTR,
    TRANSFORM_ATTR,
};
use tracing::{debug, trace, warn};

use crate::policy;
use crate::recorder;

/// Upper bound on drain rounds in one [`RegistryState::process_pending`] call.
pub const MAX_DISPATCH_ROUNDS: usize = 8;

/// Whether a subscription currently receives notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Active,
    Stopped,
}

/// One tracked text node.
#[derive(Debug, Clone)]
pub struct WatchedNode {
    pub node: NodeId,
    pub owner: MonitorId,
    pub align: Align,
    pub baseline: Baseline,
    /// Grammar pinned on first successful decode
    pub encoding: Option<EncodingKind>,
    decode_warned: bool,
}

/// A watched node paired with its notification handle.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub watched: WatchedNode,
    pub state: SubscriptionState,
    pub config: ObserveConfig,
    /// Set when the node disappeared from the host; purged on the next stop/destroy
    pub orphaned: bool,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.state == SubscriptionState::Active
    }
}

/// A monitor's owner record.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorRecord {
    pub id: MonitorId,
    pub container: NodeId,
    pub align: Align,
    pub config: ObserveConfig,
}

/// What handling one notification did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DispatchOutcome {
    /// The transform was rewritten
    Repositioned { from: f64, to: f64 },
    /// Nothing to correct
    Unchanged,
    /// Unknown or stopped subscription; dropped
    Stale,
    /// The node is gone from the host
    Orphaned,
    /// The width could not be read
    MeasurementUnavailable,
    /// The transform could not be decoded; only the width is tracked
    DecodeFailure,
}

/// Totals for one [`RegistryState::process_pending`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub rounds: usize,
    pub dispatched: usize,
    pub repositioned: usize,
}

/// Every subscription and monitor known to one engine instance.
#[derive(Debug, Default)]
pub struct RegistryState {
    subscriptions: IndexMap<SubscriptionId, Subscription>,
    monitors: IndexMap<MonitorId, MonitorRecord>,
    /// Owner id -> its subscriptions, stopped ones included
    owners: IndexMap<MonitorId, IndexSet<SubscriptionId>>,
    observed: HashMap<NodeId, SubscriptionId>,
    defaults: Defaults,
    next_id: u64,
}

impl RegistryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(defaults: Defaults) -> Self {
        Self {
            defaults,
            ..Self::default()
        }
    }

    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    pub fn configure_defaults(&mut self, patch: DefaultsPatch) {
        self.defaults.apply(patch);
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub(crate) fn allocate_monitor_id(&mut self) -> MonitorId {
        MonitorId(self.next_id())
    }

    pub(crate) fn insert_monitor(&mut self, record: MonitorRecord) {
        self.owners.entry(record.id).or_default();
        self.monitors.insert(record.id, record);
    }

    pub fn monitor(&self, id: MonitorId) -> Option<&MonitorRecord> {
        self.monitors.get(&id)
    }

    pub fn monitors(&self) -> impl Iterator<Item = &MonitorRecord> {
        self.monitors.values()
    }

    pub fn subscription(&self, id: SubscriptionId) -> Option<&Subscription> {
        self.subscriptions.get(&id)
    }

    /// Subscriptions owned by `owner`, in registration order.
    pub fn subscriptions_of(&self, owner: MonitorId) -> impl Iterator<Item = &Subscription> {
        self.owners
            .get(&owner)
            .into_iter()
            .flatten()
            .filter_map(|id| self.subscriptions.get(id))
    }

    /// Total number of subscriptions, active and stopped.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn active_count(&self) -> usize {
        self.subscriptions.values().filter(|s| s.is_active()).count()
    }

    /// The subscription watching `node`, if any.
    pub fn subscription_for(&self, node: NodeId) -> Option<&Subscription> {
        self.observed.get(&node).and_then(|id| self.subscriptions.get(id))
    }

    pub fn is_observed(&self, node: NodeId) -> bool {
        self.observed.contains_key(&node)
    }

    /// Reject nodes that already belong to a subscription, or repeat in `nodes`.
    pub fn check_unobserved(&self, nodes: &[NodeId], owner: MonitorId) -> Result<(), MonitorError> {
        let mut seen = HashSet::with_capacity(nodes.len());
        for &node in nodes {
            if let Some(existing) = self.subscription_for(node) {
                return Err(MonitorError::AlreadyObserved {
                    node,
                    owner: existing.watched.owner,
                });
            }
            if !seen.insert(node) {
                return Err(MonitorError::AlreadyObserved { node, owner });
            }
        }
        Ok(())
    }

    /// Snapshot, mark, and observe each node under `owner`.
    ///
    /// Every node is validated before any is registered, so an error leaves
    /// the registry untouched.
    pub fn register<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        owner: MonitorId,
        nodes: &[NodeId],
        align: Align,
        config: ObserveConfig,
    ) -> Result<Vec<SubscriptionId>, MonitorError> {
        if !self.monitors.contains_key(&owner) {
            return Err(MonitorError::UnknownMonitor { id: owner });
        }
        self.check_unobserved(nodes, owner)?;
        if config.is_empty() && !nodes.is_empty() {
            warn!(monitor = %owner, "observe config selects no change kinds, nodes will not be realigned");
        }

        let mut registered = Vec::with_capacity(nodes.len());
        for &node in nodes {
            let id = SubscriptionId(self.next_id());
            let snapshot = recorder::snapshot(&*host, node, None);
            if snapshot.kind.is_none() {
                warn!(node = %node, "transform not decodable, tracking width only");
            }

            host.set_attribute(node, OBSERVER_ID_ATTR, &id.to_string());
            host.observe(node, config, id);

            self.subscriptions.insert(
                id,
                Subscription {
                    id,
                    watched: WatchedNode {
                        node,
                        owner,
                        align,
                        baseline: snapshot.baseline,
                        encoding: snapshot.kind,
                        decode_warned: snapshot.kind.is_none(),
                    },
                    state: SubscriptionState::Active,
                    config,
                    orphaned: false,
                },
            );
            self.owners.entry(owner).or_default().insert(id);
            self.observed.insert(node, id);
            registered.push(id);
        }

        debug!(monitor = %owner, count = registered.len(), align = %align, "registered subscriptions");
        Ok(registered)
    }

    /// Re-snapshot and re-observe every stopped subscription of `owner`.
    pub fn start<H: Host + ?Sized>(&mut self, host: &mut H, owner: MonitorId) -> Result<usize, MonitorError> {
        let ids = self.owned_ids(owner)?;
        let mut started = 0;

        for id in ids {
            let Some(sub) = self.subscriptions.get_mut(&id) else {
                continue;
            };
            if sub.is_active() || sub.orphaned {
                continue;
            }

            let node = sub.watched.node;
            if !host.contains(node) {
                sub.orphaned = true;
                continue;
            }

            let snapshot = recorder::snapshot(&*host, node, sub.watched.encoding);
            sub.watched.baseline = snapshot.baseline;
            sub.watched.encoding = snapshot.kind;
            host.observe(node, sub.config, id);
            sub.state = SubscriptionState::Active;
            started += 1;
        }

        debug!(monitor = %owner, started, "started");
        Ok(started)
    }

    /// Disconnect every active subscription of `owner`, keeping its state.
    ///
    /// Subscriptions whose node has left the host are purged.
    pub fn stop<H: Host + ?Sized>(&mut self, host: &mut H, owner: MonitorId) -> Result<usize, MonitorError> {
        let ids = self.owned_ids(owner)?;
        let stopped = self.stop_ids(host, ids);
        debug!(monitor = %owner, stopped, "stopped");
        Ok(stopped)
    }

    /// Purge every subscription of `owner`, keeping the owner record.
    ///
    /// Released nodes lose their observer marker and can be picked up again
    /// by a later registration.
    pub fn release<H: Host + ?Sized>(&mut self, host: &mut H, owner: MonitorId) -> Result<usize, MonitorError> {
        let ids = self.owned_ids(owner)?;
        let released = ids.len();
        for id in ids {
            self.purge(host, id);
        }
        debug!(monitor = %owner, released, "released subscriptions");
        Ok(released)
    }

    /// Purge every subscription regardless of owner.
    pub fn stop_all<H: Host + ?Sized>(&mut self, host: &mut H) -> usize {
        let ids: Vec<SubscriptionId> = self.subscriptions.keys().copied().collect();
        let released = ids.len();
        for id in ids {
            self.purge(host, id);
        }
        debug!(released, "released all subscriptions");
        released
    }

    fn stop_ids<H: Host + ?Sized>(&mut self, host: &mut H, ids: Vec<SubscriptionId>) -> usize {
        let mut stopped = 0;
        for id in ids {
            let Some(sub) = self.subscriptions.get_mut(&id) else {
                continue;
            };
            if sub.orphaned || !host.contains(sub.watched.node) {
                self.purge(host, id);
            } else if sub.is_active() {
                host.disconnect(id);
                sub.state = SubscriptionState::Stopped;
                stopped += 1;
            }
        }
        stopped
    }

    /// Purge every subscription of `owner` and the owner itself.
    pub fn destroy<H: Host + ?Sized>(&mut self, host: &mut H, owner: MonitorId) -> Result<usize, MonitorError> {
        let ids = self.owned_ids(owner)?;
        let removed = ids.len();
        for id in ids {
            self.purge(host, id);
        }
        self.owners.shift_remove(&owner);

        if let Some(record) = self.monitors.shift_remove(&owner) {
            let marked = host.attribute(record.container, MONITOR_ID_ATTR);
            if marked.as_deref() == Some(owner.to_string().as_str()) {
                host.remove_attribute(record.container, MONITOR_ID_ATTR);
            }
            host.release(record.container);
        }

        debug!(monitor = %owner, removed, "destroyed");
        Ok(removed)
    }

    /// Destroy every monitor.
    pub fn destroy_all<H: Host + ?Sized>(&mut self, host: &mut H) -> usize {
        let owners: Vec<MonitorId> = self.monitors.keys().copied().collect();
        owners
            .into_iter()
            .filter_map(|owner| self.destroy(host, owner).ok())
            .sum()
    }

    fn owned_ids(&self, owner: MonitorId) -> Result<Vec<SubscriptionId>, MonitorError> {
        self.owners
            .get(&owner)
            .map(|ids| ids.iter().copied().collect())
            .ok_or(MonitorError::UnknownMonitor { id: owner })
    }

    fn purge<H: Host + ?Sized>(&mut self, host: &mut H, id: SubscriptionId) {
        let Some(sub) = self.subscriptions.shift_remove(&id) else {
            return;
        };

        host.disconnect(id);
        let node = sub.watched.node;
        host.remove_attribute(node, OBSERVER_ID_ATTR);
        if self.observed.get(&node) == Some(&id) {
            self.observed.remove(&node);
        }
        if let Some(ids) = self.owners.get_mut(&sub.watched.owner) {
            ids.shift_remove(&id);
        }
        host.release(node);
    }

    /// Handle one change notification for `id`.
    ///
    /// Stale notifications, missing nodes, unreadable widths, and undecodable
    /// transforms all leave the node untouched.
    pub fn on_notification<H: Host + ?Sized>(&mut self, host: &mut H, id: SubscriptionId) -> DispatchOutcome {
        let Some(sub) = self.subscriptions.get_mut(&id) else {
            return DispatchOutcome::Stale;
        };
        if !sub.is_active() {
            return DispatchOutcome::Stale;
        }

        let watched = &mut sub.watched;
        let node = watched.node;
        if sub.orphaned || !host.contains(node) {
            sub.orphaned = true;
            return DispatchOutcome::Orphaned;
        }

        // Empty text measures 0; keep the last real baseline until it refills.
        let Some(width) = host.measure_width(node).filter(|w| w.is_finite() && *w > 0.0) else {
            return DispatchOutcome::MeasurementUnavailable;
        };

        let value = host.attribute(node, TRANSFORM_ATTR).unwrap_or_default();
        let Some(decoded) = recorder::decode_pinned(&value, watched.encoding) else {
            if !watched.decode_warned {
                warn!(node = %node, transform = %value, "transform not decodable, tracking width only");
                watched.decode_warned = true;
            }
            watched.baseline.width = width;
            return DispatchOutcome::DecodeFailure;
        };

        if watched.encoding.is_none() {
            watched.encoding = Some(decoded.kind());
            watched.baseline.offset_x = decoded.x();
            watched.baseline.offset_y = decoded.y();
        }

        let Some(new_x) = policy::reposition(&watched.baseline, Some(width), watched.align) else {
            return DispatchOutcome::Unchanged;
        };

        let from = watched.baseline.offset_x;
        let encoded = encode(&decoded, new_x);
        policy::advance(&mut watched.baseline, new_x, width);
        host.set_attribute(node, TRANSFORM_ATTR, &encoded);

        trace!(subscription = %id, node = %node, from, to = new_x, width, "repositioned");
        DispatchOutcome::Repositioned { from, to: new_x }
    }

    /// Drain the host's change feed and dispatch until it is quiet.
    ///
    /// Each write-back queues one follow-up batch that settles as
    /// [`DispatchOutcome::Unchanged`]; at most [`MAX_DISPATCH_ROUNDS`] rounds run.
    pub fn process_pending<H: ChangeFeed + ?Sized>(&mut self, host: &mut H) -> DispatchReport {
        let mut report = DispatchReport::default();

        while report.rounds < MAX_DISPATCH_ROUNDS {
            let batch = host.drain_notifications();
            if batch.is_empty() {
                return report;
            }
            report.rounds += 1;

            for notification in batch {
                report.dispatched += 1;
                let outcome = self.on_notification(host, notification.subscription);
                if matches!(outcome, DispatchOutcome::Repositioned { .. }) {
                    report.repositioned += 1;
                }
            }
        }

        warn!(rounds = report.rounds, "notifications still pending after dispatch limit");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plumb_dom::Document;

    fn setup(transform: &str, text: &str) -> (RegistryState, Document, MonitorId, NodeId) {
        let mut doc = Document::new();
        let root = doc.root();
        let node = doc.append_with(root, "text", &[("transform", transform)], text);

        let mut state = RegistryState::new();
        let owner = state.allocate_monitor_id();
        state.insert_monitor(MonitorRecord {
            id: owner,
            container: root,
            align: Align::Center,
            config: ObserveConfig::default(),
        });
        (state, doc, owner, node)
    }

    #[test]
    fn test_register_marks_and_snapshots() {
        let (mut state, mut doc, owner, node) = setup("translate(100 20)", "abcd");
        let ids = state
            .register(&mut doc, owner, &[node], Align::Center, ObserveConfig::default())
            .unwrap();

        let sub = state.subscription(ids[0]).unwrap();
        assert!(sub.is_active());
        assert_eq!(sub.watched.baseline, Baseline::new(100.0, 20.0, 40.0));
        assert_eq!(sub.watched.encoding, Some(EncodingKind::Translate));
        assert_eq!(doc.attribute(node, OBSERVER_ID_ATTR), Some(ids[0].to_string()));
    }

    #[test]
    fn test_register_rejects_observed_node() {
        let (mut state, mut doc, owner, node) = setup("translate(100 20)", "abcd");
        state
            .register(&mut doc, owner, &[node], Align::Center, ObserveConfig::default())
            .unwrap();

        let again = state.register(&mut doc, owner, &[node], Align::Right, ObserveConfig::default());
        assert!(matches!(again, Err(MonitorError::AlreadyObserved { .. })));
        assert_eq!(state.subscription_count(), 1);
    }

    #[test]
    fn test_register_unknown_owner() {
        let (mut state, mut doc, _, node) = setup("translate(100 20)", "abcd");
        let result = state.register(&mut doc, MonitorId(999), &[node], Align::Center, ObserveConfig::default());
        assert!(matches!(result, Err(MonitorError::UnknownMonitor { .. })));
    }

    #[test]
    fn test_notification_rewrites_transform() {
        let (mut state, mut doc, owner, node) = setup("translate(100 20)", "abcd");
        let id = state
            .register(&mut doc, owner, &[node], Align::Right, ObserveConfig::default())
            .unwrap()[0];

        doc.set_text(node, "abcdef");
        let outcome = state.on_notification(&mut doc, id);

        assert_eq!(outcome, DispatchOutcome::Repositioned { from: 100.0, to: 80.0 });
        assert_eq!(doc.attribute(node, TRANSFORM_ATTR).as_deref(), Some("translate(80 20)"));
        assert_eq!(state.on_notification(&mut doc, id), DispatchOutcome::Unchanged);
    }

    #[test]
    fn test_pinned_matrix_survives_translate_shaped_value() {
        let (mut state, mut doc, owner, node) = setup("matrix(1 0 0 1 100 20)", "abcd");
        let id = state
            .register(&mut doc, owner, &[node], Align::Center, ObserveConfig::default())
            .unwrap()[0];

        doc.set_attribute(node, TRANSFORM_ATTR, "translate(100 20)");
        doc.set_text(node, "abcdef");
        assert_eq!(state.on_notification(&mut doc, id), DispatchOutcome::DecodeFailure);
        assert_eq!(doc.attribute(node, TRANSFORM_ATTR).as_deref(), Some("translate(100 20)"));
    }

    #[test]
    fn test_missing_width_is_a_noop() {
        let (mut state, mut doc, owner, node) = setup("translate(100 20)", "abcd");
        let id = state
            .register(&mut doc, owner, &[node], Align::Center, ObserveConfig::default())
            .unwrap()[0];

        doc.set_unmeasurable(node);
        assert_eq!(state.on_notification(&mut doc, id), DispatchOutcome::MeasurementUnavailable);
        assert_eq!(doc.attribute(node, TRANSFORM_ATTR).as_deref(), Some("translate(100 20)"));
    }

    #[test]
    fn test_empty_text_keeps_baseline() {
        let (mut state, mut doc, owner, node) = setup("translate(100 20)", "abcd");
        let id = state
            .register(&mut doc, owner, &[node], Align::Center, ObserveConfig::default())
            .unwrap()[0];

        doc.set_text(node, "");
        assert_eq!(state.on_notification(&mut doc, id), DispatchOutcome::MeasurementUnavailable);
        assert_eq!(
            state.subscription(id).unwrap().watched.baseline,
            Baseline::new(100.0, 20.0, 40.0)
        );
    }

    #[test]
    fn test_release_keeps_owner_record() {
        let (mut state, mut doc, owner, node) = setup("translate(100 20)", "abcd");
        state
            .register(&mut doc, owner, &[node], Align::Center, ObserveConfig::default())
            .unwrap();

        assert_eq!(state.release(&mut doc, owner).unwrap(), 1);
        assert!(state.monitor(owner).is_some());
        assert!(!state.is_observed(node));

        let again = state
            .register(&mut doc, owner, &[node], Align::Center, ObserveConfig::default())
            .unwrap();
        assert_eq!(state.subscription_for(node).map(|s| s.id), Some(again[0]));
    }

    #[test]
    fn test_undecodable_node_tracks_width_then_pins_late() {
        let (mut state, mut doc, owner, node) = setup("rotate(10)", "abcd");
        let id = state
            .register(&mut doc, owner, &[node], Align::Center, ObserveConfig::default())
            .unwrap()[0];

        doc.set_text(node, "abcdef");
        assert_eq!(state.on_notification(&mut doc, id), DispatchOutcome::DecodeFailure);
        assert_eq!(state.subscription(id).unwrap().watched.baseline.width, 60.0);

        doc.set_attribute(node, TRANSFORM_ATTR, "translate(50 5)");
        assert_eq!(state.on_notification(&mut doc, id), DispatchOutcome::Unchanged);
        let watched = &state.subscription(id).unwrap().watched;
        assert_eq!(watched.encoding, Some(EncodingKind::Translate));
        assert_eq!(watched.baseline, Baseline::new(50.0, 5.0, 60.0));

        doc.set_text(node, "abcdefgh");
        assert_eq!(
            state.on_notification(&mut doc, id),
            DispatchOutcome::Repositioned { from: 50.0, to: 40.0 }
        );
    }

    #[test]
    fn test_orphan_is_purged_on_stop() {
        let (mut state, mut doc, owner, node) = setup("translate(100 20)", "abcd");
        let id = state
            .register(&mut doc, owner, &[node], Align::Center, ObserveConfig::default())
            .unwrap()[0];

        doc.remove(node);
        assert_eq!(state.on_notification(&mut doc, id), DispatchOutcome::Orphaned);
        assert!(state.subscription(id).unwrap().orphaned);

        assert_eq!(state.stop(&mut doc, owner).unwrap(), 0);
        assert!(state.subscription(id).is_none());
        assert!(!state.is_observed(node));
    }

    #[test]
    fn test_unknown_subscription_is_stale() {
        let (mut state, mut doc, _, _) = setup("translate(100 20)", "abcd");
        assert_eq!(state.on_notification(&mut doc, SubscriptionId(77)), DispatchOutcome::Stale);
    }

    #[test]
    fn test_process_pending_settles_after_write_back() {
        let (mut state, mut doc, owner, node) = setup("translate(100 20)", "abcd");
        state
            .register(&mut doc, owner, &[node], Align::Center, ObserveConfig::default())
            .unwrap();

        doc.set_text(node, "ab");
        doc.set_text(node, "abcdef");
        let report = state.process_pending(&mut doc);

        assert_eq!(report, DispatchReport { rounds: 2, dispatched: 2, repositioned: 1 });
        assert_eq!(doc.attribute(node, TRANSFORM_ATTR).as_deref(), Some("translate(90 20)"));
        assert_eq!(doc.pending_notifications(), 0);
    }

    #[test]
    fn test_stop_all_and_destroy_all() {
        let (mut state, mut doc, owner, node) = setup("translate(100 20)", "abcd");
        state
            .register(&mut doc, owner, &[node], Align::Center, ObserveConfig::default())
            .unwrap();

        assert_eq!(state.stop_all(&mut doc), 1);
        assert_eq!(state.subscription_count(), 0);
        assert!(!state.is_observed(node));
        assert_eq!(doc.attribute(node, OBSERVER_ID_ATTR), None);
        assert_eq!(state.monitors().count(), 1);

        assert_eq!(state.destroy_all(&mut doc), 0);
        assert_eq!(state.monitors().count(), 0);
        assert!(matches!(state.start(&mut doc, owner), Err(MonitorError::UnknownMonitor { .. })));
    }
}

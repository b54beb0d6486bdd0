//! The user-facing monitor handle.

use plumb_core::{
    Align, DefaultsPatch, Host, MonitorError, MonitorId, NodeId, ObserveConfig, MONITOR_ID_ATTR,
};
use tracing::warn;

use crate::registry::{MonitorRecord, RegistryState};

/// Where a monitor looks for its text nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Container {
    /// A specific element
    Node(NodeId),
    /// The first element matching a selector, searched from the document root
    Selector(String),
}

impl From<NodeId> for Container {
    fn from(node: NodeId) -> Self {
        Container::Node(node)
    }
}

impl From<&str> for Container {
    fn from(selector: &str) -> Self {
        Container::Selector(selector.to_string())
    }
}

impl From<String> for Container {
    fn from(selector: String) -> Self {
        Container::Selector(selector)
    }
}

impl Container {
    /// Resolve to a live element of `host`.
    pub fn resolve<H: Host + ?Sized>(&self, host: &H) -> Result<NodeId, MonitorError> {
        match self {
            Container::Node(node) if host.contains(*node) => Ok(*node),
            Container::Node(node) => Err(MonitorError::InvalidContainer { node: *node }),
            Container::Selector(selector) => host
                .query_selector(host.root(), selector)?
                .ok_or_else(|| MonitorError::ContainerNotFound {
                    selector: selector.clone(),
                }),
        }
    }
}

/// Construction options for [`Monitor::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorOptions {
    pub container: Container,
    /// Descendant selector; `None` or empty watches the container itself
    pub selector: Option<String>,
    /// Falls back to the configured default alignment
    pub align: Option<Align>,
    /// Falls back to the configured default observe config
    pub config: Option<ObserveConfig>,
}

impl MonitorOptions {
    pub fn new(container: impl Into<Container>) -> Self {
        Self {
            container: container.into(),
            selector: None,
            align: None,
            config: None,
        }
    }

    pub fn selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = Some(align);
        self
    }

    pub fn config(mut self, config: ObserveConfig) -> Self {
        self.config = Some(config);
        self
    }
}

/// A handle to one group of watched text nodes.
///
/// The handle only carries the owner id; all state lives in the
/// [`RegistryState`] passed to each call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Monitor {
    id: MonitorId,
}

impl Monitor {
    /// Resolve the container and targets, then observe every target.
    ///
    /// A container without content, or a selector matching nothing, creates
    /// a monitor with no subscriptions.
    pub fn new<H: Host + ?Sized>(
        state: &mut RegistryState,
        host: &mut H,
        options: MonitorOptions,
    ) -> Result<Self, MonitorError> {
        let container = options.container.resolve(&*host)?;
        let targets = match options.selector.as_deref().map(str::trim) {
            _ if !host.has_content(container) => Vec::new(),
            Some(selector) if !selector.is_empty() => match host.query_selector_all(container, selector) {
                Ok(nodes) => nodes,
                Err(err) => {
                    host.release(container);
                    return Err(err.into());
                }
            },
            _ => vec![container],
        };

        let align = options.align.unwrap_or(state.defaults().align);
        let config = options.config.unwrap_or(state.defaults().observe);
        Self::with_targets(state, host, container, &[(align, targets)], config)
    }

    /// Observe pre-resolved targets under the owner marked on `container`.
    fn with_targets<H: Host + ?Sized>(
        state: &mut RegistryState,
        host: &mut H,
        container: NodeId,
        groups: &[(Align, Vec<NodeId>)],
        config: ObserveConfig,
    ) -> Result<Self, MonitorError> {
        let existing = owner_marked_on(state, &*host, container);
        let id = existing.unwrap_or_else(|| state.allocate_monitor_id());

        let all: Vec<NodeId> = groups.iter().flat_map(|(_, nodes)| nodes.iter().copied()).collect();
        if let Err(err) = state.check_unobserved(&all, id) {
            for node in all.into_iter().chain([container]) {
                host.release(node);
            }
            return Err(err);
        }

        if existing.is_none() {
            host.set_attribute(container, MONITOR_ID_ATTR, &id.to_string());
            state.insert_monitor(MonitorRecord {
                id,
                container,
                align: groups.first().map_or(state.defaults().align, |(align, _)| *align),
                config,
            });
        }

        for (align, nodes) in groups {
            state.register(host, id, nodes, *align, config)?;
        }
        Ok(Self { id })
    }

    pub fn id(&self) -> MonitorId {
        self.id
    }

    /// Resume every stopped subscription, re-baselining each node.
    pub fn start<H: Host + ?Sized>(&self, state: &mut RegistryState, host: &mut H) -> Result<usize, MonitorError> {
        state.start(host, self.id)
    }

    /// Pause every active subscription.
    pub fn stop<H: Host + ?Sized>(&self, state: &mut RegistryState, host: &mut H) -> Result<usize, MonitorError> {
        state.stop(host, self.id)
    }

    /// Remove every subscription and the monitor record.
    pub fn destroy<H: Host + ?Sized>(self, state: &mut RegistryState, host: &mut H) -> Result<usize, MonitorError> {
        state.destroy(host, self.id)
    }

    pub fn subscription_count(&self, state: &RegistryState) -> usize {
        state.subscriptions_of(self.id).count()
    }

    /// Watch every unobserved node under `scope` matching `selector`.
    ///
    /// `scope` defaults to the document root and `selector` to the default
    /// center class. Matching nodes use the configured default alignment.
    pub fn start_all<H: Host + ?Sized>(
        state: &mut RegistryState,
        host: &mut H,
        scope: Option<Container>,
        selector: Option<&str>,
    ) -> Result<Self, MonitorError> {
        let scope = resolve_scope(&*host, scope.as_ref())?;
        let selector = match selector.map(str::trim) {
            Some(selector) if !selector.is_empty() => selector.to_string(),
            _ => state.defaults().class_selector(Align::Center),
        };

        let targets = unobserved_matches(state, &*host, scope, &selector)?;
        let align = state.defaults().align;
        let config = state.defaults().observe;
        Self::with_targets(state, host, scope, &[(align, targets)], config)
    }

    /// Watch the default left, center, and right classes under `scope`, each
    /// with its own alignment.
    pub fn start_all_aligned<H: Host + ?Sized>(
        state: &mut RegistryState,
        host: &mut H,
        scope: Option<Container>,
    ) -> Result<Self, MonitorError> {
        let scope = resolve_scope(&*host, scope.as_ref())?;
        let mut groups = Vec::with_capacity(3);
        for align in [Align::Left, Align::Center, Align::Right] {
            let selector = state.defaults().class_selector(align);
            let mut targets = unobserved_matches(state, &*host, scope, &selector)?;
            // A node carrying several alignment classes goes to the first.
            targets.retain(|node| !groups.iter().any(|(_, g): &(Align, Vec<NodeId>)| g.contains(node)));
            groups.push((align, targets));
        }

        let config = state.defaults().observe;
        Self::with_targets(state, host, scope, &groups, config)
    }

    /// Release the subscriptions of the monitor marked on `scope`, or every
    /// subscription if `None`.
    ///
    /// Released nodes are unmarked, so a later [`Monitor::start_all`] picks
    /// them up with fresh baselines. A scope without a live monitor mark is
    /// reported and left alone.
    pub fn stop_all<H: Host + ?Sized>(
        state: &mut RegistryState,
        host: &mut H,
        scope: Option<Container>,
    ) -> Result<usize, MonitorError> {
        let Some(scope) = scope else {
            return Ok(state.stop_all(host));
        };

        let container = scope.resolve(&*host)?;
        match owner_marked_on(state, &*host, container) {
            Some(owner) => state.release(host, owner),
            None => {
                warn!(container = %container, "monitor not found");
                Ok(0)
            }
        }
    }

    /// Destroy every monitor and subscription.
    pub fn destroy_all<H: Host + ?Sized>(state: &mut RegistryState, host: &mut H) -> usize {
        state.destroy_all(host)
    }

    /// Override selected defaults for monitors created afterwards.
    pub fn configure_defaults(state: &mut RegistryState, patch: DefaultsPatch) {
        state.configure_defaults(patch);
    }
}

/// The live owner id stored in `container`'s monitor marker.
fn owner_marked_on<H: Host + ?Sized>(state: &RegistryState, host: &H, container: NodeId) -> Option<MonitorId> {
    host.attribute(container, MONITOR_ID_ATTR)
        .and_then(|marker| marker.parse::<MonitorId>().ok())
        .filter(|id| state.monitor(*id).is_some())
}

fn resolve_scope<H: Host + ?Sized>(host: &H, scope: Option<&Container>) -> Result<NodeId, MonitorError> {
    match scope {
        Some(container) => container.resolve(host),
        None => Ok(host.root()),
    }
}

fn unobserved_matches<H: Host + ?Sized>(
    state: &RegistryState,
    host: &H,
    scope: NodeId,
    selector: &str,
) -> Result<Vec<NodeId>, MonitorError> {
    let mut nodes = host.query_selector_all(scope, selector)?;
    nodes.retain(|node| !state.is_observed(*node));
    Ok(nodes)
}

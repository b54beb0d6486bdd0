//! Reactive realignment of SVG text against a fixed anchor.
//!
//! A [`Monitor`] watches a group of text nodes. When a node's rendered width
//! changes, its `transform` is rewritten so that its left edge, center, or
//! right edge stays where it was.
//!
//! # Architecture
//!
//! 1. **Recorder**: snapshots each node's decoded offset and measured width
//! 2. **Policy**: turns a width change into a corrected x offset
//! 3. **Registry**: owns subscriptions, runs start/stop/destroy, and
//!    dispatches change notifications
//! 4. **Monitor**: the owner handle callers hold
//!
//! # Example
//!
//! ```
//! use plumb_core::{Align, Host};
//! use plumb_dom::Document;
//! use plumb_monitor::{Monitor, MonitorOptions, RegistryState};
//!
//! let mut doc = Document::new();
//! let root = doc.root();
//! let svg = doc.append(root, "svg");
//! let label = doc.append_with(svg, "text", &[("class", "text-m"), ("transform", "translate(100 20)")], "abcd");
//!
//! let mut state = RegistryState::new();
//! let monitor = Monitor::new(&mut state, &mut doc, MonitorOptions::new(svg).selector(".text-m").align(Align::Center))?;
//! assert_eq!(monitor.subscription_count(&state), 1);
//!
//! doc.set_text(label, "abcdef");
//! state.process_pending(&mut doc);
//! assert_eq!(doc.attribute(label, "transform").as_deref(), Some("translate(90 20)"));
//! # Ok::<(), plumb_core::MonitorError>(())
//! ```

pub mod config;
pub mod policy;
pub mod recorder;
mod monitor;
mod registry;

pub use config::{defaults_from_json, patch_from_json, ConfigError};
pub use monitor::{Container, Monitor, MonitorOptions};
pub use registry::{
    DispatchOutcome, DispatchReport, MonitorRecord, RegistryState, Subscription, SubscriptionState,
    WatchedNode, MAX_DISPATCH_ROUNDS,
};

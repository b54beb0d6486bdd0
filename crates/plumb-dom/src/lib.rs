//! In-memory element tree for the Plumb realignment engine.
//!
//! [`Document`] implements [`plumb_core::Host`] and [`plumb_core::ChangeFeed`]:
//! a selector engine, attribute storage, monospace text measurement, and a
//! coalescing queue that turns mutations into notification batches.
//!
//! # Example
//!
//! ```
//! use plumb_core::Host;
//! use plumb_dom::Document;
//!
//! let mut doc = Document::new();
//! let root = doc.root();
//! let label = doc.append_with(root, "text", &[("class", "text-m")], "Total");
//!
//! assert_eq!(doc.query_selector_all(root, ".text-m").unwrap(), vec![label]);
//! assert_eq!(doc.measure_width(label), Some(50.0));
//! ```

mod observe;
mod selector;
mod tree;

pub use observe::MutationKind;
pub use selector::SelectorList;
pub use tree::{Document, Element, DEFAULT_ADVANCE};

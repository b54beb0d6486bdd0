//! Arena-backed element tree.
//!
//! Every mutation goes through [`Document`] so it can be reported to
//! matching observers. Removed elements leave a hole in the arena; their
//! ids are never reused.

use std::collections::HashMap;

use indexmap::IndexMap;
use plumb_core::{
    ChangeFeed, Host, NodeId, Notification, ObserveConfig, SelectorError, SubscriptionId,
};

use crate::observe::{MutationKind, MutationQueue};
use crate::selector::SelectorList;

/// Horizontal advance per character used when measuring text.
pub const DEFAULT_ADVANCE: f64 = 10.0;

/// Tags whose content width can be measured.
const TEXT_TAGS: &[&str] = &["text", "tspan", "textPath"];

/// One element in the tree.
#[derive(Debug, Clone)]
pub struct Element {
    tag: String,
    attributes: IndexMap<String, String>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Element {
    fn new(tag: &str, parent: Option<NodeId>) -> Self {
        Self {
            tag: tag.to_string(),
            attributes: IndexMap::new(),
            text: String::new(),
            parent,
            children: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Check the whitespace-separated `class` attribute.
    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .map_or(false, |classes| classes.split_whitespace().any(|c| c == class))
    }

    /// Text directly owned by this element.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    fn is_text_bearing(&self) -> bool {
        TEXT_TAGS.iter().any(|t| self.tag.eq_ignore_ascii_case(t))
    }
}

/// How a node's width is reported, overriding text measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
enum WidthOverride {
    Fixed(f64),
    Unavailable,
}

/// An in-memory document.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Option<Element>>,
    root: NodeId,
    advance: f64,
    widths: HashMap<NodeId, WidthOverride>,
    queue: MutationQueue,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document holding only its root.
    pub fn new() -> Self {
        Self::with_advance(DEFAULT_ADVANCE)
    }

    /// Create a document measuring text at `advance` units per character.
    pub fn with_advance(advance: f64) -> Self {
        Self {
            nodes: vec![Some(Element::new("#root", None))],
            root: NodeId(0),
            advance,
            widths: HashMap::new(),
            queue: MutationQueue::default(),
        }
    }

    pub fn element(&self, node: NodeId) -> Option<&Element> {
        self.nodes.get(node.0 as usize).and_then(|n| n.as_ref())
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut Element> {
        self.nodes.get_mut(node.0 as usize).and_then(|n| n.as_mut())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.element(node).and_then(|e| e.parent)
    }

    /// Number of live elements, including the root.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Append a new empty element under `parent`.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is not a live element.
    pub fn append(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u64);
        self.element_mut(parent)
            .unwrap_or_else(|| panic!("append to missing parent {}", parent))
            .children
            .push(id);
        self.nodes.push(Some(Element::new(tag, Some(parent))));
        self.record(parent, MutationKind::ChildList);
        id
    }

    /// Append an element with attributes and text in one step.
    ///
    /// Only the child-list change on `parent` is reported.
    pub fn append_with(
        &mut self,
        parent: NodeId,
        tag: &str,
        attributes: &[(&str, &str)],
        text: &str,
    ) -> NodeId {
        let id = self.append(parent, tag);
        if let Some(element) = self.element_mut(id) {
            for (name, value) in attributes {
                element.attributes.insert(name.to_string(), value.to_string());
            }
            element.text = text.to_string();
        }
        id
    }

    /// Replace the text directly owned by `node`.
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(element) = self.element_mut(node) {
            element.text = text.to_string();
            self.record(node, MutationKind::CharacterData);
        }
    }

    /// Detach `node` and its subtree from the document.
    pub fn remove(&mut self, node: NodeId) {
        if node == self.root {
            return;
        }
        let Some(parent) = self.parent(node) else {
            return;
        };

        self.record(parent, MutationKind::ChildList);
        if let Some(element) = self.element_mut(parent) {
            element.children.retain(|&c| c != node);
        }

        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if let Some(element) = self.nodes.get_mut(current.0 as usize).and_then(Option::take) {
                stack.extend(element.children);
            }
            self.widths.remove(&current);
        }
    }

    /// Concatenated text of `node` and its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        if let Some(element) = self.element(node) {
            out.push_str(&element.text);
            for &child in &element.children {
                self.collect_text(child, out);
            }
        }
    }

    /// Report `width` for `node` regardless of its text. Not a mutation.
    pub fn set_fixed_width(&mut self, node: NodeId, width: f64) {
        self.widths.insert(node, WidthOverride::Fixed(width));
    }

    /// Make width measurement of `node` fail.
    pub fn set_unmeasurable(&mut self, node: NodeId) {
        self.widths.insert(node, WidthOverride::Unavailable);
    }

    pub fn clear_width_override(&mut self, node: NodeId) {
        self.widths.remove(&node);
    }

    /// True if `ancestor` is a proper ancestor of `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    /// Descendants of `scope` in document order, excluding `scope`.
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self
            .element(scope)
            .map(|e| e.children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(node) = stack.pop() {
            out.push(node);
            if let Some(element) = self.element(node) {
                stack.extend(element.children.iter().rev().copied());
            }
        }
        out
    }

    /// Number of queued notification batches.
    pub fn pending_notifications(&self) -> usize {
        self.queue.pending()
    }

    fn record(&mut self, target: NodeId, kind: MutationKind) {
        let matching: Vec<SubscriptionId> = self
            .queue
            .observers()
            .filter(|(_, observer)| {
                observer.accepts(kind)
                    && (observer.node == target
                        || (observer.config.subtree && self.is_ancestor(observer.node, target)))
            })
            .map(|(id, _)| id)
            .collect();

        for subscription in matching {
            self.queue.push(subscription);
        }
    }
}

impl Host for Document {
    fn root(&self) -> NodeId {
        self.root
    }

    fn contains(&self, node: NodeId) -> bool {
        self.element(node).is_some()
    }

    fn has_content(&self, node: NodeId) -> bool {
        self.element(node)
            .map_or(false, |e| !e.children.is_empty() || !e.text.is_empty())
    }

    fn query_selector(&self, scope: NodeId, selector: &str) -> Result<Option<NodeId>, SelectorError> {
        let selector = SelectorList::parse(selector)?;
        Ok(self
            .descendants(scope)
            .into_iter()
            .find(|&node| selector.matches(self, node)))
    }

    fn query_selector_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        let selector = SelectorList::parse(selector)?;
        Ok(self
            .descendants(scope)
            .into_iter()
            .filter(|&node| selector.matches(self, node))
            .collect())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.element(node)
            .and_then(|e| e.attribute(name))
            .map(str::to_string)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(element) = self.element_mut(node) {
            element.attributes.insert(name.to_string(), value.to_string());
            self.record(node, MutationKind::Attribute);
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        let removed = self
            .element_mut(node)
            .map_or(false, |e| e.attributes.shift_remove(name).is_some());
        if removed {
            self.record(node, MutationKind::Attribute);
        }
    }

    fn measure_width(&self, node: NodeId) -> Option<f64> {
        let element = self.element(node)?;
        match self.widths.get(&node) {
            Some(WidthOverride::Fixed(width)) => Some(*width),
            Some(WidthOverride::Unavailable) => None,
            None if element.is_text_bearing() => {
                Some(self.text_content(node).chars().count() as f64 * self.advance)
            }
            None => None,
        }
    }

    fn observe(&mut self, node: NodeId, config: ObserveConfig, subscription: SubscriptionId) {
        self.queue.observe(subscription, node, config);
    }

    fn disconnect(&mut self, subscription: SubscriptionId) {
        self.queue.disconnect(subscription);
    }
}

impl ChangeFeed for Document {
    fn drain_notifications(&mut self) -> Vec<Notification> {
        self.queue.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_text_content() {
        let mut doc = Document::new();
        let root = doc.root();
        let text = doc.append_with(root, "text", &[("class", "text-m")], "Hi ");
        let span = doc.append_with(text, "tspan", &[], "there");

        assert_eq!(doc.text_content(text), "Hi there");
        assert_eq!(doc.parent(span), Some(text));
        assert!(doc.is_ancestor(root, span));
        assert_eq!(doc.descendants(root), vec![text, span]);
    }

    #[test]
    fn test_measure_width() {
        let mut doc = Document::with_advance(8.0);
        let root = doc.root();
        let text = doc.append_with(root, "text", &[], "abcde");
        let group = doc.append(root, "g");

        assert_eq!(doc.measure_width(text), Some(40.0));
        assert_eq!(doc.measure_width(group), None);

        doc.set_fixed_width(text, 12.5);
        assert_eq!(doc.measure_width(text), Some(12.5));
        doc.set_unmeasurable(text);
        assert_eq!(doc.measure_width(text), None);
        doc.clear_width_override(text);
        assert_eq!(doc.measure_width(text), Some(40.0));
    }

    #[test]
    fn test_query_selector_all_excludes_scope() {
        let mut doc = Document::new();
        let root = doc.root();
        let svg = doc.append_with(root, "svg", &[("class", "text-m")], "");
        let a = doc.append_with(svg, "text", &[("class", "text-m")], "a");
        let b = doc.append_with(svg, "text", &[("class", "text-m")], "b");

        assert_eq!(doc.query_selector_all(svg, ".text-m").unwrap(), vec![a, b]);
        assert_eq!(doc.query_selector_all(root, ".text-m").unwrap(), vec![svg, a, b]);
        assert_eq!(doc.query_selector(root, "text").unwrap(), Some(a));
        assert!(doc.query_selector_all(root, "..").is_err());
    }

    #[test]
    fn test_remove_detaches_subtree() {
        let mut doc = Document::new();
        let root = doc.root();
        let group = doc.append(root, "g");
        let text = doc.append_with(group, "text", &[], "x");

        doc.remove(group);
        assert!(!doc.contains(group));
        assert!(!doc.contains(text));
        assert!(doc.is_empty());
    }

    #[test]
    fn test_mutations_notify_observers() {
        let mut doc = Document::new();
        let root = doc.root();
        let text = doc.append_with(root, "text", &[], "x");
        let span = doc.append_with(text, "tspan", &[], "y");

        doc.observe(text, ObserveConfig::default(), SubscriptionId(1));
        doc.set_text(span, "longer");
        doc.set_attribute(text, "transform", "translate(1 2)");

        let batches = doc.drain_notifications();
        assert_eq!(batches, vec![Notification { subscription: SubscriptionId(1), records: 2 }]);
        assert!(doc.drain_notifications().is_empty());
    }

    #[test]
    fn test_config_filters_mutation_kinds() {
        let mut doc = Document::new();
        let root = doc.root();
        let text = doc.append_with(root, "text", &[], "x");
        let span = doc.append_with(text, "tspan", &[], "y");

        let config = ObserveConfig {
            attributes: true,
            character_data: true,
            child_list: true,
            subtree: false,
        };
        doc.observe(text, config, SubscriptionId(1));
        doc.set_text(span, "ignored");
        assert_eq!(doc.pending_notifications(), 0);

        doc.disconnect(SubscriptionId(1));
        doc.set_text(text, "also ignored");
        assert_eq!(doc.pending_notifications(), 0);
    }
}

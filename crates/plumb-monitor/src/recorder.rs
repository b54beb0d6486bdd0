//! Baseline snapshots of a node's offset and width.

use plumb_codec::{decode, decode_as, Decoded};
use plumb_core::{Baseline, EncodingKind, Host, NodeId, TRANSFORM_ATTR};

/// A baseline plus the encoding kind it was read with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub baseline: Baseline,
    /// `None` if the transform could not be decoded
    pub kind: Option<EncodingKind>,
}

/// Decode `value` under the pinned kind, or try both grammars if unpinned.
pub fn decode_pinned(value: &str, pinned: Option<EncodingKind>) -> Option<Decoded<'_>> {
    match pinned {
        Some(kind) => decode_as(value, kind),
        None => decode(value),
    }
}

/// Measured width, with 0 standing in for unavailable or nonsensical values.
pub fn measured_width<H: Host + ?Sized>(host: &H, node: NodeId) -> f64 {
    host.measure_width(node)
        .filter(|w| w.is_finite() && *w > 0.0)
        .unwrap_or(0.0)
}

/// Snapshot the node's current offset and width.
///
/// A transform that does not decode yields zero offsets; the width is still
/// recorded.
pub fn snapshot<H: Host + ?Sized>(host: &H, node: NodeId, pinned: Option<EncodingKind>) -> Snapshot {
    let width = measured_width(host, node);
    let value = host.attribute(node, TRANSFORM_ATTR).unwrap_or_default();

    match decode_pinned(&value, pinned) {
        Some(decoded) => Snapshot {
            baseline: Baseline::new(decoded.x(), decoded.y(), width),
            kind: Some(decoded.kind()),
        },
        None => Snapshot {
            baseline: Baseline::new(0.0, 0.0, width),
            kind: pinned,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plumb_dom::Document;

    #[test]
    fn test_snapshot_translate() {
        let mut doc = Document::new();
        let root = doc.root();
        let text = doc.append_with(root, "text", &[("transform", "translate(100 20)")], "abcd");

        let snap = snapshot(&doc, text, None);
        assert_eq!(snap.baseline, Baseline::new(100.0, 20.0, 40.0));
        assert_eq!(snap.kind, Some(EncodingKind::Translate));
    }

    #[test]
    fn test_snapshot_matrix() {
        let mut doc = Document::new();
        let root = doc.root();
        let text = doc.append_with(root, "text", &[("transform", "matrix(1 0 0 1 30 40)")], "ab");

        let snap = snapshot(&doc, text, None);
        assert_eq!(snap.baseline, Baseline::new(30.0, 40.0, 20.0));
        assert_eq!(snap.kind, Some(EncodingKind::Matrix));
    }

    #[test]
    fn test_pinned_kind_is_not_retried() {
        let mut doc = Document::new();
        let root = doc.root();
        let text = doc.append_with(root, "text", &[("transform", "translate(5 6)")], "ab");

        let snap = snapshot(&doc, text, Some(EncodingKind::Matrix));
        assert_eq!(snap.baseline, Baseline::new(0.0, 0.0, 20.0));
        assert_eq!(snap.kind, Some(EncodingKind::Matrix));
    }

    #[test]
    fn test_undecodable_or_unmeasurable_degrades() {
        let mut doc = Document::new();
        let root = doc.root();
        let text = doc.append_with(root, "text", &[("transform", "rotate(45)")], "abc");

        let snap = snapshot(&doc, text, None);
        assert_eq!(snap.baseline, Baseline::new(0.0, 0.0, 30.0));
        assert_eq!(snap.kind, None);

        doc.set_unmeasurable(text);
        assert_eq!(snapshot(&doc, text, None).baseline.width, 0.0);
    }
}

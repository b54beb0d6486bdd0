//! Anchor-preserving offset correction.

use plumb_core::{Align, Baseline};

/// Compute the corrected x offset for a width change, or `None` for no-op.
///
/// Nodes without a measured baseline width, nodes sitting at x = 0, and
/// left-aligned nodes are never moved. A current width of 0 is treated as
/// unmeasured, not as shrinkage.
pub fn reposition(baseline: &Baseline, current_width: Option<f64>, align: Align) -> Option<f64> {
    let width = current_width.filter(|w| w.is_finite() && *w > 0.0)?;
    if !baseline.is_measured() || baseline.offset_x == 0.0 || width == baseline.width {
        return None;
    }

    let diff = width - baseline.width;
    match align {
        Align::Left => None,
        Align::Center => Some(baseline.offset_x - diff / 2.0),
        Align::Right => Some(baseline.offset_x - diff),
    }
}

/// Move the baseline to the corrected state so the next change diffs against it.
pub fn advance(baseline: &mut Baseline, new_offset_x: f64, current_width: f64) {
    baseline.offset_x = new_offset_x;
    baseline.width = current_width;
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Baseline = Baseline { offset_x: 100.0, offset_y: 10.0, width: 40.0 };

    #[test]
    fn test_center_shifts_by_half_growth() {
        assert_eq!(reposition(&BASE, Some(60.0), Align::Center), Some(90.0));
        assert_eq!(reposition(&BASE, Some(20.0), Align::Center), Some(110.0));
    }

    #[test]
    fn test_right_shifts_by_full_growth() {
        assert_eq!(reposition(&BASE, Some(60.0), Align::Right), Some(80.0));
    }

    #[test]
    fn test_left_never_moves() {
        assert_eq!(reposition(&BASE, Some(60.0), Align::Left), None);
        assert_eq!(reposition(&BASE, Some(5.0), Align::Left), None);
    }

    #[test]
    fn test_unchanged_width_is_noop_for_every_alignment() {
        for align in [Align::Left, Align::Center, Align::Right] {
            assert_eq!(reposition(&BASE, Some(40.0), align), None);
        }
    }

    #[test]
    fn test_exempt_baselines() {
        let unmeasured = Baseline { width: 0.0, ..BASE };
        let at_origin = Baseline { offset_x: 0.0, ..BASE };
        assert_eq!(reposition(&unmeasured, Some(60.0), Align::Center), None);
        assert_eq!(reposition(&at_origin, Some(60.0), Align::Center), None);
        assert_eq!(reposition(&BASE, None, Align::Center), None);
        assert_eq!(reposition(&BASE, Some(f64::NAN), Align::Center), None);
    }

    #[test]
    fn test_zero_width_is_not_shrinkage() {
        assert_eq!(reposition(&BASE, Some(0.0), Align::Center), None);
        assert_eq!(reposition(&BASE, Some(0.0), Align::Right), None);
    }

    #[test]
    fn test_advance_makes_repeat_a_noop() {
        let mut baseline = BASE;
        let new_x = reposition(&baseline, Some(60.0), Align::Center).unwrap();
        advance(&mut baseline, new_x, 60.0);

        assert_eq!(baseline, Baseline { offset_x: 90.0, offset_y: 10.0, width: 60.0 });
        assert_eq!(reposition(&baseline, Some(60.0), Align::Center), None);
        // Incremental growth diffs against the corrected state.
        assert_eq!(reposition(&baseline, Some(80.0), Align::Center), Some(80.0));
    }
}

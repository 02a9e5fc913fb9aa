//! Font size change reconciliation
//!
//! A font size change reflows the text, and the reflow may take more than
//! one layout pass to finish. The depth ratio is captured before the new
//! layout lands and restored only after `settle_passes` consecutive passes
//! report no further content-height change.

use tracing::debug;

use super::math::{depth_from_position, position_from_depth};

/// Ratio captured at the moment a font size change was detected
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollRatioSnapshot {
    pub ratio_before_change: f64,
    pub pending_font_size: f64,
}

#[derive(Debug, Clone)]
pub struct FontSizeReconciler {
    previous_font_size: f64,
    settle_passes: u32,
    snapshot: Option<ScrollRatioSnapshot>,
    /// Content height seen on the last layout pass while a change is pending
    observed_height: Option<f64>,
    stable_passes: u32,
    /// Set after the restore position is handed out, until the host's next turn
    restore_in_flight: bool,
}

impl FontSizeReconciler {
    pub fn new(font_size: f64, settle_passes: u32) -> Self {
        Self {
            previous_font_size: font_size,
            settle_passes: settle_passes.max(1),
            snapshot: None,
            observed_height: None,
            stable_passes: 0,
            restore_in_flight: false,
        }
    }

    #[inline]
    pub fn font_size(&self) -> f64 {
        self.previous_font_size
    }

    /// True from a detected change until the restore write has been absorbed
    #[inline]
    pub fn is_processing_change(&self) -> bool {
        self.snapshot.is_some() || self.restore_in_flight
    }

    pub fn snapshot(&self) -> Option<ScrollRatioSnapshot> {
        self.snapshot
    }

    /// Feed the current font size; captures the ratio if it differs from the previous one
    ///
    /// Must be called before the host lays out with the new size, so that
    /// `content_height` still describes the old layout.
    ///
    /// # Returns
    /// `true` if a change was detected
    pub fn on_font_size(
        &mut self,
        font_size: f64,
        position: f64,
        content_height: f64,
        viewport_height: f64,
    ) -> bool {
        if !font_size.is_finite() || font_size <= 0.0 || font_size == self.previous_font_size {
            return false;
        }

        match self.snapshot.as_mut() {
            // Mid-reflow: the current offset is not trustworthy, keep the first ratio
            Some(snapshot) => {
                snapshot.pending_font_size = font_size;
            }
            None => {
                let ratio = depth_from_position(position, content_height, viewport_height);
                debug!(
                    from = self.previous_font_size,
                    to = font_size,
                    ratio,
                    "Font size change detected, captured scroll ratio"
                );
                self.snapshot = Some(ScrollRatioSnapshot {
                    ratio_before_change: ratio,
                    pending_font_size: font_size,
                });
            }
        }

        self.previous_font_size = font_size;
        self.observed_height = Some(content_height);
        self.stable_passes = 0;
        true
    }

    /// Layout-observing signal; call after every layout pass
    ///
    /// # Returns
    /// The position to restore, exactly once per change, once layout has settled
    pub fn on_layout(&mut self, content_height: f64, viewport_height: f64) -> Option<f64> {
        let snapshot = self.snapshot?;

        match self.observed_height {
            Some(prev) if prev == content_height => {
                self.stable_passes += 1;
            }
            _ => {
                self.observed_height = Some(content_height);
                self.stable_passes = 0;
                return None;
            }
        }

        if self.stable_passes < self.settle_passes {
            return None;
        }

        let position = position_from_depth(snapshot.ratio_before_change, content_height, viewport_height);
        debug!(
            ratio = snapshot.ratio_before_change,
            font_size = snapshot.pending_font_size,
            content_height,
            position,
            "Layout settled, restoring scroll ratio"
        );
        self.snapshot = None;
        self.observed_height = None;
        self.stable_passes = 0;
        self.restore_in_flight = true;
        Some(position)
    }

    /// Scheduler turn boundary: the restore write's scroll event has been delivered
    pub fn end_turn(&mut self) {
        self.restore_in_flight = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Content height of a script whose height scales linearly with font size
    fn height_for(font_size: f64) -> f64 {
        3000.0 * font_size / 28.0
    }

    #[test]
    fn test_same_size_is_not_a_change() {
        let mut reconciler = FontSizeReconciler::new(28.0, 2);
        assert!(!reconciler.on_font_size(28.0, 500.0, 3000.0, 1000.0));
        assert!(!reconciler.is_processing_change());
        assert_eq!(reconciler.on_layout(3000.0, 1000.0), None);
    }

    #[test]
    fn test_increase_preserves_ratio() {
        let mut reconciler = FontSizeReconciler::new(28.0, 2);
        assert!(reconciler.on_font_size(40.0, 1000.0, 3000.0, 1000.0));
        assert!(reconciler.is_processing_change());

        // First pass: new height appears
        assert_eq!(reconciler.on_layout(4200.0, 1000.0), None);
        // One confirmation is not enough
        assert_eq!(reconciler.on_layout(4200.0, 1000.0), None);
        let restored = reconciler.on_layout(4200.0, 1000.0).unwrap();
        assert!((restored - 1600.0).abs() < 1e-9);

        // Consumed exactly once
        assert_eq!(reconciler.on_layout(4200.0, 1000.0), None);
        assert!(reconciler.is_processing_change());
        reconciler.end_turn();
        assert!(!reconciler.is_processing_change());
    }

    #[test]
    fn test_decrease_preserves_ratio() {
        let v = 1000.0;
        let old_h = height_for(40.0);
        let position = 0.25 * (old_h - v);

        let mut reconciler = FontSizeReconciler::new(40.0, 2);
        reconciler.on_font_size(20.0, position, old_h, v);

        let new_h = height_for(20.0);
        let mut restored = None;
        for _ in 0..4 {
            if let Some(p) = reconciler.on_layout(new_h, v) {
                restored = Some(p);
            }
        }
        let restored = restored.unwrap();
        assert!((depth_from_position(restored, new_h, v) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_multi_pass_reflow_waits_for_final_height() {
        let mut reconciler = FontSizeReconciler::new(28.0, 2);
        reconciler.on_font_size(40.0, 1000.0, 3000.0, 1000.0);

        // Reflow lands in stages; restoring on the intermediate height would be stale
        assert_eq!(reconciler.on_layout(3600.0, 1000.0), None);
        assert_eq!(reconciler.on_layout(3600.0, 1000.0), None);
        assert_eq!(reconciler.on_layout(4200.0, 1000.0), None);
        assert_eq!(reconciler.on_layout(4200.0, 1000.0), None);
        let restored = reconciler.on_layout(4200.0, 1000.0).unwrap();
        assert!((restored - 1600.0).abs() < 1e-9);
    }

    #[test]
    fn test_second_change_keeps_first_ratio() {
        let mut reconciler = FontSizeReconciler::new(28.0, 1);
        reconciler.on_font_size(32.0, 1000.0, 3000.0, 1000.0);
        // Offset already clamped by a partial reflow, must not be re-captured
        reconciler.on_font_size(40.0, 137.0, 3400.0, 1000.0);
        let snapshot = reconciler.snapshot().unwrap();
        assert!((snapshot.ratio_before_change - 0.5).abs() < 1e-9);
        assert_eq!(snapshot.pending_font_size, 40.0);
        assert_eq!(reconciler.font_size(), 40.0);
    }

    #[test]
    fn test_invalid_size_ignored() {
        let mut reconciler = FontSizeReconciler::new(28.0, 2);
        assert!(!reconciler.on_font_size(f64::NAN, 10.0, 3000.0, 1000.0));
        assert!(!reconciler.on_font_size(0.0, 10.0, 3000.0, 1000.0));
        assert_eq!(reconciler.font_size(), 28.0);
    }
}

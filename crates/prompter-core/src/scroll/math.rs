//! Pure conversions between scroll position, depth ratio, and per-frame delta
//!
//! Every function here sanitizes its inputs: non-finite or negative values
//! collapse to zero so a corrupted measurement can never turn into a NaN
//! position downstream.

/// Replace NaN/infinite and negative values with zero
#[inline]
fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Maximum scroll offset for a content/viewport pair (never negative)
#[inline]
pub fn max_scroll(content_height: f64, viewport_height: f64) -> f64 {
    (sanitize(content_height) - sanitize(viewport_height)).max(0.0)
}

/// True iff the content is taller than the viewport
#[inline]
pub fn content_scrollable(content_height: f64, viewport_height: f64) -> bool {
    sanitize(content_height) > sanitize(viewport_height)
}

/// Clamp a position into `[0, max_scroll]`
#[inline]
pub fn clamp_position(position: f64, max_scroll: f64) -> f64 {
    sanitize(position).min(sanitize(max_scroll))
}

/// Convert a position into a depth ratio
///
/// # Returns
/// Ratio clamped to [0.0, 1.0]; 0.0 when the content does not scroll
#[inline]
pub fn depth_from_position(position: f64, content_height: f64, viewport_height: f64) -> f64 {
    let max = max_scroll(content_height, viewport_height);
    if max <= 0.0 {
        return 0.0;
    }
    (sanitize(position) / max).clamp(0.0, 1.0)
}

/// Convert a depth ratio back into a position, clamped to `[0, max_scroll]`
#[inline]
pub fn position_from_depth(ratio: f64, content_height: f64, viewport_height: f64) -> f64 {
    let max = max_scroll(content_height, viewport_height);
    clamp_position(sanitize(ratio).min(1.0) * max, max)
}

/// Distance to travel in one frame
///
/// # Arguments
/// * `speed` - Speed setting (multiplier of the base rate)
/// * `elapsed_ms` - Time since the previous processed frame
/// * `base_rate` - Pixels per second at speed 1.0
#[inline]
pub fn delta_for_frame(speed: f64, elapsed_ms: f64, base_rate: f64) -> f64 {
    sanitize(speed) * sanitize(base_rate) * sanitize(elapsed_ms) / 1000.0
}

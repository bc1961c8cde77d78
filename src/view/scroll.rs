//! Scroll position of one pane.

/// Tracks the scroll offset of a pane against its content and viewport
/// extents, as reported by the shell.
///
/// # Example
///
/// ```
/// use mdflex::view::ScrollSurface;
///
/// let mut pane = ScrollSurface::new(1000.0, 200.0);
/// pane.scroll_to(400.0);
/// assert_eq!(pane.fraction(), 0.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollSurface {
    offset: f64,
    content_extent: f64,
    viewport_extent: f64,
}

impl Default for ScrollSurface {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl ScrollSurface {
    pub fn new(content_extent: f64, viewport_extent: f64) -> Self {
        Self {
            offset: 0.0,
            content_extent: sanitize(content_extent),
            viewport_extent: sanitize(viewport_extent),
        }
    }

    pub const fn offset(&self) -> f64 {
        self.offset
    }

    pub const fn content_extent(&self) -> f64 {
        self.content_extent
    }

    pub const fn viewport_extent(&self) -> f64 {
        self.viewport_extent
    }

    /// Largest valid offset; zero when everything fits.
    pub fn max_offset(&self) -> f64 {
        (self.content_extent - self.viewport_extent).max(0.0)
    }

    /// `offset / (content - viewport)`, in `[0, 1]`. Zero when nothing
    /// scrolls.
    pub fn fraction(&self) -> f64 {
        let max = self.max_offset();
        if max <= 0.0 {
            return 0.0;
        }
        (self.offset / max).clamp(0.0, 1.0)
    }

    pub fn scroll_to(&mut self, offset: f64) {
        self.offset = sanitize(offset).min(self.max_offset());
    }

    pub fn scroll_by(&mut self, delta: f64) {
        self.scroll_to(self.offset + delta);
    }

    /// Move to the same relative position as `fraction`.
    pub fn set_fraction(&mut self, fraction: f64) {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.offset = self.max_offset() * fraction;
    }

    /// Update extents, keeping the relative scroll position.
    pub fn set_extents(&mut self, content_extent: f64, viewport_extent: f64) {
        let fraction = self.fraction();
        self.content_extent = sanitize(content_extent);
        self.viewport_extent = sanitize(viewport_extent);
        self.set_fraction(fraction);
    }

    pub fn can_scroll(&self) -> bool {
        self.max_offset() > 0.0
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_surface_starts_at_top() {
        let pane = ScrollSurface::new(1000.0, 200.0);
        assert_eq!(pane.offset(), 0.0);
        assert_eq!(pane.fraction(), 0.0);
    }

    #[test]
    fn test_scroll_clamps_to_bounds() {
        let mut pane = ScrollSurface::new(1000.0, 200.0);
        pane.scroll_by(5000.0);
        assert_eq!(pane.offset(), 800.0);
        assert_eq!(pane.fraction(), 1.0);
        pane.scroll_by(-9000.0);
        assert_eq!(pane.offset(), 0.0);
    }

    #[test]
    fn test_short_content_has_zero_fraction() {
        let mut pane = ScrollSurface::new(100.0, 200.0);
        pane.scroll_to(50.0);
        assert!(!pane.can_scroll());
        assert_eq!(pane.offset(), 0.0);
        assert_eq!(pane.fraction(), 0.0);
    }

    #[test]
    fn test_set_extents_keeps_fraction() {
        let mut pane = ScrollSurface::new(1000.0, 200.0);
        pane.set_fraction(0.25);
        assert_eq!(pane.offset(), 200.0);
        pane.set_extents(2200.0, 200.0);
        assert_eq!(pane.offset(), 500.0);
        assert_eq!(pane.fraction(), 0.25);
    }

    #[test]
    fn test_non_finite_input_is_ignored() {
        let mut pane = ScrollSurface::new(f64::NAN, 100.0);
        assert_eq!(pane.content_extent(), 0.0);
        pane.set_fraction(f64::INFINITY);
        assert_eq!(pane.offset(), 0.0);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn fraction_stays_in_unit_interval(
                content in 0.0f64..100_000.0,
                viewport in 0.0f64..5_000.0,
                offset in -10_000.0f64..200_000.0,
            ) {
                let mut pane = ScrollSurface::new(content, viewport);
                pane.scroll_to(offset);
                let fraction = pane.fraction();
                prop_assert!((0.0..=1.0).contains(&fraction));
                prop_assert!(pane.offset() >= 0.0);
                prop_assert!(pane.offset() <= pane.max_offset());
            }

            #[test]
            fn set_fraction_round_trips(
                content in 1_000.0f64..100_000.0,
                viewport in 1.0f64..900.0,
                fraction in 0.0f64..=1.0,
            ) {
                let mut pane = ScrollSurface::new(content, viewport);
                pane.set_fraction(fraction);
                prop_assert!((pane.fraction() - fraction).abs() < 1e-9);
            }
        }
    }
}

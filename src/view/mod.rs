//! Edit/read mode and scroll mirroring between the source and preview panes.

mod scroll;

use serde::Serialize;

pub use scroll::ScrollSurface;

use crate::theme::{Presentation, Theme};

#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Source editor, with the preview pane beside it when enabled.
    #[default]
    Edit,
    /// Rendered content only.
    Read,
}

impl ViewMode {
    pub const fn toggled(self) -> Self {
        match self {
            Self::Edit => Self::Read,
            Self::Read => Self::Edit,
        }
    }
}

/// Snapshot of what the shell should display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewState {
    pub mode: ViewMode,
    pub zoom_percent: u16,
    pub theme: Theme,
    pub scroll_fraction: f64,
}

/// Which surfaces changed visibility after a view command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibilityChange {
    pub preview_shown: bool,
    pub preview_hidden: bool,
}

/// Owns the mode state machine and both panes' scroll positions.
///
/// Nothing here touches the document or its history.
#[derive(Debug, Clone)]
pub struct ViewSynchronizer {
    mode: ViewMode,
    preview_pane: bool,
    source: ScrollSurface,
    preview: ScrollSurface,
}

impl Default for ViewSynchronizer {
    fn default() -> Self {
        Self::new(ViewMode::Edit, true)
    }
}

impl ViewSynchronizer {
    pub fn new(mode: ViewMode, preview_pane: bool) -> Self {
        Self {
            mode,
            preview_pane,
            source: ScrollSurface::default(),
            preview: ScrollSurface::default(),
        }
    }

    pub const fn mode(&self) -> ViewMode {
        self.mode
    }

    /// Whether the preview pane is enabled for edit mode.
    pub const fn preview_pane_enabled(&self) -> bool {
        self.preview_pane
    }

    /// Whether rendered content is on screen.
    pub const fn preview_visible(&self) -> bool {
        matches!(self.mode, ViewMode::Read) || self.preview_pane
    }

    const fn is_split(&self) -> bool {
        matches!(self.mode, ViewMode::Edit) && self.preview_pane
    }

    pub const fn source(&self) -> &ScrollSurface {
        &self.source
    }

    pub const fn preview(&self) -> &ScrollSurface {
        &self.preview
    }

    pub fn set_mode(&mut self, mode: ViewMode) -> VisibilityChange {
        if mode == self.mode {
            return VisibilityChange::default();
        }
        let was_visible = self.preview_visible();
        let was_split = self.is_split();
        self.mode = mode;
        if mode == ViewMode::Read && !was_split {
            self.preview.set_fraction(self.source.fraction());
        }
        crate::perf::log_event("view.mode", format!("{mode:?}"));
        self.visibility_change(was_visible)
    }

    pub fn toggle_mode(&mut self) -> VisibilityChange {
        self.set_mode(self.mode.toggled())
    }

    pub fn set_preview_pane(&mut self, enabled: bool) -> VisibilityChange {
        let was_visible = self.preview_visible();
        self.preview_pane = enabled;
        if self.is_split() {
            self.preview.set_fraction(self.source.fraction());
        }
        self.visibility_change(was_visible)
    }

    pub fn toggle_preview_pane(&mut self) -> VisibilityChange {
        self.set_preview_pane(!self.preview_pane)
    }

    fn visibility_change(&self, was_visible: bool) -> VisibilityChange {
        let visible = self.preview_visible();
        VisibilityChange {
            preview_shown: visible && !was_visible,
            preview_hidden: was_visible && !visible,
        }
    }

    pub fn set_source_extents(&mut self, content_extent: f64, viewport_extent: f64) {
        self.source.set_extents(content_extent, viewport_extent);
    }

    /// New preview layout, after a render or a resize. The preview keeps its
    /// relative scroll position.
    pub fn set_preview_extents(&mut self, content_extent: f64, viewport_extent: f64) {
        self.preview.set_extents(content_extent, viewport_extent);
    }

    /// The source pane scrolled to `offset`; in split view the preview
    /// follows. Returns the preview's new offset when it moved.
    pub fn source_scrolled(&mut self, offset: f64) -> Option<f64> {
        self.source.scroll_to(offset);
        if !self.is_split() {
            return None;
        }
        self.preview.set_fraction(self.source.fraction());
        Some(self.preview.offset())
    }

    /// The preview scrolled to `offset`; in split view the source follows.
    /// Returns the source's new offset when it moved.
    pub fn preview_scrolled(&mut self, offset: f64) -> Option<f64> {
        self.preview.scroll_to(offset);
        if !self.is_split() {
            return None;
        }
        self.source.set_fraction(self.preview.fraction());
        Some(self.source.offset())
    }

    /// Scroll fraction of the pane the user is reading.
    pub fn scroll_fraction(&self) -> f64 {
        match self.mode {
            ViewMode::Read => self.preview.fraction(),
            ViewMode::Edit => self.source.fraction(),
        }
    }

    pub fn state(&self, presentation: Presentation) -> ViewState {
        ViewState {
            mode: self.mode,
            zoom_percent: presentation.zoom.percent(),
            theme: presentation.theme,
            scroll_fraction: self.scroll_fraction(),
        }
    }
}

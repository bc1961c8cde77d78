//! The editing session: one document, its history and its live preview.
//!
//! [`Session`] is the only writer of the buffer and history. Every mutation
//! bumps a version number, recomputes stats and notifies the
//! [`RenderScheduler`]; the shell drives time by calling [`Session::tick`]
//! when [`Session::next_wakeup`] says so, and rendered content is delivered
//! to subscribers from inside `tick`.

mod clock;

use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};

pub use clock::{Clock, ManualClock, SystemClock};

use crate::document::{MarkdownRenderer, RenderedContent};
use crate::editor::{EditOperation, FormatCommand, HistoryEntry, HistoryStack, TextBuffer};
use crate::error::EditorError;
use crate::export::{UNTITLED, export_html};
use crate::fs::{FileSystem, display_name, with_extension};
use crate::scheduler::{
    DEFAULT_DEBOUNCE, RenderBackend, RenderJob, RenderOutcome, RenderScheduler, RenderWorker,
};
use crate::stats::{self, Stats};
use crate::theme::{Presentation, Theme, Zoom};
use crate::view::{ViewMode, ViewState, ViewSynchronizer, VisibilityChange};

/// Application name shown in window titles.
pub const APP_NAME: &str = "MDFlex";

/// How often the shell should poll while a background render is running.
pub const RESULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub type RenderCallback = Box<dyn FnMut(&RenderedContent) + Send>;
pub type StatsCallback = Box<dyn FnMut(&Stats) + Send>;

/// Tunables for a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub debounce: Duration,
    pub coalesce_window: Duration,
    pub history_depth: usize,
    pub backend: RenderBackend,
    pub mode: ViewMode,
    pub preview_pane: bool,
    pub theme: Theme,
    pub zoom: Zoom,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            coalesce_window: Duration::from_millis(1000),
            history_depth: HistoryStack::DEFAULT_MAX_DEPTH,
            backend: RenderBackend::default(),
            mode: ViewMode::Edit,
            preview_pane: true,
            theme: Theme::default(),
            zoom: Zoom::default(),
        }
    }
}

struct Displayed {
    version: u64,
    content: Arc<RenderedContent>,
}

pub struct Session {
    buffer: TextBuffer,
    history: HistoryStack,
    scheduler: RenderScheduler,
    worker: RenderWorker,
    renderer: MarkdownRenderer,
    view: ViewSynchronizer,
    presentation: Presentation,
    clock: Box<dyn Clock>,
    path: Option<PathBuf>,
    version: u64,
    /// Outcomes for versions below this belong to a previous document.
    min_version: u64,
    displayed: Option<Displayed>,
    last_error: Option<EditorError>,
    stats: Stats,
    render_listeners: Vec<RenderCallback>,
    stats_listeners: Vec<StatsCallback>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("path", &self.path)
            .field("version", &self.version)
            .field("dirty", &self.buffer.is_dirty())
            .field("scheduler", &self.scheduler.state())
            .field("mode", &self.view.mode())
            .field("presentation", &self.presentation)
            .finish_non_exhaustive()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_parts(config, MarkdownRenderer::default(), Box::new(SystemClock))
    }

    /// Build a session with an explicit renderer and time source.
    pub fn with_parts(
        config: SessionConfig,
        renderer: MarkdownRenderer,
        clock: Box<dyn Clock>,
    ) -> Self {
        let mut session = Self {
            buffer: TextBuffer::empty(),
            history: HistoryStack::new(config.coalesce_window)
                .with_max_depth(config.history_depth),
            scheduler: RenderScheduler::new(config.debounce),
            worker: RenderWorker::spawn(config.backend, renderer.clone()),
            renderer,
            view: ViewSynchronizer::new(config.mode, config.preview_pane),
            presentation: Presentation::new(config.theme, config.zoom),
            clock,
            path: None,
            version: 0,
            min_version: 0,
            displayed: None,
            last_error: None,
            stats: Stats::default(),
            render_listeners: Vec::new(),
            stats_listeners: Vec::new(),
        };
        if !session.view.preview_visible() {
            session.scheduler.suspend();
        }
        session.reset_document("", None);
        session
    }

    // ---- document ----

    /// Replace the document with an empty, untitled one.
    pub fn new_document(&mut self) {
        self.reset_document("", None);
    }

    /// Replace the document with `text`. History is cleared and the text
    /// counts as saved.
    pub fn load_document(&mut self, text: &str) {
        self.reset_document(text, self.path.clone());
    }

    fn reset_document(&mut self, text: &str, path: Option<PathBuf>) {
        self.buffer = TextBuffer::from_text(text);
        self.history.clear();
        self.scheduler.reset();
        self.path = path;
        self.version += 1;
        self.min_version = self.version;
        self.last_error = None;
        self.refresh_stats();
        let now = self.clock.now();
        self.scheduler.request_immediate(self.snapshot(), now);
        self.pump(now);
        tracing::debug!(version = self.version, chars = self.buffer.len_chars(), "document loaded");
    }

    pub fn current_text(&self) -> String {
        self.buffer.current_text()
    }

    pub const fn is_dirty(&self) -> bool {
        self.buffer.is_dirty()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Monotonic edit counter; bumps on every mutation.
    pub const fn version(&self) -> u64 {
        self.version
    }

    pub const fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    /// Apply one user edit and record it in history.
    ///
    /// # Errors
    /// [`EditorError::InvalidOperation`] if the edit does not fit the
    /// buffer; nothing changes in that case.
    pub fn apply_user_edit(&mut self, op: EditOperation) -> Result<(), EditorError> {
        self.buffer.apply(&op)?;
        let now = self.clock.now();
        self.history.record_at(HistoryEntry::single(op), now);
        self.after_mutation(now);
        Ok(())
    }

    /// Undo the last history entry. `Ok(None)` when there is nothing to undo.
    ///
    /// # Errors
    /// Only if the buffer no longer matches the history.
    pub fn undo(&mut self) -> Result<Option<Vec<EditOperation>>, EditorError> {
        let applied = self.history.undo(&mut self.buffer)?;
        if applied.is_some() {
            self.after_mutation(self.clock.now());
        }
        Ok(applied)
    }

    /// Redo the last undone entry. `Ok(None)` when there is nothing to redo.
    ///
    /// # Errors
    /// Only if the buffer no longer matches the history.
    pub fn redo(&mut self) -> Result<Option<Vec<EditOperation>>, EditorError> {
        let applied = self.history.redo(&mut self.buffer)?;
        if applied.is_some() {
            self.after_mutation(self.clock.now());
        }
        Ok(applied)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Run a toolbar formatting command as one history entry.
    ///
    /// # Errors
    /// [`EditorError::InvalidOperation`] if the selection is stale.
    pub fn apply_format(&mut self, command: FormatCommand) -> Result<(), EditorError> {
        let plan = command.plan(&self.buffer)?;
        self.buffer.apply_all(&plan.ops)?;
        self.buffer.set_cursor(plan.cursor);
        let now = self.clock.now();
        self.history.seal();
        self.history.record_at(HistoryEntry::batch(plan.ops), now);
        self.history.seal();
        self.after_mutation(now);
        Ok(())
    }

    pub const fn cursor(&self) -> usize {
        self.buffer.cursor()
    }

    pub fn selection(&self) -> Option<Range<usize>> {
        self.buffer.selection()
    }

    /// Move the cursor. Ends the current typing run in history.
    pub fn set_cursor(&mut self, offset: usize) {
        self.buffer.set_cursor(offset);
        self.history.seal();
    }

    pub fn select(&mut self, range: Range<usize>) {
        self.buffer.select(range);
        self.history.seal();
    }

    /// Select the next match of `query` after the cursor, wrapping around.
    pub fn find(&mut self, query: &str) -> Option<Range<usize>> {
        let from = self.buffer.cursor();
        let found = self.buffer.find(query, from)?;
        self.select(found.clone());
        Some(found)
    }

    fn after_mutation(&mut self, now: Instant) {
        self.version += 1;
        self.refresh_stats();
        self.scheduler.note_edit(self.snapshot(), now);
        self.drain_outcomes(now);
    }

    fn snapshot(&self) -> RenderJob {
        RenderJob::new(self.version, self.buffer.current_text())
    }

    // ---- stats ----

    pub const fn stats(&self) -> Stats {
        self.stats
    }

    fn refresh_stats(&mut self) {
        self.stats = stats::count(&self.buffer.current_text());
        for listener in &mut self.stats_listeners {
            listener(&self.stats);
        }
    }

    /// Call `callback` with the current stats now and after every mutation.
    pub fn subscribe_stats(&mut self, mut callback: StatsCallback) {
        callback(&self.stats);
        self.stats_listeners.push(callback);
    }

    // ---- rendering ----

    /// Call `callback` with every newly displayed render.
    pub fn subscribe_render(&mut self, callback: RenderCallback) {
        self.render_listeners.push(callback);
    }

    /// The content currently on display.
    pub fn rendered(&self) -> Option<&RenderedContent> {
        self.displayed.as_ref().map(|d| d.content.as_ref())
    }

    pub fn displayed_version(&self) -> Option<u64> {
        self.displayed.as_ref().map(|d| d.version)
    }

    /// The most recent render failure, cleared by the next success.
    pub const fn last_render_error(&self) -> Option<&EditorError> {
        self.last_error.as_ref()
    }

    pub const fn scheduler(&self) -> &RenderScheduler {
        &self.scheduler
    }

    /// Advance the scheduler to `now`: collect finished renders and start
    /// a due one. Returns whether new content was displayed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let before = self.displayed_version();
        self.pump(now);
        self.displayed_version() != before
    }

    /// How long the shell may sleep before the next [`Session::tick`].
    pub fn next_wakeup(&self, now: Instant) -> Option<Duration> {
        if self.scheduler.in_flight().is_some() {
            return Some(RESULT_POLL_INTERVAL);
        }
        self.scheduler
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Render any pending change right away and wait for it. Does nothing
    /// while the preview is hidden.
    pub fn flush(&mut self) {
        let now = self.clock.now();
        if self.scheduler.has_queued() {
            self.scheduler.request_immediate(self.snapshot(), now);
        }
        loop {
            if let Some(job) = self.scheduler.poll(now) {
                self.dispatch(job);
            }
            let Some(in_flight) = self.scheduler.in_flight() else {
                break;
            };
            match self.worker.recv() {
                Some(outcome) => self.handle_outcome(outcome, now),
                None => {
                    tracing::warn!(version = in_flight, "render worker stopped");
                    self.scheduler.complete(in_flight, now);
                    break;
                }
            }
        }
    }

    fn pump(&mut self, now: Instant) {
        self.drain_outcomes(now);
        if let Some(job) = self.scheduler.poll(now) {
            self.dispatch(job);
            self.drain_outcomes(now);
        }
    }

    /// Send `job` to the worker, switching to inline rendering if the
    /// render thread has stopped so the scheduler always sees a completion.
    fn dispatch(&mut self, job: RenderJob) {
        if let Err(job) = self.worker.submit(job) {
            tracing::warn!(version = job.version, "render thread stopped, rendering inline");
            self.worker = RenderWorker::inline(self.renderer.clone());
            if self.worker.submit(job).is_err() {
                tracing::warn!("inline render worker rejected a job");
            }
        }
    }

    fn drain_outcomes(&mut self, now: Instant) {
        while let Some(outcome) = self.worker.try_recv() {
            self.handle_outcome(outcome, now);
            if let Some(job) = self.scheduler.poll(now) {
                self.dispatch(job);
            }
        }
    }

    fn handle_outcome(&mut self, outcome: RenderOutcome, now: Instant) {
        let RenderOutcome { version, result } = outcome;
        self.scheduler.complete(version, now);
        let shown = self.displayed_version().unwrap_or(0);
        if version < self.min_version || (self.displayed.is_some() && version < shown) {
            crate::perf::log_event("session.discard_stale", format!("version={version}"));
            return;
        }
        match result {
            Ok(content) => {
                let content = Arc::new(content);
                for listener in &mut self.render_listeners {
                    listener(content.as_ref());
                }
                self.displayed = Some(Displayed { version, content });
                self.last_error = None;
                crate::perf::log_event("session.displayed", format!("version={version}"));
            }
            Err(err) => {
                tracing::warn!(error = %err, "render failed, keeping previous content");
                self.last_error = Some(err);
            }
        }
    }

    // ---- view ----

    pub const fn mode(&self) -> ViewMode {
        self.view.mode()
    }

    /// Switch between edit and read mode. Entering read mode renders any
    /// pending change immediately; neither direction touches the document.
    pub fn set_mode(&mut self, mode: ViewMode) {
        self.history.seal();
        let change = self.view.set_mode(mode);
        let now = self.clock.now();
        self.apply_visibility(change, now);
        if mode == ViewMode::Read && self.displayed_version() != Some(self.version) {
            self.scheduler.request_immediate(self.snapshot(), now);
        }
        self.pump(now);
    }

    pub fn toggle_mode(&mut self) {
        self.set_mode(self.view.mode().toggled());
    }

    /// Show or hide the preview pane beside the editor.
    pub fn set_preview_pane(&mut self, enabled: bool) {
        let change = self.view.set_preview_pane(enabled);
        let now = self.clock.now();
        self.apply_visibility(change, now);
        self.pump(now);
    }

    pub fn toggle_preview_pane(&mut self) {
        self.set_preview_pane(!self.view.preview_pane_enabled());
    }

    fn apply_visibility(&mut self, change: VisibilityChange, now: Instant) {
        if change.preview_hidden {
            self.scheduler.suspend();
        }
        if change.preview_shown {
            self.scheduler.resume(self.snapshot(), now);
        }
    }

    pub fn view_state(&self) -> ViewState {
        self.view.state(self.presentation)
    }

    pub const fn view(&self) -> &ViewSynchronizer {
        &self.view
    }

    pub fn set_source_extents(&mut self, content_extent: f64, viewport_extent: f64) {
        self.view.set_source_extents(content_extent, viewport_extent);
    }

    pub fn set_preview_extents(&mut self, content_extent: f64, viewport_extent: f64) {
        self.view.set_preview_extents(content_extent, viewport_extent);
    }

    /// Returns the preview offset to apply, if it follows.
    pub fn source_scrolled(&mut self, offset: f64) -> Option<f64> {
        self.view.source_scrolled(offset)
    }

    /// Returns the source offset to apply, if it follows.
    pub fn preview_scrolled(&mut self, offset: f64) -> Option<f64> {
        self.view.preview_scrolled(offset)
    }

    // ---- presentation ----

    pub const fn presentation(&self) -> Presentation {
        self.presentation
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.presentation = self.presentation.with_theme(theme);
    }

    pub fn toggle_theme(&mut self) {
        self.set_theme(self.presentation.theme.toggled());
    }

    /// Set zoom in percent; values outside `[50, 200]` are clamped.
    pub fn set_zoom(&mut self, percent: i32) {
        self.presentation = self.presentation.with_zoom(Zoom::new(percent));
    }

    pub fn zoom_in(&mut self) {
        self.presentation = self.presentation.with_zoom(self.presentation.zoom.zoomed_in());
    }

    pub fn zoom_out(&mut self) {
        self.presentation = self.presentation.with_zoom(self.presentation.zoom.zoomed_out());
    }

    pub fn reset_zoom(&mut self) {
        self.presentation = self.presentation.with_zoom(Zoom::default());
    }

    // ---- titles, files, export ----

    /// Window title, e.g. `"• notes - MDFlex"` for a modified file.
    pub fn title(&self) -> String {
        let name = self
            .path
            .as_deref()
            .map_or_else(|| UNTITLED.to_string(), display_name);
        let marker = if self.buffer.is_dirty() { "• " } else { "" };
        format!("{marker}{name} - {APP_NAME}")
    }

    /// Rendered content for the current text.
    ///
    /// Uses the displayed render when it is current, otherwise renders the
    /// text synchronously so callers never see content lagging the editor.
    pub fn current_content(&self) -> Arc<RenderedContent> {
        match &self.displayed {
            Some(displayed) if displayed.version == self.version => Arc::clone(&displayed.content),
            _ => Arc::new(self.renderer.render(&self.buffer.current_text())),
        }
    }

    /// Standalone HTML for the current text.
    pub fn export_html(&self) -> String {
        let title = self
            .path
            .as_deref()
            .map_or_else(|| UNTITLED.to_string(), display_name);
        export_html(&self.current_content(), self.presentation, &title)
    }

    /// Load `path` as the current document.
    ///
    /// # Errors
    /// Returns the file system error; the current document is kept.
    pub fn open(&mut self, fs: &dyn FileSystem, path: &Path) -> Result<()> {
        let text = fs.read(path)?;
        self.reset_document(&text, Some(path.to_path_buf()));
        Ok(())
    }

    /// Write the document to its current path.
    ///
    /// # Errors
    /// Fails when the document has no path yet or the write fails.
    pub fn save(&mut self, fs: &dyn FileSystem) -> Result<PathBuf> {
        let Some(path) = self.path.clone() else {
            bail!("Document has no file path; use save as");
        };
        fs.write(&path, &self.buffer.current_text())?;
        self.buffer.mark_saved();
        tracing::debug!(path = %path.display(), "saved");
        Ok(path)
    }

    /// Write the document to `path` (adding `.md` when missing) and adopt
    /// it as the document path.
    ///
    /// # Errors
    /// Returns the write error; the path is unchanged on failure.
    pub fn save_as(&mut self, fs: &dyn FileSystem, path: &Path) -> Result<PathBuf> {
        let path = with_extension(path, "md");
        fs.write(&path, &self.buffer.current_text())?;
        self.buffer.mark_saved();
        self.path = Some(path.clone());
        tracing::debug!(path = %path.display(), "saved as");
        Ok(path)
    }

    /// Write the HTML export to `path`, adding `.html` when missing.
    ///
    /// # Errors
    /// Returns the write error.
    pub fn export_to(&self, fs: &dyn FileSystem, path: &Path) -> Result<PathBuf> {
        let path = with_extension(path, "html");
        fs.write(&path, &self.export_html())?;
        Ok(path)
    }
}

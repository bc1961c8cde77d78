//! Timing scopes and the render debug log.
//!
//! With `--perf` on, every [`Scope`] reports its duration through `tracing`
//! and adds it to a per-name tally that [`summary`] returns. The debug log is
//! a plain file of timestamped scheduler and render events, opened with
//! `--render-debug-log` or `MDFLEX_RENDER_DEBUG_LOG`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

static ENABLED: AtomicBool = AtomicBool::new(false);
static TALLY: LazyLock<Mutex<BTreeMap<&'static str, ScopeTotals>>> =
    LazyLock::new(|| Mutex::new(BTreeMap::new()));
static DEBUG_LOG: Mutex<Option<DebugLog>> = Mutex::new(None);

/// Env var naming a render debug log file.
pub const DEBUG_LOG_ENV: &str = "MDFLEX_RENDER_DEBUG_LOG";

/// Accumulated time for one scope name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeTotals {
    pub count: u64,
    pub total: Duration,
    pub max: Duration,
}

impl ScopeTotals {
    pub fn mean(&self) -> Duration {
        u32::try_from(self.count)
            .ok()
            .filter(|&n| n > 0)
            .map_or(Duration::ZERO, |n| self.total / n)
    }
}

#[derive(Debug)]
pub struct Scope {
    name: &'static str,
    start: Instant,
}

impl Drop for Scope {
    fn drop(&mut self) {
        if !is_enabled() {
            return;
        }
        let elapsed = self.start.elapsed();
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        tracing::debug!(target: "mdflex::perf", scope = self.name, elapsed_ms, "timing");
        {
            let mut tally = lock(&TALLY);
            let totals = tally.entry(self.name).or_default();
            totals.count += 1;
            totals.total += elapsed;
            totals.max = totals.max.max(elapsed);
        }
        log_event("perf", format!("{}: {elapsed_ms:.2} ms", self.name));
    }
}

#[derive(Debug)]
struct DebugLog {
    opened_at: Instant,
    writer: BufWriter<File>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

pub fn scope(name: &'static str) -> Scope {
    Scope {
        name,
        start: Instant::now(),
    }
}

/// Per-scope totals recorded so far, ordered by scope name.
pub fn summary() -> Vec<(&'static str, ScopeTotals)> {
    lock(&TALLY)
        .iter()
        .map(|(name, totals)| (*name, *totals))
        .collect()
}

/// Start writing the debug log to `path`, or close it with `None`.
pub fn set_debug_log_path(path: Option<&Path>) -> std::io::Result<()> {
    let mut log = lock(&DEBUG_LOG);
    *log = None;
    if let Some(path) = path {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "mdflex render debug log start")?;
        writer.flush()?;
        *log = Some(DebugLog {
            opened_at: Instant::now(),
            writer,
        });
    }
    Ok(())
}

pub fn is_debug_log_enabled() -> bool {
    lock(&DEBUG_LOG).is_some()
}

/// Append one event line; a no-op while no debug log is open.
pub fn log_event(name: &str, detail: impl AsRef<str>) {
    let mut guard = lock(&DEBUG_LOG);
    let Some(log) = guard.as_mut() else {
        return;
    };
    let elapsed_ms = log.opened_at.elapsed().as_secs_f64() * 1000.0;
    // Write failures must not disturb editing.
    let _ = writeln!(
        log.writer,
        "[{elapsed_ms:>10.3} ms] {name}: {}",
        detail.as_ref()
    );
    let _ = log.writer.flush();
}

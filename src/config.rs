//! Persistent default flags.
//!
//! A config file holds command-line flags, whitespace separated, with `#`
//! comments. The global file lives in the platform config directory and a
//! `.mdflexrc` in the working directory overrides it; flags given on the
//! command line win over both.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::scheduler::RenderBackend;
use crate::session::SessionConfig;
use crate::theme::{Theme, Zoom};
use crate::view::ViewMode;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub read: bool,
    pub no_preview: bool,
    pub inline_render: bool,
    pub perf: bool,
    pub theme: Option<Theme>,
    pub zoom: Option<u16>,
    pub debounce_ms: Option<u64>,
    pub coalesce_ms: Option<u64>,
    pub history_depth: Option<usize>,
    pub render_debug_log: Option<PathBuf>,
}

impl ConfigFlags {
    /// Merge `other` (higher priority) over `self`.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            read: self.read || other.read,
            no_preview: self.no_preview || other.no_preview,
            inline_render: self.inline_render || other.inline_render,
            perf: self.perf || other.perf,
            theme: other.theme.or(self.theme),
            zoom: other.zoom.or(self.zoom),
            debounce_ms: other.debounce_ms.or(self.debounce_ms),
            coalesce_ms: other.coalesce_ms.or(self.coalesce_ms),
            history_depth: other.history_depth.or(self.history_depth),
            render_debug_log: other
                .render_debug_log
                .clone()
                .or_else(|| self.render_debug_log.clone()),
        }
    }

    /// Session settings implied by these flags; unset values use defaults.
    pub fn session_config(&self) -> SessionConfig {
        let defaults = SessionConfig::default();
        SessionConfig {
            debounce: self
                .debounce_ms
                .map_or(defaults.debounce, Duration::from_millis),
            coalesce_window: self
                .coalesce_ms
                .map_or(defaults.coalesce_window, Duration::from_millis),
            history_depth: self.history_depth.unwrap_or(defaults.history_depth),
            backend: if self.inline_render {
                RenderBackend::Inline
            } else {
                defaults.backend
            },
            mode: if self.read {
                ViewMode::Read
            } else {
                defaults.mode
            },
            preview_pane: defaults.preview_pane && !self.no_preview,
            theme: self.theme.unwrap_or(defaults.theme),
            zoom: self.zoom.map_or(defaults.zoom, |z| Zoom::new(i32::from(z))),
        }
    }
}

/// Per-user config file, falling back to the working directory when no
/// home or config directory is known.
pub fn global_config_path() -> PathBuf {
    platform_config_dir().map_or_else(local_override_path, |dir| {
        dir.join("mdflex").join("config")
    })
}

#[cfg(target_os = "windows")]
fn platform_config_dir() -> Option<PathBuf> {
    std::env::var_os("APPDATA").map(PathBuf::from)
}

#[cfg(target_os = "macos")]
fn platform_config_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join("Library").join("Application Support"))
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn platform_config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".mdflexrc")
}

pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# mdflex defaults (saved with --save)".to_string()];
    if flags.read {
        lines.push("--read".to_string());
    }
    if flags.no_preview {
        lines.push("--no-preview".to_string());
    }
    if flags.inline_render {
        lines.push("--inline-render".to_string());
    }
    if let Some(theme) = flags.theme {
        lines.push(format!("--theme {}", theme.as_str()));
    }
    if let Some(zoom) = flags.zoom {
        lines.push(format!("--zoom {zoom}"));
    }
    if let Some(ms) = flags.debounce_ms {
        lines.push(format!("--debounce-ms {ms}"));
    }
    if let Some(ms) = flags.coalesce_ms {
        lines.push(format!("--coalesce-ms {ms}"));
    }
    if let Some(depth) = flags.history_depth {
        lines.push(format!("--history-depth {depth}"));
    }
    if flags.perf {
        lines.push("--perf".to_string());
    }
    if let Some(path) = &flags.render_debug_log {
        lines.push(format!("--render-debug-log {}", path.display()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Extract known flags from `tokens`; unknown tokens and bad values are
/// skipped.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        let (name, inline_value) = match token.split_once('=') {
            Some((name, value)) if name.starts_with("--") => (name, Some(value)),
            _ => (token, None),
        };
        let mut value = || {
            inline_value.map(ToOwned::to_owned).or_else(|| {
                let next = tokens.get(i + 1).cloned();
                if next.is_some() {
                    i += 1;
                }
                next
            })
        };
        match name {
            "--read" => flags.read = true,
            "--no-preview" => flags.no_preview = true,
            "--inline-render" => flags.inline_render = true,
            "--perf" => flags.perf = true,
            "--theme" => flags.theme = value().as_deref().and_then(Theme::parse),
            "--zoom" => flags.zoom = value().and_then(|v| v.parse().ok()),
            "--debounce-ms" => flags.debounce_ms = value().and_then(|v| v.parse().ok()),
            "--coalesce-ms" => flags.coalesce_ms = value().and_then(|v| v.parse().ok()),
            "--history-depth" => flags.history_depth = value().and_then(|v| v.parse().ok()),
            "--render-debug-log" => flags.render_debug_log = value().map(PathBuf::from),
            _ => {}
        }
        i += 1;
    }
    flags
}

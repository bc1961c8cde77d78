//! MDFlex - the live-preview markdown editor core, driven from the command line.
//!
//! # Usage
//!
//! ```bash
//! mdflex README.md                     # outline and stats
//! mdflex README.md --export out.html   # standalone HTML
//! mdflex README.md --dump-tree         # rendered tree as JSON
//! mdflex --theme light --zoom 120 --save
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use mdflex::config::{
    ConfigFlags, clear_config_flags, global_config_path, load_config_flags, local_override_path,
    parse_flag_tokens, save_config_flags,
};
use mdflex::fs::StdFileSystem;
use mdflex::perf;
use mdflex::session::Session;
use mdflex::theme::Theme;
use mdflex::view::ViewMode;

/// Render, inspect and export markdown documents
#[derive(Parser, Debug)]
#[command(name = "mdflex", version, about, long_about = None)]
struct Cli {
    /// Markdown file to open
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Write a standalone HTML export (".html" is appended when missing)
    #[arg(long, value_name = "OUT")]
    export: Option<PathBuf>,

    /// Color theme for export
    #[arg(long, value_enum)]
    theme: Option<Theme>,

    /// Zoom percent for export (clamped to 50-200)
    #[arg(long)]
    zoom: Option<u16>,

    /// Start in read mode
    #[arg(long)]
    read: bool,

    /// Hide the preview pane in edit mode
    #[arg(long)]
    no_preview: bool,

    /// Render on the calling thread instead of a worker thread
    #[arg(long)]
    inline_render: bool,

    /// Print word, character and line counts as JSON
    #[arg(long)]
    stats: bool,

    /// Print the rendered document tree as JSON
    #[arg(long)]
    dump_tree: bool,

    /// Quiet period after the last edit before re-rendering
    #[arg(long, value_name = "MS")]
    debounce_ms: Option<u64>,

    /// Window in which typed characters merge into one undo step
    #[arg(long, value_name = "MS")]
    coalesce_ms: Option<u64>,

    /// Maximum number of undo steps kept
    #[arg(long, value_name = "N")]
    history_depth: Option<usize>,

    /// Log timing of render, highlight and export phases
    #[arg(long)]
    perf: bool,

    /// Write detailed scheduler/render debug events to a file
    #[arg(long, value_name = "PATH")]
    render_debug_log: Option<PathBuf>,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    perf::set_enabled(effective.perf);
    let render_debug_log_path = effective
        .render_debug_log
        .clone()
        .or_else(|| std::env::var_os(perf::DEBUG_LOG_ENV).map(PathBuf::from));
    if let Err(err) = perf::set_debug_log_path(render_debug_log_path.as_deref()) {
        tracing::warn!(
            path = %render_debug_log_path
                .as_ref()
                .map_or_else(|| "<unset>".to_string(), |p| p.display().to_string()),
            error = %err,
            "failed to initialize render debug log"
        );
    }

    let Some(file) = cli.file else {
        if cli.save || cli.clear {
            return Ok(());
        }
        anyhow::bail!("No input file given");
    };
    if !file.exists() {
        anyhow::bail!("File not found: {}", file.display());
    }

    let mut session = Session::new(effective.session_config());
    session.open(&StdFileSystem, &file)?;
    session.flush();

    if let Some(out) = &cli.export {
        let written = session
            .export_to(&StdFileSystem, out)
            .context("Export failed")?;
        println!("{}", written.display());
    }
    if cli.dump_tree {
        println!("{}", serde_json::to_string_pretty(&*session.current_content())?);
    }
    if cli.stats {
        println!("{}", serde_json::to_string_pretty(&session.stats())?);
    }
    if !(cli.dump_tree || cli.stats) && cli.export.is_none() {
        print_summary(&session);
    }
    if perf::is_enabled() {
        for (name, totals) in perf::summary() {
            tracing::info!(
                target: "mdflex::perf",
                scope = name,
                count = totals.count,
                mean_ms = totals.mean().as_secs_f64() * 1000.0,
                max_ms = totals.max.as_secs_f64() * 1000.0,
                "perf summary"
            );
        }
    }
    Ok(())
}

fn print_summary(session: &Session) {
    let stats = session.stats();
    let state = session.view_state();
    println!("{}", session.title());
    println!(
        "{} words, {} characters, {} lines, ~{} min read",
        stats.words, stats.characters, stats.lines, stats.reading_minutes
    );
    let mode = match state.mode {
        ViewMode::Edit => "edit",
        ViewMode::Read => "read",
    };
    println!(
        "mode: {mode}, theme: {}, zoom: {}%",
        state.theme.as_str(),
        state.zoom_percent
    );
    for heading in session.current_content().outline() {
        let indent = "  ".repeat(usize::from(heading.level.saturating_sub(1)));
        println!("{indent}{} (#{})", heading.text, heading.anchor);
    }
}

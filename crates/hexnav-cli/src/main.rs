//! `hexnav` – hexapod obstacle-avoidance navigator.
//!
//! This binary wires the navigation stack together.  It:
//!
//! 1. Loads `~/.hexnav/config.toml` (or `$HEXNAV_CONFIG`), writing defaults
//!    on first run, and refuses to start on an invalid configuration.
//! 2. Opens the configured frame source (synthetic scene or image directory).
//! 3. Runs the control loop against a logging action sink, optionally
//!    dumping annotated diagnostic frames.
//! 4. Accepts `pause` / `resume` / `quit` on stdin and turns **Ctrl-C** into
//!    a stop request so the robot halts before the process exits.

mod config;
mod repl;

use colored::Colorize;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, warn};

use hexnav_hal::image_dir::ImageDirSource;
use hexnav_hal::sim::SimCamera;
use hexnav_hal::{CameraBackend, LoggingActionSink};
use hexnav_runtime::{ControlLoop, LoopStats, PngDiagnostics, init_tracing};
use hexnav_types::{NavConfig, NavError};

use crate::config::{Config, SourceKind};

/// Synthetic scene geometry.
const SIM_WIDTH: u32 = 640;
const SIM_HEIGHT: u32 = 480;
const SIM_STEPS: u32 = 40;

fn main() -> ExitCode {
    // Flushes OTLP spans (when exporting) after the loop has stopped.
    let _tracing = init_tracing("hexnav");

    print_banner();

    let loaded = match config::load() {
        Ok(l) => l,
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            return ExitCode::FAILURE;
        }
    };
    let path = config::config_path();
    if loaded.created {
        println!(
            "  {} Default config written to {}",
            "✓".green().bold(),
            path.display().to_string().bold()
        );
    } else {
        println!("  Config loaded from {}", path.display().to_string().bold());
    }

    match run(loaded.config) {
        Ok(stats) => {
            print_stats(&stats);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "navigation aborted");
            println!("{}: {}", "Fatal".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cfg: Config) -> Result<LoopStats, NavError> {
    cfg.navigation.validate()?;
    let nav: Arc<NavConfig> = Arc::new(cfg.navigation);
    let source = open_source(&cfg.source)?;
    match &cfg.source.path {
        Some(dir) if cfg.source.kind == SourceKind::ImageDir => println!(
            "  Frame source : {} {}",
            source.kind().bold(),
            dir.display().to_string().dimmed()
        ),
        _ => println!("  Frame source : {}", source.kind().bold()),
    }

    let mut control = ControlLoop::new(nav, source, LoggingActionSink::new("gait"))?;
    if cfg.diagnostics.enabled {
        let sink = PngDiagnostics::new(&cfg.diagnostics.output_dir, cfg.diagnostics.every_n_cycles)?;
        println!(
            "  Diagnostics  : every {} cycle(s) → {}",
            cfg.diagnostics.every_n_cycles,
            cfg.diagnostics.output_dir.display().to_string().bold()
        );
        control = control.with_diagnostics(Box::new(sink));
    }

    let handle = control.handle();

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let ctrlc_handle = handle.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping the robot …".yellow().bold());
        ctrlc_handle.stop();
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; use `quit` to stop");
    }

    if cfg.control.start_paused {
        handle.pause();
        println!("  {}", "Starting PAUSED – type `resume` to begin.".yellow());
    }

    // ── Operator prompt ───────────────────────────────────────────────────
    if let Err(e) = repl::spawn(handle) {
        warn!(error = %e, "Operator prompt unavailable; only Ctrl-C can stop the loop");
    }
    println!(
        "  Type {} for operator commands.  Started {}.\n",
        "help".bold().cyan(),
        chrono::Local::now().format("%H:%M:%S").to_string().dimmed()
    );

    control.run()
}

fn open_source(cfg: &config::SourceConfig) -> Result<CameraBackend, NavError> {
    match cfg.kind {
        SourceKind::Sim => Ok(CameraBackend::Sim(SimCamera::approaching_obstacle(
            "sim",
            SIM_WIDTH,
            SIM_HEIGHT,
            SIM_STEPS,
        ))),
        SourceKind::ImageDir => {
            let dir = cfg.path.as_deref().ok_or_else(|| {
                NavError::config("source.path", "required when kind = \"image_dir\"")
            })?;
            Ok(CameraBackend::ImageDir(ImageDirSource::open("image_dir", dir, cfg.looping)?))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   __               _  __          "#.bold().cyan());
    println!("{}", r#"  / /  ___ __ __   / |/ /__ __  __ "#.bold().cyan());
    println!("{}", r#" / _ \/ -_) \ /   /    / _ `/ |/ / "#.bold().cyan());
    println!("{}", r#"/_//_/\__/_\_\   /_/|_/\_,_/|___/  "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "HexNav".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Hexapod obstacle-avoidance navigator");
    println!();
}

fn print_stats(stats: &LoopStats) {
    println!();
    println!("{}", "Session Summary".bold().underline());
    println!("  cycles       : {}", stats.cycles);
    println!("  processed    : {}", stats.processed.to_string().green());
    println!("  skipped      : {}", stats.skipped);
    println!("  rejected     : {}", stats.rejected);
    println!("  paused       : {}", stats.paused);
    println!("  transitions  : {}", stats.transitions);
    if stats.stuck_cycles > 0 {
        println!("  stuck cycles : {}", stats.stuck_cycles.to_string().yellow());
    }
    if stats.over_budget > 0 {
        println!("  over budget  : {}", stats.over_budget.to_string().yellow());
    }
    println!("{}", "  ✓ Robot stopped.".green());
}

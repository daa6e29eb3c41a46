//! `sentinel-cli` – Sentinel operator console
//!
//! This binary drives a capture session end to end.  It:
//!
//! 1. Checks for `~/.sentinel/config.toml`; runs a **First-Run Wizard** when
//!    the file is absent.
//! 2. Wires the capture orchestrator to the simulated camera and motion
//!    drivers, persisting artifacts under the configured output directory.
//! 3. Drops the operator into an **interactive REPL** with slash-commands
//!    (`/scan`, `/turn`, `/camera`, `/move`, `/status`, `/settings`, `/help`).
//! 4. Intercepts **Ctrl-C** to stop an in-flight scan between waypoints and
//!    exit safely.

mod config;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use sentinel_hal::camera::FrameAcquirer;
use sentinel_hal::motion::{BoundedMotion, MotionPlatform};
use sentinel_hal::clock::SystemClock;
use sentinel_hal::sim::{SimCamera, SimMotion};
use sentinel_runtime::{CancelToken, CaptureOrchestrator, DirectorySink};

use crate::config::Config;

const LED_RED: [u8; 3] = [230, 20, 25];

fn main() {
    // RUST_LOG selects the level; SENTINEL_LOG_FORMAT=json switches to
    // newline-delimited JSON.  Operator output still goes through println!.
    let _telemetry = sentinel_runtime::init_tracing("sentinel");

    print_banner();

    // ── Shared shutdown flag and scan cancellation ───────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let cancel = CancelToken::new();

    let shutdown_clone = shutdown.clone();
    let cancel_clone = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!(
            "{}",
            "⚠  Ctrl-C received – stopping after the current waypoint …"
                .yellow()
                .bold()
        );
        cancel_clone.cancel();
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; scans cannot be interrupted");
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(None) => run_first_run_wizard(),
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };

    // ── Platform wiring ───────────────────────────────────────────────────
    let sink = match DirectorySink::create(cfg.output_dir.clone()) {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            eprintln!("{}: {}", "Cannot prepare output directory".red(), e);
            std::process::exit(1);
        }
    };
    println!(
        "  Artifacts go to {}",
        sink.dir().display().to_string().bold()
    );

    let mut acquirer = FrameAcquirer::new(Arc::new(simulated_scene()));
    if let Some(limit) = cfg.capture_timeout() {
        acquirer = acquirer.with_timeout(limit);
    }
    let mut platform: Arc<dyn MotionPlatform> = Arc::new(SimMotion::new());
    if let Some(limit) = cfg.motion_timeout() {
        platform = Arc::new(BoundedMotion::new(platform, limit));
    }
    let orchestrator = CaptureOrchestrator::new(
        cfg.orchestrator_config(),
        acquirer,
        platform,
        Arc::new(SystemClock),
        sink,
    )
    .with_camera(cfg.start_camera);
    info!(camera = %cfg.start_camera, "simulated platform ready");

    println!(
        "  Platform: {} (camera {})",
        "simulated".yellow(),
        cfg.start_camera.to_string().cyan()
    );
    println!();
    println!(
        "  Type {} for available commands.",
        "/help".bold()
    );
    println!();

    repl::run(repl::Session::new(orchestrator, cancel, cfg), shutdown);
}

/// A dark scene with a tight cluster of red LEDs and one green decoy.
fn simulated_scene() -> SimCamera {
    SimCamera::new(640, 480)
        .with_background([18, 18, 24])
        .with_disc(300, 200, 9, LED_RED)
        .with_disc(340, 215, 9, LED_RED)
        .with_disc(315, 255, 9, LED_RED)
        .with_disc(520, 380, 12, [30, 200, 40])
}

// ─────────────────────────────────────────────────────────────────────────────
// First-Run Wizard
// ─────────────────────────────────────────────────────────────────────────────

fn run_first_run_wizard() -> Config {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║      Sentinel First-Run Wizard       ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
    println!("  No configuration found.  Let's set up Sentinel.\n");

    let mut cfg = Config::default();

    let dir = prompt_line(
        &format!("  Artifact output directory [{}]: ", cfg.output_dir.display()),
        &cfg.output_dir.to_string_lossy(),
    );
    cfg.output_dir = dir.into();

    println!("  Which camera should scans start on?");
    for (i, source) in sentinel_types::CameraSource::ALL.iter().enumerate() {
        println!("    {}) {}", i + 1, source);
    }
    let choice = prompt_line("  Enter choice [1]: ", "1");
    if let Some(source) = choice
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| sentinel_types::CameraSource::ALL.get(i))
    {
        cfg.start_camera = *source;
    }

    let frames = prompt_line(
        &format!("  Frames per scan [{}]: ", cfg.scan_frame_count),
        &cfg.scan_frame_count.to_string(),
    );
    if let Ok(n) = frames.trim().parse::<usize>() {
        cfg.scan_frame_count = n;
    }

    match config::save(&cfg) {
        Ok(()) => println!(
            "\n  {} Config saved to {}\n",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }

    config::apply_env_overrides(&mut cfg);
    cfg
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   _____            __  _            __"#.bold().cyan());
    println!("{}", r#"  / ___/___  ____  / /_(_)___  ___  / /"#.bold().cyan());
    println!("{}", r#"  \__ \/ _ \/ __ \/ __/ / __ \/ _ \/ / "#.bold().cyan());
    println!("{}", r#" ___/ /  __/ / / / /_/ / / / /  __/ /  "#.bold().cyan());
    println!("{}", r#"/____/\___/_/ /_/\__/_/_/ /_/\___/_/   "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Sentinel".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Head-scan capture and threat detection");
    println!();
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn prompt_line(msg: &str, default: &str) -> String {
    use std::io::{BufRead, Write};
    print!("{}", msg);
    std::io::stdout().flush().ok();
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(_) => {
            let t = line.trim().to_string();
            if t.is_empty() { default.to_string() } else { t }
        }
        Err(_) => default.to_string(),
    }
}

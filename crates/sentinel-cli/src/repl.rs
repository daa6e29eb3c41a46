//! REPL – Read-Eval-Print Loop for the Sentinel operator shell.
//!
//! Supported slash-commands:
//!   /scan              – pitch sweep with capture and threat analysis
//!   /turn              – closed-loop circular turn
//!   /camera [source]   – rotate to the next camera, or jump to `source`
//!   /move <maneuver>   – forward | backward | left | right | turn | scan
//!   /status            – current camera, motion state and last scan
//!   /settings          – interactively edit `~/.sentinel/config.toml`
//!   /help              – show this list
//!   /quit | /exit      – leave the shell

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sentinel_runtime::{CancelToken, CaptureOrchestrator, Maneuver, ScanReport};
use sentinel_types::{CameraSource, SentinelError};
use tracing::warn;

use crate::config::{self, Config};

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Scan,
    Turn,
    Camera(Option<CameraSource>),
    Move(Maneuver),
    Status,
    Settings,
    Quit,
    Empty,
    /// The input named a known command but its argument was rejected.
    Invalid(String),
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Command {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Command::Empty;
        };
        let arg = words.next();

        match head {
            "/help" | "/?" => Command::Help,
            "/scan" => Command::Scan,
            "/turn" => Command::Turn,
            "/camera" => match arg.map(str::parse::<CameraSource>) {
                None => Command::Camera(None),
                Some(Ok(source)) => Command::Camera(Some(source)),
                Some(Err(e)) => Command::Invalid(e.to_string()),
            },
            "/move" => match arg {
                None => Command::Invalid("usage: /move <maneuver>".to_string()),
                Some(name) => match name.parse::<Maneuver>() {
                    Ok(Maneuver::Quit) => Command::Quit,
                    Ok(m) => Command::Move(m),
                    Err(e) => Command::Invalid(e.to_string()),
                },
            },
            "/status" => Command::Status,
            "/settings" => Command::Settings,
            "/quit" | "/exit" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// Whether the loop keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Everything the shell operates on between commands.
pub struct Session {
    orchestrator: CaptureOrchestrator,
    cancel: CancelToken,
    /// The configuration the running platform was built from.
    config: Config,
    /// Saved with `/settings`; takes effect on the next start.
    pending: Option<Config>,
    last_report: Option<ScanReport>,
}

impl Session {
    /// `cancel` is shared with the Ctrl-C handler so an in-flight scan can
    /// be stopped between waypoints.
    pub fn new(orchestrator: CaptureOrchestrator, cancel: CancelToken, config: Config) -> Self {
        Self {
            orchestrator,
            cancel,
            config,
            pending: None,
            last_report: None,
        }
    }

    pub fn orchestrator(&self) -> &CaptureOrchestrator {
        &self.orchestrator
    }

    pub fn last_report(&self) -> Option<&ScanReport> {
        self.last_report.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pending_config(&self) -> Option<&Config> {
        self.pending.as_ref()
    }

    /// Record settings written to disk.  The live platform keeps running on
    /// the configuration it was started with.
    fn stage_settings(&mut self, saved: Config) {
        self.pending = (saved != self.config).then_some(saved);
    }

    /// Run one command and report whether the loop should continue.
    pub fn dispatch(&mut self, command: Command) -> Flow {
        match command {
            Command::Empty => {}
            Command::Help => cmd_help(),
            Command::Scan => self.cmd_maneuver(Maneuver::Scan),
            Command::Turn => self.cmd_maneuver(Maneuver::Turn),
            Command::Move(maneuver) => self.cmd_maneuver(maneuver),
            Command::Camera(target) => self.cmd_camera(target),
            Command::Status => self.cmd_status(),
            Command::Settings => {
                let base = self.pending.as_ref().unwrap_or(&self.config).clone();
                if let Some(saved) = cmd_settings(base) {
                    self.stage_settings(saved);
                }
            }
            Command::Quit => {
                println!("{}", "Goodbye.".green());
                return Flow::Quit;
            }
            Command::Invalid(msg) => println!("{}: {}", "Invalid argument".red(), msg),
            Command::Unknown(other) => println!(
                "{} '{}'. Type {} for available commands.",
                "Unknown command:".red(),
                other.yellow(),
                "/help".bold()
            ),
        }
        Flow::Continue
    }

    fn cmd_maneuver(&mut self, maneuver: Maneuver) {
        // A Ctrl-C from an earlier scan must not cancel this one.
        self.cancel.reset();
        match self.orchestrator.execute(maneuver, Some(&self.cancel)) {
            Ok(Some(report)) => {
                print_report(&report);
                self.last_report = Some(report);
            }
            Ok(None) => println!("  {} {}", "✓".green(), maneuver.to_string().bold()),
            Err(e) => report_error(maneuver, &e),
        }
    }

    fn cmd_camera(&mut self, target: Option<CameraSource>) {
        let camera = match target {
            Some(source) => {
                self.orchestrator.select_camera(source);
                source
            }
            None => self.orchestrator.switch_camera(),
        };
        println!("  Camera: {}", camera.to_string().bold().cyan());
    }

    fn cmd_status(&self) {
        println!();
        println!("{}", "Sentinel Status".bold().underline());
        println!(
            "  Camera         : {}",
            self.orchestrator().current_camera().to_string().cyan()
        );
        println!("  Motion         : {:?}", self.orchestrator().motion_state());
        println!(
            "  Frames         : {} processed, {} in history",
            self.orchestrator().frame_count(),
            self.orchestrator().history().len()
        );
        println!("  Output dir     : {}", self.config().output_dir.display());
        if let Some(pending) = self.pending_config() {
            println!(
                "  {}",
                format!(
                    "Saved settings apply on restart (output dir {}).",
                    pending.output_dir.display()
                )
                .yellow()
            );
        }
        match self.last_report() {
            Some(report) => println!(
                "  Last scan      : {} ({} captured, {} dropped, {})",
                report.scan_id,
                report.captured,
                report.dropped,
                threat_label(report)
            ),
            None => println!("  Last scan      : {}", "none".dimmed()),
        }
        println!();
    }
}

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(mut session: Session, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "sentinel>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        if session.dispatch(Command::parse(&line)) == Flow::Quit {
            shutdown.store(true, Ordering::SeqCst);
            break;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "Sentinel Commands".bold().underline());
    println!("  {}             – head scan with threat analysis", "/scan".bold().cyan());
    println!("  {}             – closed-loop circular turn", "/turn".bold().cyan());
    println!("  {}  – next camera, or jump to one", "/camera [source]".bold().cyan());
    println!(
        "  {}  – forward | backward | left | right | turn | scan",
        "/move <maneuver>".bold().cyan()
    );
    println!("  {}           – camera, motion and last scan", "/status".bold().cyan());
    println!("  {}         – edit ~/.sentinel/config.toml", "/settings".bold().cyan());
    println!("  {}      – exit the shell", "/quit  /exit".bold().cyan());
    println!();
}

/// Edit `cfg` interactively and save it.  Returns the saved configuration.
fn cmd_settings(mut cfg: Config) -> Option<Config> {
    println!("{}", "Settings Editor".bold().underline());
    println!("  (press Enter to keep the current value)");

    let dir = prompt_str(
        &format!("  Output dir     [{}]: ", cfg.output_dir.display()),
        &cfg.output_dir.to_string_lossy(),
    );
    cfg.output_dir = dir.into();

    let camera = prompt_str(
        &format!("  Start camera   [{}]: ", cfg.start_camera),
        cfg.start_camera.id(),
    );
    match camera.parse::<CameraSource>() {
        Ok(source) => cfg.start_camera = source,
        Err(e) => println!("  {}: {}", "Keeping camera".yellow(), e),
    }

    cfg.scan_frame_count = prompt_parsed(
        &format!("  Scan frames    [{}]: ", cfg.scan_frame_count),
        cfg.scan_frame_count,
    );
    cfg.settle_ms = prompt_parsed(&format!("  Settle ms      [{}]: ", cfg.settle_ms), cfg.settle_ms);
    cfg.capture_timeout_ms = prompt_parsed(
        &format!("  Capture timeout ms [{}]: ", cfg.capture_timeout_ms),
        cfg.capture_timeout_ms,
    );

    match config::save(&cfg) {
        Ok(()) => {
            println!(
                "{} {}",
                "Settings saved to".green(),
                config::config_path().display()
            );
            println!("  Changes apply on the next start.");
            Some(cfg)
        }
        Err(e) => {
            println!("{}: {}", "Error saving settings".red(), e);
            None
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output helpers
// ─────────────────────────────────────────────────────────────────────────────

fn print_report(report: &ScanReport) {
    println!();
    println!(
        "{} {}",
        "Scan".bold(),
        report.scan_id.to_string().dimmed()
    );
    println!("  Camera    : {}", report.camera.to_string().cyan());
    println!(
        "  Waypoints : {}   captured {}   dropped {}",
        report.waypoints, report.captured, report.dropped
    );
    println!("  Artifacts : {}", report.artifacts.len());
    if report.cancelled {
        println!("  {}", "Cancelled before completion.".yellow());
    }
    println!("  Result    : {}", threat_label(report));
    for region in &report.threats {
        let b = region.bounds;
        println!(
            "    region ({}, {}) – ({}, {}), {} markers",
            b.min_x,
            b.min_y,
            b.max_x,
            b.max_y,
            region.members.len()
        );
    }
    println!();
}

fn threat_label(report: &ScanReport) -> colored::ColoredString {
    if report.threat_detected() {
        format!("{} threat frame(s)", report.threats.len()).red().bold()
    } else {
        "no threat".green()
    }
}

fn report_error(maneuver: Maneuver, e: &SentinelError) {
    warn!(%maneuver, error = %e, "maneuver failed");
    println!("{} {}: {}", "✗".red(), maneuver.to_string().bold(), e);
}

// ─────────────────────────────────────────────────────────────────────────────
// Prompt helpers
// ─────────────────────────────────────────────────────────────────────────────

fn prompt_str(msg: &str, default: &str) -> String {
    print!("{msg}");
    io::stdout().flush().ok();
    let mut buf = String::new();
    io::stdin().lock().read_line(&mut buf).ok();
    let trimmed = buf.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

fn prompt_parsed<T: std::str::FromStr + Copy>(msg: &str, default: T) -> T {
    prompt_str(msg, "").parse().unwrap_or(default)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_hal::camera::FrameAcquirer;
    use sentinel_hal::clock::ManualClock;
    use sentinel_hal::motion::MotionCommand;
    use sentinel_hal::sim::{SimCamera, SimMotion};
    use sentinel_runtime::{MemorySink, MotionState};

    fn session(camera: SimCamera) -> (Session, Arc<SimMotion>, Arc<MemorySink>) {
        let motion = Arc::new(SimMotion::new());
        let sink = Arc::new(MemorySink::new());
        let cfg = Config {
            scan_frame_count: 4,
            ..Config::default()
        };
        let orchestrator = CaptureOrchestrator::new(
            cfg.orchestrator_config(),
            FrameAcquirer::new(Arc::new(camera)),
            motion.clone(),
            Arc::new(ManualClock::new()),
            sink.clone(),
        );
        (Session::new(orchestrator, CancelToken::new(), cfg), motion, sink)
    }

    #[test]
    fn parses_every_command() {
        assert_eq!(Command::parse("/help"), Command::Help);
        assert_eq!(Command::parse("  /scan \n"), Command::Scan);
        assert_eq!(Command::parse("/turn"), Command::Turn);
        assert_eq!(Command::parse("/camera"), Command::Camera(None));
        assert_eq!(
            Command::parse("/camera back_fisheye"),
            Command::Camera(Some(CameraSource::BackFisheye))
        );
        assert_eq!(
            Command::parse("/move Left"),
            Command::Move(Maneuver::Left)
        );
        assert_eq!(Command::parse("/status"), Command::Status);
        assert_eq!(Command::parse("/settings"), Command::Settings);
        assert_eq!(Command::parse("/exit"), Command::Quit);
        assert_eq!(Command::parse("   "), Command::Empty);
    }

    #[test]
    fn move_quit_leaves_the_shell() {
        assert_eq!(Command::parse("/move quit"), Command::Quit);
    }

    #[test]
    fn bad_arguments_are_invalid_not_unknown() {
        assert!(matches!(Command::parse("/move sideways"), Command::Invalid(_)));
        assert!(matches!(Command::parse("/move"), Command::Invalid(_)));
        assert!(matches!(Command::parse("/camera periscope"), Command::Invalid(_)));
        assert_eq!(
            Command::parse("/launch"),
            Command::Unknown("/launch".to_string())
        );
    }

    #[test]
    fn camera_command_rotates_and_selects() {
        let (mut s, _, _) = session(SimCamera::new(8, 8));
        assert_eq!(s.dispatch(Command::Camera(None)), Flow::Continue);
        assert_eq!(
            s.orchestrator().current_camera(),
            CameraSource::FrontRightFisheye
        );
        s.dispatch(Command::Camera(Some(CameraSource::LeftFisheye)));
        assert_eq!(s.orchestrator().current_camera(), CameraSource::LeftFisheye);
    }

    #[test]
    fn scan_command_stores_report_and_persists_frames() {
        let (mut s, motion, sink) = session(SimCamera::new(32, 24));
        assert_eq!(s.dispatch(Command::Scan), Flow::Continue);

        let report = s.last_report().expect("scan report kept");
        assert_eq!(report.captured, 4);
        assert!(!report.threat_detected());
        assert_eq!(sink.len(), 12);
        // Four waypoints plus the reset to neutral.
        assert_eq!(motion.head_poses().len(), 5);
        assert_eq!(s.orchestrator().motion_state(), MotionState::Idle);
    }

    #[test]
    fn pending_cancel_is_cleared_before_a_new_scan() {
        let (mut s, _, _) = session(SimCamera::new(16, 16));
        s.cancel.cancel();
        s.dispatch(Command::Scan);
        let report = s.last_report().expect("scan report kept");
        assert!(!report.cancelled);
        assert_eq!(report.captured, 4);
    }

    #[test]
    fn saved_settings_wait_for_restart() {
        let (mut s, _, _) = session(SimCamera::new(8, 8));
        let live_dir = s.config().output_dir.clone();

        s.stage_settings(Config {
            output_dir: "/srv/frames".into(),
            ..s.config().clone()
        });
        assert_eq!(s.config().output_dir, live_dir);
        assert_eq!(
            s.pending_config().map(|c| c.output_dir.clone()),
            Some(std::path::PathBuf::from("/srv/frames"))
        );
        assert_eq!(s.dispatch(Command::Status), Flow::Continue);

        // Saving the running values again clears the pending change.
        let live = s.config().clone();
        s.stage_settings(live);
        assert!(s.pending_config().is_none());
    }

    #[test]
    fn move_forward_issues_one_goal() {
        let (mut s, motion, _) = session(SimCamera::new(8, 8));
        s.dispatch(Command::Move(Maneuver::Forward));
        let cmds = motion.commands();
        assert_eq!(cmds.len(), 1);
        assert!(matches!(cmds[0], MotionCommand::Goal(g) if g.x == 1.0));
        assert!(s.last_report().is_none());
    }

    #[test]
    fn failed_maneuver_keeps_the_shell_running() {
        let sink = Arc::new(MemorySink::new());
        let orchestrator = CaptureOrchestrator::new(
            Config::default().orchestrator_config(),
            FrameAcquirer::new(Arc::new(SimCamera::new(8, 8))),
            Arc::new(SimMotion::faulted("estop engaged")),
            Arc::new(ManualClock::new()),
            sink,
        );
        let mut s = Session::new(orchestrator, CancelToken::new(), Config::default());
        assert_eq!(s.dispatch(Command::Turn), Flow::Continue);
        assert_eq!(s.dispatch(Command::Quit), Flow::Quit);
    }
}

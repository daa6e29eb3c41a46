//! `sentinel-runtime` – scan orchestration.
//!
//! Runs the capture pipeline in lock-step with the robot's motion: the head
//! settles, a frame is taken, analysed and persisted, and only then does the
//! next waypoint start.
//!
//! # Modules
//!
//! - [`motion`] – [`MotionSequencer`][motion::MotionSequencer] with its
//!   [`ScanTrajectory`][motion::ScanTrajectory] (head pitch sweep) and
//!   [`TurnProfile`][motion::TurnProfile] (closed circular turn) primitives.
//! - [`capture`] – [`CaptureOrchestrator`][capture::CaptureOrchestrator]:
//!   acquire → extract → classify → render → persist per waypoint, plus
//!   camera switching and operator maneuvers; produces a
//!   [`ScanReport`][capture::ScanReport].
//! - [`maneuver`] – [`Maneuver`][maneuver::Maneuver]: the operator's movement
//!   vocabulary.
//! - [`artifact`] – [`DirectorySink`][artifact::DirectorySink] and
//!   [`MemorySink`][artifact::MemorySink] persistence back-ends.
//! - [`cancel`] – [`CancelToken`][cancel::CancelToken] for stopping a head
//!   scan between waypoints.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: `tracing`
//!   subscriber with optional OTLP span export.

pub mod artifact;
pub mod cancel;
pub mod capture;
pub mod maneuver;
pub mod motion;
pub mod telemetry;

pub use artifact::{DirectorySink, MemorySink};
pub use cancel::CancelToken;
pub use capture::{CaptureOrchestrator, OrchestratorConfig, ScanReport};
pub use maneuver::Maneuver;
pub use motion::{MotionSequencer, MotionState, ScanTrajectory, TurnProfile, Waypoint};
pub use telemetry::{TracerProviderGuard, init_tracing};

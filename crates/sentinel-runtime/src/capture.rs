//! [`CaptureOrchestrator`] – motion-synchronised capture and analysis.
//!
//! For every waypoint the [`MotionSequencer`] yields (head settled), the
//! orchestrator:
//!
//! 1. acquires one frame from the current camera;
//! 2. persists it as `original_…`;
//! 3. extracts markers, pushes them into the [`TemporalHistory`] and runs
//!    the [`ClusterThreatClassifier`];
//! 4. persists the annotated (or unchanged) frame as `threat_detection_…`;
//! 5. renders and persists the false-colour frame as `thermal_vision_…`.
//!
//! A failed acquisition skips steps 2–5 for that waypoint only.  The frame
//! sequence number advances on successful acquisitions alone, so artifact
//! numbering has no gaps.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sentinel_hal::sim::{SimCamera, SimMotion};
//! use sentinel_hal::{FrameAcquirer, ManualClock};
//! use sentinel_runtime::{CaptureOrchestrator, MemorySink, OrchestratorConfig};
//!
//! let camera = SimCamera::new(160, 120).with_disc(40, 40, 8, [255, 0, 0]);
//! let sink = Arc::new(MemorySink::new());
//! let mut orchestrator = CaptureOrchestrator::new(
//!     OrchestratorConfig { scan_frame_count: 3, ..Default::default() },
//!     FrameAcquirer::new(Arc::new(camera)),
//!     Arc::new(SimMotion::new()),
//!     Arc::new(ManualClock::new()),
//!     sink.clone(),
//! );
//! let report = orchestrator.run_scan_sequence(None).unwrap();
//! assert_eq!(report.captured, 3);
//! assert_eq!(sink.len(), 9);
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sentinel_hal::{CameraSourceManager, Clock, FrameAcquirer, MotionPlatform};
use sentinel_perception::{
    Classification, ClassifierConfig, ClusterThreatClassifier, ExtractorConfig, MarkerExtractor,
    TemporalHistory, ThermalConfig, ThermalRenderer,
};
use sentinel_types::{
    ArtifactKind, ArtifactSink, CameraSource, Frame, GoalOffset, HeadPose, SentinelError,
    SequenceError, ThreatRegion,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::cancel::CancelToken;
use crate::maneuver::Maneuver;
use crate::motion::{MotionSequencer, MotionState, ScanTrajectory, TurnProfile};

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Configuration bundle for [`CaptureOrchestrator`].
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Entries kept in the temporal history window.
    pub history_depth: usize,
    pub extractor: ExtractorConfig,
    pub classifier: ClassifierConfig,
    pub thermal: ThermalConfig,
    // ── Scan ─────────────────────────────────────────────────────────────
    pub scan_start_pitch: f64,
    pub scan_end_pitch: f64,
    pub scan_frame_count: usize,
    /// Settle delay after each scan waypoint.
    pub settle: Duration,
    /// Settle delay after the head returns to neutral at the end of a scan.
    pub head_reset_settle: Duration,
    // ── Maneuvers ────────────────────────────────────────────────────────
    pub turn_radius: f64,
    /// Head yaw (rad) used to look left/right before stepping.
    pub look_yaw: f64,
    pub look_settle: Duration,
    /// Length (m) of a forward/backward step.
    pub step_distance: f64,
    /// Pause after every maneuver.
    pub maneuver_pause: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            history_depth: 10,
            extractor: ExtractorConfig::default(),
            classifier: ClassifierConfig::default(),
            thermal: ThermalConfig::default(),
            scan_start_pitch: 0.0,
            scan_end_pitch: 0.5,
            scan_frame_count: 20,
            settle: Duration::from_millis(100),
            head_reset_settle: Duration::from_secs(1),
            turn_radius: 0.3,
            look_yaw: 0.5,
            look_settle: Duration::from_millis(500),
            step_distance: 1.0,
            maneuver_pause: Duration::from_millis(100),
        }
    }
}

impl OrchestratorConfig {
    /// The pitch sweep described by the scan fields.
    pub fn scan_trajectory(&self) -> Result<ScanTrajectory, SequenceError> {
        ScanTrajectory::pitch_sweep(
            self.scan_start_pitch,
            self.scan_end_pitch,
            self.scan_frame_count,
            self.settle,
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Report
// ────────────────────────────────────────────────────────────────────────────

/// Summary of one head scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub scan_id: Uuid,
    pub camera: CameraSource,
    pub started_at: DateTime<Utc>,
    /// Waypoints the head actually reached.
    pub waypoints: usize,
    pub captured: usize,
    pub dropped: usize,
    /// Regions flagged during the scan, in capture order.
    pub threats: Vec<ThreatRegion>,
    /// Artifact names persisted by the orchestrator.
    pub artifacts: Vec<String>,
    /// The scan stopped early on request.
    pub cancelled: bool,
}

impl ScanReport {
    fn new(camera: CameraSource) -> Self {
        Self {
            scan_id: Uuid::new_v4(),
            camera,
            started_at: Utc::now(),
            waypoints: 0,
            captured: 0,
            dropped: 0,
            threats: Vec::new(),
            artifacts: Vec::new(),
            cancelled: false,
        }
    }

    pub fn threat_detected(&self) -> bool {
        !self.threats.is_empty()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Per-frame pipeline
// ────────────────────────────────────────────────────────────────────────────

struct FramePipeline {
    extractor: MarkerExtractor,
    history: TemporalHistory,
    classifier: ClusterThreatClassifier,
    renderer: ThermalRenderer,
    sink: Arc<dyn ArtifactSink>,
    /// Sequence number of the next successfully acquired frame.
    frame_count: u64,
}

impl FramePipeline {
    fn process(&mut self, frame: &Frame, report: &mut ScanReport) {
        let seq = self.frame_count;
        let stamp = frame.captured_at();

        self.persist(ArtifactKind::Original.artifact_name(stamp, Some(seq)), frame, report);

        let markers = self.extractor.extract(frame, seq);
        self.history.push(markers);
        let assessment = self.classifier.classify(&self.history, frame);
        if let Classification::Threat(region) = &assessment.classification {
            report.threats.push(region.clone());
        }
        let detection = assessment.annotated.as_ref().unwrap_or(frame);
        self.persist(
            ArtifactKind::ThreatDetection.artifact_name(stamp, Some(seq)),
            detection,
            report,
        );

        let thermal = self.renderer.render(frame);
        self.persist(
            ArtifactKind::ThermalVision.artifact_name(stamp, Some(seq)),
            &thermal,
            report,
        );

        self.frame_count += 1;
    }

    fn persist(&self, name: String, frame: &Frame, report: &mut ScanReport) {
        match self.sink.persist(&name, frame) {
            Ok(()) => report.artifacts.push(name),
            Err(e) => warn!(artifact = %name, error = %e, "artifact not persisted"),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

/// Owns the capture pipeline, the camera selection and the motion
/// sequencer, and runs scans and maneuvers on a single thread of control.
pub struct CaptureOrchestrator {
    config: OrchestratorConfig,
    acquirer: FrameAcquirer,
    sources: CameraSourceManager,
    sequencer: MotionSequencer,
    pipeline: FramePipeline,
}

impl CaptureOrchestrator {
    /// Wire the pipeline.  `sink` receives every artifact, including the
    /// classifier's on-detect `threat_detected_…` frames.
    pub fn new(
        config: OrchestratorConfig,
        acquirer: FrameAcquirer,
        platform: Arc<dyn MotionPlatform>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn ArtifactSink>,
    ) -> Self {
        let pipeline = FramePipeline {
            extractor: MarkerExtractor::new(config.extractor.clone()),
            history: TemporalHistory::with_capacity(config.history_depth),
            classifier: ClusterThreatClassifier::new(config.classifier.clone())
                .with_sink(Arc::clone(&sink)),
            renderer: ThermalRenderer::new(config.thermal.clone()),
            sink,
            frame_count: 0,
        };
        Self {
            config,
            acquirer,
            sources: CameraSourceManager::default(),
            sequencer: MotionSequencer::new(platform, clock),
            pipeline,
        }
    }

    /// Start with `camera` selected instead of the default front-left one.
    pub fn with_camera(mut self, camera: CameraSource) -> Self {
        self.sources.select(camera);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn current_camera(&self) -> CameraSource {
        self.sources.current()
    }

    /// Rotate to the next camera and return it.
    pub fn switch_camera(&mut self) -> CameraSource {
        self.sources.advance()
    }

    pub fn select_camera(&mut self, camera: CameraSource) {
        self.sources.select(camera);
    }

    pub fn motion_state(&self) -> MotionState {
        self.sequencer.state()
    }

    pub fn history(&self) -> &TemporalHistory {
        &self.pipeline.history
    }

    /// Frames successfully acquired since construction.
    pub fn frame_count(&self) -> u64 {
        self.pipeline.frame_count
    }

    /// Traverse `trajectory`, capturing and analysing one frame per settled
    /// waypoint.
    ///
    /// `cancel` is checked before each waypoint; a waypoint that has started
    /// is always finished.
    ///
    /// # Errors
    ///
    /// Motion faults end the scan and are returned.  Capture and persistence
    /// failures are logged and never abort it.
    pub fn run_head_scan(
        &mut self,
        trajectory: &ScanTrajectory,
        cancel: Option<&CancelToken>,
    ) -> Result<ScanReport, SentinelError> {
        let camera = self.sources.current();
        let mut report = ScanReport::new(camera);
        info!(
            scan_id = %report.scan_id,
            camera = %camera,
            waypoints = trajectory.len(),
            "head scan started"
        );

        let mut scan = self.sequencer.head_scan(trajectory);
        loop {
            if cancel.is_some_and(CancelToken::is_cancelled) {
                report.cancelled = true;
                info!(scan_id = %report.scan_id, remaining = scan.remaining(), "head scan cancelled");
                break;
            }
            let Some(step) = scan.next() else { break };
            let waypoint = step?;
            report.waypoints += 1;

            match self.acquirer.capture(camera) {
                Ok(frame) => {
                    report.captured += 1;
                    self.pipeline.process(&frame, &mut report);
                }
                Err(e) => {
                    report.dropped += 1;
                    warn!(pitch = waypoint.pose.pitch, error = %e, "frame dropped");
                }
            }
        }
        drop(scan);

        info!(
            scan_id = %report.scan_id,
            captured = report.captured,
            dropped = report.dropped,
            threats = report.threats.len(),
            "head scan finished"
        );
        Ok(report)
    }

    /// Run the configured pitch sweep, then return the head to neutral and
    /// let it settle.
    ///
    /// # Errors
    ///
    /// [`SentinelError::Sequence`] when the configured frame count is below
    /// two (raised before any motion), or the first motion fault.
    pub fn run_scan_sequence(
        &mut self,
        cancel: Option<&CancelToken>,
    ) -> Result<ScanReport, SentinelError> {
        let trajectory = self.config.scan_trajectory()?;
        let scanned = self.run_head_scan(&trajectory, cancel);
        let reset = self
            .sequencer
            .move_head(HeadPose::NEUTRAL, self.config.head_reset_settle);
        let report = scanned?;
        reset?;
        Ok(report)
    }

    /// Closed-loop turn with the configured radius.
    pub fn execute_turn(&mut self) -> Result<(), SentinelError> {
        let profile = TurnProfile::for_radius(self.config.turn_radius)?;
        self.sequencer.execute_turn(&profile)
    }

    /// Carry out one operator maneuver, followed by the maneuver pause.
    ///
    /// Returns the scan report for [`Maneuver::Scan`].  [`Maneuver::Quit`]
    /// issues nothing.
    pub fn execute(
        &mut self,
        maneuver: Maneuver,
        cancel: Option<&CancelToken>,
    ) -> Result<Option<ScanReport>, SentinelError> {
        info!(%maneuver, "executing maneuver");
        let step = self.config.step_distance;
        let mut report = None;
        match maneuver {
            Maneuver::Quit => return Ok(None),
            Maneuver::Forward => self.sequencer.translate(GoalOffset { x: step, y: 0.0 })?,
            Maneuver::Backward => self.sequencer.translate(GoalOffset { x: -step, y: 0.0 })?,
            Maneuver::Left | Maneuver::Right => {
                let yaw = if maneuver == Maneuver::Left {
                    self.config.look_yaw
                } else {
                    -self.config.look_yaw
                };
                self.sequencer
                    .move_head(HeadPose::yawed(yaw), self.config.look_settle)?;
                self.sequencer.translate(GoalOffset { x: step, y: 0.0 })?;
                self.sequencer.move_head(HeadPose::NEUTRAL, Duration::ZERO)?;
            }
            Maneuver::Turn => self.execute_turn()?,
            Maneuver::Scan => report = Some(self.run_scan_sequence(cancel)?),
        }
        self.sequencer.clock().sleep(self.config.maneuver_pause);
        Ok(report)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

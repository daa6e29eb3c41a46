//! [`MotionSequencer`] – parameterised motion primitives with explicit
//! settle timing.
//!
//! Two primitives drive the robot during a scan:
//!
//! - **Head-scan traversal** over a [`ScanTrajectory`]: the sequencer moves
//!   the head to one waypoint, waits for its settle delay and only then hands
//!   the waypoint back to the caller, so a frame captured afterwards always
//!   matches the commanded pose.
//! - **Closed-loop turn** from a [`TurnProfile`]: twenty constant-length
//!   velocity segments whose heading sweeps a full circle, followed by a
//!   stabilisation pause.  A turn always runs to completion.
//!
//! Every delay is issued through the injected [`Clock`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use sentinel_hal::sim::SimMotion;
//! use sentinel_hal::ManualClock;
//! use sentinel_runtime::motion::{MotionSequencer, ScanTrajectory};
//!
//! let motion = Arc::new(SimMotion::new());
//! let clock = Arc::new(ManualClock::new());
//! let mut sequencer = MotionSequencer::new(motion.clone(), clock.clone());
//!
//! let sweep = ScanTrajectory::pitch_sweep(0.0, 0.5, 6, Duration::from_millis(100)).unwrap();
//! for waypoint in sequencer.head_scan(&sweep) {
//!     let waypoint = waypoint.unwrap();
//!     // capture a frame here: the head has settled at `waypoint.pose`
//!     let _ = waypoint.pose.pitch;
//! }
//! assert_eq!(motion.head_poses().len(), 6);
//! assert_eq!(clock.delays().len(), 6);
//! ```

use std::f64::consts::TAU;
use std::sync::Arc;
use std::time::Duration;

use sentinel_hal::{Clock, MotionPlatform};
use sentinel_types::{GoalOffset, HeadPose, SentinelError, SequenceError, VelocityCommand};
use tracing::{debug, info};

// ────────────────────────────────────────────────────────────────────────────
// Constants
// ────────────────────────────────────────────────────────────────────────────

/// Settle delay after each head-scan waypoint.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(100);
/// Turn angular velocity (rad/s).
pub const TURN_ANGULAR_VELOCITY: f64 = 0.8;
/// Extra time on top of one full revolution so the loop closes.
pub const TURN_OVERSHOOT: f64 = 1.1;
pub const TURN_SEGMENTS: usize = 20;
/// Pause after the last turn segment.
pub const TURN_STABILIZATION: Duration = Duration::from_millis(500);

// ────────────────────────────────────────────────────────────────────────────
// Scan trajectory
// ────────────────────────────────────────────────────────────────────────────

/// One commanded head pose and how long to wait after reaching it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub pose: HeadPose,
    pub settle: Duration,
}

/// Ordered head-pose waypoints for one scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanTrajectory {
    waypoints: Vec<Waypoint>,
}

impl ScanTrajectory {
    /// `frame_count` evenly spaced pitches from `start` to `end` inclusive,
    /// yaw and roll held at zero.
    ///
    /// # Errors
    ///
    /// [`SequenceError::InvalidFrameCount`] when `frame_count < 2`.
    pub fn pitch_sweep(
        start: f64,
        end: f64,
        frame_count: usize,
        settle: Duration,
    ) -> Result<Self, SequenceError> {
        if frame_count < 2 {
            return Err(SequenceError::InvalidFrameCount(frame_count));
        }
        let last = frame_count - 1;
        let waypoints = (0..frame_count)
            .map(|i| {
                let pitch = if i == last {
                    end
                } else {
                    start + (end - start) * i as f64 / last as f64
                };
                Waypoint {
                    pose: HeadPose::pitched(pitch),
                    settle,
                }
            })
            .collect();
        Ok(Self { waypoints })
    }

    /// Trajectory from explicit waypoints.
    pub fn from_waypoints(waypoints: Vec<Waypoint>) -> Self {
        Self { waypoints }
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn pitches(&self) -> Vec<f64> {
        self.waypoints.iter().map(|w| w.pose.pitch).collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Turn profile
// ────────────────────────────────────────────────────────────────────────────

/// Derived parameters of a closed circular turn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnProfile {
    pub radius: f64,
    /// ω (rad/s).
    pub angular_velocity: f64,
    /// v = r·ω (m/s).
    pub linear_velocity: f64,
    pub total_duration: Duration,
    pub segments: usize,
    pub stabilization: Duration,
}

impl TurnProfile {
    /// # Errors
    ///
    /// [`SequenceError::InvalidTurnRadius`] for negative or non-finite radii.
    pub fn for_radius(radius: f64) -> Result<Self, SequenceError> {
        if !radius.is_finite() || radius < 0.0 {
            return Err(SequenceError::InvalidTurnRadius(radius));
        }
        let angular_velocity = TURN_ANGULAR_VELOCITY;
        Ok(Self {
            radius,
            angular_velocity,
            linear_velocity: radius * angular_velocity,
            total_duration: Duration::from_secs_f64(TAU / angular_velocity * TURN_OVERSHOOT),
            segments: TURN_SEGMENTS,
            stabilization: TURN_STABILIZATION,
        })
    }

    pub fn segment_duration(&self) -> Duration {
        self.total_duration / self.segments as u32
    }

    /// Velocity command for segment `k`: heading θ = (k / segments)·2π.
    pub fn segment_command(&self, k: usize) -> VelocityCommand {
        let theta = k as f64 / self.segments as f64 * TAU;
        VelocityCommand {
            v_x: self.linear_velocity * theta.cos(),
            v_y: self.linear_velocity * theta.sin(),
            v_rot: self.angular_velocity,
            duration: self.segment_duration(),
        }
    }

    pub fn commands(&self) -> impl Iterator<Item = VelocityCommand> + '_ {
        (0..self.segments).map(|k| self.segment_command(k))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sequencer
// ────────────────────────────────────────────────────────────────────────────

/// Observable state of the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionState {
    #[default]
    Idle,
    /// Working on `segment` (zero-based) of `total`.
    Executing { segment: usize, total: usize },
}

/// Issues motion primitives to a [`MotionPlatform`], one blocking step at a
/// time.
pub struct MotionSequencer {
    platform: Arc<dyn MotionPlatform>,
    clock: Arc<dyn Clock>,
    state: MotionState,
}

impl MotionSequencer {
    pub fn new(platform: Arc<dyn MotionPlatform>, clock: Arc<dyn Clock>) -> Self {
        Self {
            platform,
            clock,
            state: MotionState::Idle,
        }
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Step through `trajectory`.  Each `next()` moves the head to one
    /// waypoint and blocks for its settle delay before yielding it.  The
    /// first platform error is yielded once and ends the traversal.
    pub fn head_scan<'a>(&'a mut self, trajectory: &'a ScanTrajectory) -> HeadScan<'a> {
        HeadScan {
            sequencer: self,
            trajectory,
            next: 0,
            failed: false,
        }
    }

    /// Drive a full closed-loop turn.  Not interruptible.
    ///
    /// # Errors
    ///
    /// The first platform error aborts the turn and is returned.
    pub fn execute_turn(&mut self, profile: &TurnProfile) -> Result<(), SentinelError> {
        info!(
            radius = profile.radius,
            segments = profile.segments,
            duration_s = profile.total_duration.as_secs_f64(),
            "turn started"
        );
        let result = self.drive_segments(profile);
        self.state = MotionState::Idle;
        result?;
        info!("turn complete");
        Ok(())
    }

    fn drive_segments(&mut self, profile: &TurnProfile) -> Result<(), SentinelError> {
        for (segment, command) in profile.commands().enumerate() {
            self.state = MotionState::Executing {
                segment,
                total: profile.segments,
            };
            debug!(segment, v_x = command.v_x, v_y = command.v_y, "turn segment");
            self.platform.drive(command)?;
            self.clock.sleep(command.duration);
        }
        self.clock.sleep(profile.stabilization);
        Ok(())
    }

    /// Move the head to `pose` and block for `settle`.
    pub fn move_head(&mut self, pose: HeadPose, settle: Duration) -> Result<(), SentinelError> {
        self.platform.move_head(pose)?;
        if !settle.is_zero() {
            self.clock.sleep(settle);
        }
        Ok(())
    }

    /// Walk to `goal`, relative to the current body frame.
    pub fn translate(&mut self, goal: GoalOffset) -> Result<(), SentinelError> {
        debug!(x = goal.x, y = goal.y, "translate");
        self.platform.move_to_goal(goal)
    }
}

/// Iterator over a head scan; see [`MotionSequencer::head_scan`].
pub struct HeadScan<'a> {
    sequencer: &'a mut MotionSequencer,
    trajectory: &'a ScanTrajectory,
    next: usize,
    failed: bool,
}

impl HeadScan<'_> {
    pub fn state(&self) -> MotionState {
        self.sequencer.state
    }

    /// Waypoints not yet visited.
    pub fn remaining(&self) -> usize {
        self.trajectory.len().saturating_sub(self.next)
    }
}

impl Iterator for HeadScan<'_> {
    type Item = Result<Waypoint, SentinelError>;

    fn next(&mut self) -> Option<Self::Item> {
        let total = self.trajectory.len();
        if self.failed || self.next >= total {
            self.sequencer.state = MotionState::Idle;
            return None;
        }
        let waypoint = self.trajectory.waypoints[self.next];
        self.sequencer.state = MotionState::Executing {
            segment: self.next,
            total,
        };

        if let Err(e) = self.sequencer.platform.move_head(waypoint.pose) {
            self.failed = true;
            self.sequencer.state = MotionState::Idle;
            return Some(Err(e));
        }
        self.sequencer.clock.sleep(waypoint.settle);
        debug!(index = self.next, pitch = waypoint.pose.pitch, "waypoint settled");
        self.next += 1;
        Some(Ok(waypoint))
    }
}

impl Drop for HeadScan<'_> {
    fn drop(&mut self) {
        self.sequencer.state = MotionState::Idle;
    }
}

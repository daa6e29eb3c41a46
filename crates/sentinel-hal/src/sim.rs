//! In-process simulated drivers for CI/CD testing without a robot.
//!
//! [`SimCamera`] renders a synthetic scene (coloured discs on a flat
//! background), encodes it as PNG and serves it to every request.
//! [`SimMotion`] accepts every command and records it, so tests can assert on
//! exactly what would have been sent to the platform.
//!
//! # Example
//!
//! ```rust
//! use sentinel_hal::camera::FrameAcquirer;
//! use sentinel_hal::sim::SimCamera;
//! use sentinel_types::CameraSource;
//! use std::sync::Arc;
//!
//! let camera = SimCamera::new(320, 240).with_disc(100, 100, 8, [255, 0, 0]);
//! let acquirer = FrameAcquirer::new(Arc::new(camera));
//! let frame = acquirer
//!     .capture(CameraSource::FrontLeftFisheye)
//!     .expect("sim capture must succeed");
//! assert_eq!(frame.width(), 320);
//! ```

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use image::{ImageFormat, Rgb, RgbImage};
use sentinel_types::{CameraSource, GoalOffset, HeadPose, SentinelError, VelocityCommand};
use tracing::debug;

use crate::camera::CameraSubsystem;
use crate::motion::{MotionCommand, MotionPlatform};

// ────────────────────────────────────────────────────────────────────────────
// Simulated camera
// ────────────────────────────────────────────────────────────────────────────

/// A filled circle drawn into the simulated scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disc {
    pub x: i32,
    pub y: i32,
    pub radius: i32,
    pub color: [u8; 3],
}

/// A simulated camera serving one synthetic scene to every source.
pub struct SimCamera {
    width: u32,
    height: u32,
    background: [u8; 3],
    discs: Vec<Disc>,
    silent_sources: HashSet<CameraSource>,
    dropped_requests: HashSet<usize>,
    corrupted_requests: HashSet<usize>,
    corrupt: bool,
    latency: Duration,
    requests: AtomicUsize,
}

impl SimCamera {
    /// Black scene of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            background: [0, 0, 0],
            discs: Vec::new(),
            silent_sources: HashSet::new(),
            dropped_requests: HashSet::new(),
            corrupted_requests: HashSet::new(),
            corrupt: false,
            latency: Duration::ZERO,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn with_background(mut self, color: [u8; 3]) -> Self {
        self.background = color;
        self
    }

    /// Add a filled disc centred on `(x, y)`.
    pub fn with_disc(mut self, x: i32, y: i32, radius: i32, color: [u8; 3]) -> Self {
        self.discs.push(Disc {
            x,
            y,
            radius,
            color,
        });
        self
    }

    /// Make `source` return no data.
    pub fn silent_for(mut self, source: CameraSource) -> Self {
        self.silent_sources.insert(source);
        self
    }

    /// Return no data for the request with the given zero-based index.
    pub fn dropping_request(mut self, index: usize) -> Self {
        self.dropped_requests.insert(index);
        self
    }

    /// Serve undecodable bytes for the request with the given zero-based
    /// index.
    pub fn corrupting_request(mut self, index: usize) -> Self {
        self.corrupted_requests.insert(index);
        self
    }

    /// Serve bytes that are not a decodable image.
    pub fn corrupted(mut self) -> Self {
        self.corrupt = true;
        self
    }

    /// Block each request for `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of requests served so far (including dropped ones).
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Render the scene without encoding it.
    pub fn render(&self) -> RgbImage {
        let mut img = RgbImage::from_pixel(self.width, self.height, Rgb(self.background));
        for disc in &self.discs {
            fill_disc(&mut img, disc);
        }
        img
    }

    fn encode(&self) -> Option<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.render().write_to(&mut out, ImageFormat::Png).ok()?;
        Some(out.into_inner())
    }
}

impl CameraSubsystem for SimCamera {
    fn request_image(&self, source: CameraSource) -> Option<Vec<u8>> {
        let index = self.requests.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        if self.silent_sources.contains(&source) || self.dropped_requests.contains(&index) {
            debug!(camera = %source, request = index, "sim camera dropping request");
            return None;
        }
        if self.corrupt || self.corrupted_requests.contains(&index) {
            return Some(b"not an image".to_vec());
        }
        self.encode()
    }
}

/// Paint every pixel within `disc.radius` of the centre.
fn fill_disc(img: &mut RgbImage, disc: &Disc) {
    let r2 = i64::from(disc.radius) * i64::from(disc.radius);
    let (w, h) = (img.width() as i32, img.height() as i32);
    for y in (disc.y - disc.radius).max(0)..=(disc.y + disc.radius).min(h - 1) {
        for x in (disc.x - disc.radius).max(0)..=(disc.x + disc.radius).min(w - 1) {
            let dx = i64::from(x - disc.x);
            let dy = i64::from(y - disc.y);
            if dx * dx + dy * dy <= r2 {
                img.put_pixel(x as u32, y as u32, Rgb(disc.color));
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated motion platform
// ────────────────────────────────────────────────────────────────────────────

/// A simulated robot body that records every motion command.
#[derive(Default)]
pub struct SimMotion {
    log: Mutex<Vec<MotionCommand>>,
    fault: Option<String>,
}

impl SimMotion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every command with a [`SentinelError::HardwareFault`].
    pub fn faulted(details: impl Into<String>) -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            fault: Some(details.into()),
        }
    }

    /// Every command accepted so far, in call order.
    pub fn commands(&self) -> Vec<MotionCommand> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Only the head poses, in call order.
    pub fn head_poses(&self) -> Vec<HeadPose> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                MotionCommand::Head(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    /// Only the velocity commands, in call order.
    pub fn velocity_commands(&self) -> Vec<VelocityCommand> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                MotionCommand::Velocity(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    fn record(&self, component: &str, command: MotionCommand) -> Result<(), SentinelError> {
        if let Some(details) = &self.fault {
            return Err(SentinelError::HardwareFault {
                component: component.to_string(),
                details: details.clone(),
            });
        }
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command);
        Ok(())
    }
}

impl MotionPlatform for SimMotion {
    fn move_head(&self, pose: HeadPose) -> Result<(), SentinelError> {
        self.record("head", MotionCommand::Head(pose))
    }

    fn drive(&self, command: VelocityCommand) -> Result<(), SentinelError> {
        self.record("drive_base", MotionCommand::Velocity(command))
    }

    fn move_to_goal(&self, goal: GoalOffset) -> Result<(), SentinelError> {
        self.record("drive_base", MotionCommand::Goal(goal))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::FrameAcquirer;
    use sentinel_types::CaptureError;
    use std::sync::Arc;

    #[test]
    fn sim_camera_renders_discs_on_background() {
        let cam = SimCamera::new(50, 40)
            .with_background([0, 0, 40])
            .with_disc(20, 20, 3, [255, 0, 0]);
        let img = cam.render();
        assert_eq!(img.get_pixel(20, 20), &Rgb([255, 0, 0]));
        assert_eq!(img.get_pixel(23, 20), &Rgb([255, 0, 0]));
        assert_eq!(img.get_pixel(24, 20), &Rgb([0, 0, 40]));
        assert_eq!(img.get_pixel(0, 0), &Rgb([0, 0, 40]));
    }

    #[test]
    fn disc_partially_outside_frame_is_clipped() {
        let cam = SimCamera::new(10, 10).with_disc(0, 0, 4, [0, 255, 0]);
        let img = cam.render();
        assert_eq!(img.get_pixel(0, 0), &Rgb([0, 255, 0]));
        assert_eq!(img.get_pixel(9, 9), &Rgb([0, 0, 0]));
    }

    #[test]
    fn sim_camera_round_trips_through_acquirer() {
        let cam = SimCamera::new(64, 48).with_disc(32, 24, 5, [255, 0, 0]);
        let expected = cam.render();
        let acq = FrameAcquirer::new(Arc::new(cam));
        let frame = acq.capture(CameraSource::FrontLeftFisheye).unwrap();
        assert_eq!(frame.pixels(), &expected);
    }

    #[test]
    fn silent_source_and_dropped_request_return_none() {
        let cam = SimCamera::new(4, 4)
            .silent_for(CameraSource::BackFisheye)
            .dropping_request(1);
        assert!(cam.request_image(CameraSource::BackFisheye).is_none()); // #0 silent
        assert!(cam.request_image(CameraSource::LeftFisheye).is_none()); // #1 dropped
        assert!(cam.request_image(CameraSource::LeftFisheye).is_some()); // #2
        assert_eq!(cam.request_count(), 3);
    }

    #[test]
    fn corrupted_camera_yields_decode_failure() {
        let acq = FrameAcquirer::new(Arc::new(SimCamera::new(4, 4).corrupted()));
        assert!(matches!(
            acq.capture(CameraSource::LeftFisheye),
            Err(CaptureError::DecodeFailure { .. })
        ));
    }

    #[test]
    fn corrupting_request_affects_only_that_request() {
        let acq = FrameAcquirer::new(Arc::new(SimCamera::new(4, 4).corrupting_request(1)));
        assert!(acq.capture(CameraSource::LeftFisheye).is_ok());
        assert!(matches!(
            acq.capture(CameraSource::LeftFisheye),
            Err(CaptureError::DecodeFailure { .. })
        ));
        assert!(acq.capture(CameraSource::LeftFisheye).is_ok());
    }

    #[test]
    fn sim_motion_records_commands_in_order() {
        let motion = SimMotion::new();
        motion.move_head(HeadPose::pitched(0.2)).unwrap();
        motion
            .drive(VelocityCommand {
                v_x: 0.24,
                v_y: 0.0,
                v_rot: 0.8,
                duration: Duration::from_millis(400),
            })
            .unwrap();
        motion.move_to_goal(GoalOffset { x: 1.0, y: 0.0 }).unwrap();

        let cmds = motion.commands();
        assert_eq!(cmds.len(), 3);
        assert_eq!(motion.head_poses(), vec![HeadPose::pitched(0.2)]);
        assert_eq!(motion.velocity_commands().len(), 1);
        assert!(matches!(cmds[2], MotionCommand::Goal(_)));
    }

    #[test]
    fn faulted_motion_rejects_commands() {
        let motion = SimMotion::faulted("estop engaged");
        let err = motion.move_head(HeadPose::NEUTRAL).unwrap_err();
        assert!(matches!(err, SentinelError::HardwareFault { ref component, .. } if component == "head"));
        assert!(motion.commands().is_empty());
    }
}

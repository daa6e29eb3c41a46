//! `sentinel-types` – shared data model for the Sentinel capture pipeline.
//!
//! Every crate in the workspace speaks in these types: camera sources,
//! immutable [`Frame`]s, detected [`Marker`]s, [`ThreatRegion`]s, motion
//! commands, the persistence contract ([`ArtifactSink`]) and the error
//! taxonomy ([`CaptureError`], [`SequenceError`], [`SentinelError`]).

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ────────────────────────────────────────────────────────────────────────────
// Camera sources
// ────────────────────────────────────────────────────────────────────────────

/// One of the five body cameras the platform exposes.
///
/// The declaration order is the rotation order used by
/// `CameraSourceManager::advance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraSource {
    FrontLeftFisheye,
    FrontRightFisheye,
    LeftFisheye,
    RightFisheye,
    BackFisheye,
}

impl CameraSource {
    /// Every source, in rotation order.
    pub const ALL: [CameraSource; 5] = [
        CameraSource::FrontLeftFisheye,
        CameraSource::FrontRightFisheye,
        CameraSource::LeftFisheye,
        CameraSource::RightFisheye,
        CameraSource::BackFisheye,
    ];

    /// Identifier the camera subsystem uses for this source.
    pub fn id(self) -> &'static str {
        match self {
            CameraSource::FrontLeftFisheye => "frontleft_fisheye_image",
            CameraSource::FrontRightFisheye => "frontright_fisheye_image",
            CameraSource::LeftFisheye => "left_fisheye_image",
            CameraSource::RightFisheye => "right_fisheye_image",
            CameraSource::BackFisheye => "back_fisheye_image",
        }
    }

    /// The source that follows `self` in rotation order, wrapping after the
    /// last one.
    pub fn next(self) -> CameraSource {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for CameraSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for CameraSource {
    type Err = SentinelError;

    /// Accepts either the subsystem identifier (`"back_fisheye_image"`) or
    /// the short form without the `_image` suffix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|src| src.id() == wanted || src.id().trim_end_matches("_image") == wanted)
            .ok_or_else(|| SentinelError::Config(format!("unknown camera source '{s}'")))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Frames
// ────────────────────────────────────────────────────────────────────────────

/// An immutable, decoded RGB image together with its acquisition metadata.
///
/// Frames are never mutated after creation.  Stages that derive a new image
/// (annotation, false-colour rendering) build a fresh frame with
/// [`Frame::derive`], which keeps the source and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pixels: RgbImage,
    source: CameraSource,
    captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(pixels: RgbImage, source: CameraSource, captured_at: DateTime<Utc>) -> Self {
        Self {
            pixels,
            source,
            captured_at,
        }
    }

    /// Build a frame carrying different pixels but the same metadata.
    pub fn derive(&self, pixels: RgbImage) -> Frame {
        Frame {
            pixels,
            source: self.source,
            captured_at: self.captured_at,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Borrow the underlying pixel buffer.
    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    pub fn source(&self) -> CameraSource {
        self.source
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Markers and threat regions
// ────────────────────────────────────────────────────────────────────────────

/// A colour blob detected in a single frame, in frame-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Marker {
    pub x: i32,
    pub y: i32,
    pub radius: i32,
    /// Sequence number of the frame the marker was extracted from.
    pub observed_at_frame: u64,
}

impl Marker {
    pub fn new(x: i32, y: i32, radius: i32, observed_at_frame: u64) -> Self {
        Self {
            x,
            y,
            radius,
            observed_at_frame,
        }
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Euclidean distance between the centres of two markers.
    pub fn distance_to(&self, other: &Marker) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        (dx * dx + dy * dy).sqrt()
    }
}

/// Axis-aligned box in frame-pixel coordinates (inclusive min, max).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl BoundingBox {
    /// Smallest box covering every point, or `None` for an empty input.
    pub fn covering(points: impl IntoIterator<Item = (i32, i32)>) -> Option<BoundingBox> {
        points.into_iter().fold(None, |acc, (x, y)| {
            Some(match acc {
                None => BoundingBox {
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                },
                Some(b) => BoundingBox {
                    min_x: b.min_x.min(x),
                    min_y: b.min_y.min(y),
                    max_x: b.max_x.max(x),
                    max_y: b.max_y.max(y),
                },
            })
        })
    }

    /// Grow the box by `padding` on every side, then clamp it to
    /// `[0, width] × [0, height]`.
    pub fn padded_within(self, padding: i32, width: u32, height: u32) -> BoundingBox {
        let w = i32::try_from(width).unwrap_or(i32::MAX);
        let h = i32::try_from(height).unwrap_or(i32::MAX);
        BoundingBox {
            min_x: (self.min_x - padding).max(0),
            min_y: (self.min_y - padding).max(0),
            max_x: (self.max_x + padding).min(w),
            max_y: (self.max_y + padding).min(h),
        }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// A group of spatially proximate markers flagged as a threat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatRegion {
    pub bounds: BoundingBox,
    /// The triggering marker first, followed by its neighbours in extraction
    /// order.
    pub members: Vec<Marker>,
}

// ────────────────────────────────────────────────────────────────────────────
// Motion commands
// ────────────────────────────────────────────────────────────────────────────

/// Commanded head orientation, in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadPose {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl HeadPose {
    pub const NEUTRAL: HeadPose = HeadPose {
        yaw: 0.0,
        pitch: 0.0,
        roll: 0.0,
    };

    pub fn pitched(pitch: f64) -> Self {
        Self {
            pitch,
            ..Self::NEUTRAL
        }
    }

    pub fn yawed(yaw: f64) -> Self {
        Self {
            yaw,
            ..Self::NEUTRAL
        }
    }
}

/// Body velocity command held for `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityCommand {
    /// Forward velocity (m/s).
    pub v_x: f64,
    /// Lateral velocity (m/s).
    pub v_y: f64,
    /// Yaw rate (rad/s).
    pub v_rot: f64,
    pub duration: Duration,
}

/// Translation target relative to the robot's current body frame (metres).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalOffset {
    pub x: f64,
    pub y: f64,
}

// ────────────────────────────────────────────────────────────────────────────
// Persistence contract
// ────────────────────────────────────────────────────────────────────────────

/// Category of a persisted image; the prefix of its artifact name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Original,
    ThreatDetection,
    ThermalVision,
    ThreatDetected,
}

impl ArtifactKind {
    pub fn prefix(self) -> &'static str {
        match self {
            ArtifactKind::Original => "original",
            ArtifactKind::ThreatDetection => "threat_detection",
            ArtifactKind::ThermalVision => "thermal_vision",
            ArtifactKind::ThreatDetected => "threat_detected",
        }
    }

    /// `{kind}_{YYYYMMDD-HHMMSS}[_{seq:04}].jpg`
    pub fn artifact_name(self, timestamp: DateTime<Utc>, sequence: Option<u64>) -> String {
        let stamp = timestamp.format("%Y%m%d-%H%M%S");
        match sequence {
            Some(seq) => format!("{}_{stamp}_{seq:04}.jpg", self.prefix()),
            None => format!("{}_{stamp}.jpg", self.prefix()),
        }
    }
}

/// Destination for persisted frames (directory, object store, test buffer…).
pub trait ArtifactSink: Send + Sync {
    /// Store `frame` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::Persistence`] if the frame cannot be stored.
    fn persist(&self, name: &str, frame: &Frame) -> Result<(), SentinelError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Frame acquisition failures.  All of them are non-fatal: the caller treats
/// the frame as absent and carries on.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CaptureError {
    #[error("no image returned by {camera}")]
    NoResponse { camera: CameraSource },

    #[error("could not decode image from {camera}: {details}")]
    DecodeFailure {
        camera: CameraSource,
        details: String,
    },

    #[error("camera {camera} did not answer within {after:?}")]
    Timeout {
        camera: CameraSource,
        after: Duration,
    },
}

impl CaptureError {
    pub fn camera(&self) -> CameraSource {
        match self {
            CaptureError::NoResponse { camera }
            | CaptureError::DecodeFailure { camera, .. }
            | CaptureError::Timeout { camera, .. } => *camera,
        }
    }
}

/// Precondition violations on motion sequences.  Raised before any command
/// reaches the platform.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SequenceError {
    #[error("a head scan needs at least 2 frames, got {0}")]
    InvalidFrameCount(usize),

    #[error("turn radius must be finite and non-negative, got {0}")]
    InvalidTurnRadius(f64),
}

/// Error type spanning the whole pipeline.
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum SentinelError {
    #[error("Capture Error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Sequence Error: {0}")]
    Sequence(#[from] SequenceError),

    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Persistence Error for {name}: {details}")]
    Persistence { name: String, details: String },

    #[error("Configuration Error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn camera_rotation_wraps_after_last_source() {
        let mut src = CameraSource::FrontLeftFisheye;
        let mut seen = vec![src];
        for _ in 0..5 {
            src = src.next();
            seen.push(src);
        }
        assert_eq!(&seen[..5], &CameraSource::ALL);
        assert_eq!(seen[5], CameraSource::FrontLeftFisheye);
    }

    #[test]
    fn camera_source_parses_long_and_short_ids() {
        assert_eq!(
            "back_fisheye_image".parse::<CameraSource>().unwrap(),
            CameraSource::BackFisheye
        );
        assert_eq!(
            "frontright_fisheye".parse::<CameraSource>().unwrap(),
            CameraSource::FrontRightFisheye
        );
        assert!(matches!(
            "periscope".parse::<CameraSource>(),
            Err(SentinelError::Config(_))
        ));
    }

    #[test]
    fn artifact_names_follow_convention() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            ArtifactKind::Original.artifact_name(ts, Some(7)),
            "original_20240309-070501_0007.jpg"
        );
        assert_eq!(
            ArtifactKind::ThreatDetected.artifact_name(ts, None),
            "threat_detected_20240309-070501.jpg"
        );
    }

    #[test]
    fn bounding_box_pads_and_clamps() {
        let b = BoundingBox::covering([(10, 30), (50, 5), (25, 60)]).unwrap();
        assert_eq!(
            b,
            BoundingBox {
                min_x: 10,
                min_y: 5,
                max_x: 50,
                max_y: 60
            }
        );
        let p = b.padded_within(20, 60, 70);
        assert_eq!(
            p,
            BoundingBox {
                min_x: 0,
                min_y: 0,
                max_x: 60,
                max_y: 70
            }
        );
        assert!(BoundingBox::covering(std::iter::empty()).is_none());
    }

    #[test]
    fn marker_distance_is_euclidean() {
        let a = Marker::new(0, 0, 6, 0);
        let b = Marker::new(3, 4, 6, 0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn derived_frame_keeps_metadata() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let frame = Frame::new(RgbImage::new(4, 3), CameraSource::LeftFisheye, ts);
        let derived = frame.derive(RgbImage::new(2, 2));
        assert_eq!(derived.source(), CameraSource::LeftFisheye);
        assert_eq!(derived.captured_at(), ts);
        assert_eq!((derived.width(), derived.height()), (2, 2));
        assert_eq!((frame.width(), frame.height()), (4, 3));
    }

    #[test]
    fn capture_error_roundtrip_and_display() {
        let err = CaptureError::NoResponse {
            camera: CameraSource::BackFisheye,
        };
        let json = serde_json::to_string(&err).unwrap();
        let back: CaptureError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);

        let wrapped: SentinelError = err.into();
        assert!(wrapped.to_string().contains("back_fisheye_image"));
    }

    #[test]
    fn sequence_error_display() {
        let err = SentinelError::from(SequenceError::InvalidFrameCount(1));
        assert!(err.to_string().contains("at least 2 frames"));
    }
}

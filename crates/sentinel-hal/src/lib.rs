//! `sentinel-hal` – the robot platform boundary.
//!
//! The camera and motion subsystems of the robot are external collaborators.
//! This crate describes them as traits so the rest of Sentinel never talks to
//! a vendor SDK directly, and ships simulated drivers for headless testing.
//!
//! # Modules
//!
//! - [`camera`] – [`CameraSubsystem`][camera::CameraSubsystem] and
//!   [`FrameAcquirer`][camera::FrameAcquirer], which turns one encoded image
//!   request into a decoded [`Frame`][sentinel_types::Frame] under an
//!   optional timeout.
//! - [`sources`] – [`CameraSourceManager`][sources::CameraSourceManager]:
//!   the currently selected camera and its fixed rotation order.
//! - [`motion`] – [`MotionPlatform`][motion::MotionPlatform]: blocking head
//!   pose, velocity and goal-relative translation commands, and
//!   [`BoundedMotion`][motion::BoundedMotion], which caps how long any one
//!   call may block.
//! - [`clock`] – [`Clock`][clock::Clock]: every settle or segment delay goes
//!   through this trait so timing can be recorded instead of slept in tests.
//! - [`sim`] – [`SimCamera`][sim::SimCamera] and [`SimMotion`][sim::SimMotion]
//!   stub drivers for CI runs without a robot.

pub mod camera;
pub mod clock;
pub mod motion;
pub mod sim;
pub mod sources;

pub use camera::{CameraSubsystem, FrameAcquirer};
pub use clock::{Clock, ManualClock, SystemClock};
pub use motion::{BoundedMotion, MotionCommand, MotionPlatform};
pub use sources::CameraSourceManager;

//! `sentinel-perception` – colorimetric marker detection and scene rendering.
//!
//! Turns decoded camera frames into the data the capture pipeline reasons
//! about.  Everything in here is deterministic and free of I/O except the
//! injected on-detect sink of the threat classifier.
//!
//! # Modules
//!
//! - [`color`] – RGB → HSV conversion and the two-band "red" mask.
//! - [`morphology`] – binary [`Mask`][morphology::Mask] with erosion and
//!   dilation for speckle suppression.
//! - [`contour`] – external contour tracing, polygon area, convex hull and
//!   minimum enclosing circle.
//! - [`markers`] – [`MarkerExtractor`][markers::MarkerExtractor]: frame →
//!   list of [`Marker`][sentinel_types::Marker]s.
//! - [`history`] – [`TemporalHistory`][history::TemporalHistory]: fixed-depth
//!   FIFO window of per-frame marker lists.
//! - [`threat`] – [`ClusterThreatClassifier`][threat::ClusterThreatClassifier]:
//!   proximity clustering over the history window.
//! - [`annotate`] – draws the threat box and label onto a frame copy.
//! - [`thermal`] – [`ThermalRenderer`][thermal::ThermalRenderer]: grayscale →
//!   blur → CLAHE → jet palette false-colour transform.

pub mod annotate;
pub mod color;
pub mod contour;
pub mod history;
pub mod markers;
pub mod morphology;
pub mod thermal;
pub mod threat;

pub use history::TemporalHistory;
pub use markers::{ExtractorConfig, MarkerExtractor};
pub use thermal::{ThermalConfig, ThermalRenderer};
pub use threat::{
    Assessment, Classification, ClassifierConfig, ClusterThreatClassifier, SkipReason,
};

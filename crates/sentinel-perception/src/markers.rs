//! Colour-blob marker extraction.
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use image::{Rgb, RgbImage};
//! use sentinel_perception::MarkerExtractor;
//! use sentinel_types::{CameraSource, Frame};
//!
//! let img = RgbImage::from_pixel(64, 64, Rgb([0, 0, 255]));
//! let frame = Frame::new(img, CameraSource::FrontLeftFisheye, Utc::now());
//! assert!(MarkerExtractor::default().extract(&frame, 0).is_empty());
//! ```

use sentinel_types::{Frame, Marker};
use tracing::debug;

use crate::color::{HsvRange, RED_BANDS, band_mask};
use crate::contour::find_external_contours;

/// Tuning for [`MarkerExtractor`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorConfig {
    /// Hue/saturation/value bands a pixel must fall into.
    pub bands: Vec<HsvRange>,
    pub erode_iterations: usize,
    pub dilate_iterations: usize,
    /// Contours must have strictly more area than this (px²).
    pub min_area: f64,
    /// Enclosing circles must have strictly more radius than this (px).
    pub min_radius: f64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            bands: RED_BANDS.to_vec(),
            erode_iterations: 2,
            dilate_iterations: 2,
            min_area: 50.0,
            min_radius: 5.0,
        }
    }
}

/// Segments a frame by colour and returns one [`Marker`] per surviving blob.
#[derive(Debug, Clone, Default)]
pub struct MarkerExtractor {
    config: ExtractorConfig,
}

impl MarkerExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Markers found in `frame`, in contour-discovery order.  Positions and
    /// radii are truncated towards zero.
    pub fn extract(&self, frame: &Frame, frame_index: u64) -> Vec<Marker> {
        let mask = band_mask(frame.pixels(), &self.config.bands)
            .eroded(self.config.erode_iterations)
            .dilated(self.config.dilate_iterations);

        let contours = find_external_contours(&mask);
        let candidates = contours.len();
        let markers: Vec<Marker> = contours
            .iter()
            .filter(|c| c.area() > self.config.min_area)
            .filter_map(|c| {
                let circle = c.enclosing_circle();
                (circle.radius > self.config.min_radius).then(|| {
                    Marker::new(
                        circle.cx as i32,
                        circle.cy as i32,
                        circle.radius as i32,
                        frame_index,
                    )
                })
            })
            .collect();

        debug!(
            frame = frame_index,
            contours = candidates,
            markers = markers.len(),
            "markers extracted"
        );
        markers
    }
}

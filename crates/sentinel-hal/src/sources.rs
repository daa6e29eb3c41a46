//! [`CameraSourceManager`] – owns the "current camera" selection.

use sentinel_types::CameraSource;
use tracing::info;

/// Holds exactly one current [`CameraSource`] and rotates through
/// [`CameraSource::ALL`] in a fixed cyclic order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraSourceManager {
    current: CameraSource,
}

impl Default for CameraSourceManager {
    fn default() -> Self {
        Self::new(CameraSource::FrontLeftFisheye)
    }
}

impl CameraSourceManager {
    /// Start the rotation at `initial`.
    pub fn new(initial: CameraSource) -> Self {
        Self { current: initial }
    }

    pub fn current(&self) -> CameraSource {
        self.current
    }

    /// Move to the next source, wrapping after the last, and return it.
    pub fn advance(&mut self) -> CameraSource {
        self.current = self.current.next();
        info!(camera = %self.current, "switched camera");
        self.current
    }

    /// Jump straight to `source`.
    pub fn select(&mut self, source: CameraSource) {
        self.current = source;
    }
}

//! Camera subsystem trait and the [`FrameAcquirer`] that decodes its output.

use std::sync::{Arc, Mutex, PoisonError, mpsc};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sentinel_types::{CameraSource, CaptureError, Frame};
use tracing::{debug, warn};

/// The robot's image service.
///
/// Implementations return the raw encoded bytes (JPEG, PNG, …) of a single
/// image from `source`, or `None` when the service produced no data.
pub trait CameraSubsystem: Send + Sync {
    fn request_image(&self, source: CameraSource) -> Option<Vec<u8>>;
}

/// Requests one image from a [`CameraSubsystem`] and decodes it into a
/// [`Frame`].
///
/// When a timeout is configured the request runs on a helper thread and the
/// acquirer waits at most that long for it.  A request that overruns is
/// reported as [`CaptureError::Timeout`] and stays pending; its result is
/// discarded once it arrives.  At most one request is in flight per
/// acquirer (clones share it): while an overrun request is still pending,
/// further captures time out immediately without reaching the camera.
#[derive(Clone)]
pub struct FrameAcquirer {
    camera: Arc<dyn CameraSubsystem>,
    timeout: Option<Duration>,
    pending: Arc<Mutex<Option<Response>>>,
}

type Response = mpsc::Receiver<Option<Vec<u8>>>;

impl FrameAcquirer {
    /// Acquirer that blocks on the camera for as long as it takes.
    pub fn new(camera: Arc<dyn CameraSubsystem>) -> Self {
        Self {
            camera,
            timeout: None,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    /// Bound every request by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Capture and decode a single frame from `source`.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::NoResponse`] when the subsystem returns no data.
    /// - [`CaptureError::DecodeFailure`] when the bytes are not a valid image.
    /// - [`CaptureError::Timeout`] when the configured timeout expires.
    ///
    /// All three are non-fatal; callers skip the frame and continue.
    pub fn capture(&self, source: CameraSource) -> Result<Frame, CaptureError> {
        let response = match self.timeout {
            Some(limit) => self.request_within(source, limit)?,
            None => self.camera.request_image(source),
        };

        let bytes = response
            .filter(|b| !b.is_empty())
            .ok_or(CaptureError::NoResponse { camera: source })?;

        let frame = decode_frame(&bytes, source, Utc::now())?;
        debug!(
            camera = %source,
            width = frame.width(),
            height = frame.height(),
            "frame acquired"
        );
        Ok(frame)
    }

    /// `true` while an overrun request has not answered yet.
    pub fn request_pending(&self) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        still_pending(&mut pending)
    }

    fn request_within(
        &self,
        source: CameraSource,
        limit: Duration,
    ) -> Result<Option<Vec<u8>>, CaptureError> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if still_pending(&mut pending) {
            debug!(camera = %source, "previous request still outstanding");
            return Err(CaptureError::Timeout {
                camera: source,
                after: limit,
            });
        }

        let camera = Arc::clone(&self.camera);
        let (tx, rx) = mpsc::channel();

        let spawned = thread::Builder::new()
            .name(format!("capture-{}", source.id()))
            .spawn(move || {
                // The receiver is gone once the acquirer is dropped.
                let _ = tx.send(camera.request_image(source));
            });
        if let Err(e) = spawned {
            warn!(camera = %source, error = %e, "could not spawn capture thread");
            return Ok(None);
        }

        match rx.recv_timeout(limit) {
            Ok(response) => Ok(response),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                *pending = Some(rx);
                Err(CaptureError::Timeout {
                    camera: source,
                    after: limit,
                })
            }
            // The request thread panicked before answering.
            Err(mpsc::RecvTimeoutError::Disconnected) => Ok(None),
        }
    }
}

/// Clear `pending` if its request has finished and report whether one is
/// still outstanding.  A late answer belongs to an earlier waypoint and is
/// dropped.
fn still_pending(pending: &mut Option<Response>) -> bool {
    let outstanding = pending
        .as_ref()
        .is_some_and(|rx| matches!(rx.try_recv(), Err(mpsc::TryRecvError::Empty)));
    if !outstanding {
        *pending = None;
    }
    outstanding
}

/// Decode encoded image bytes into an RGB [`Frame`].
///
/// # Errors
///
/// Returns [`CaptureError::DecodeFailure`] when the format is unrecognised,
/// the payload is corrupt, or the decoded image has no pixels.
pub fn decode_frame(
    bytes: &[u8],
    source: CameraSource,
    captured_at: DateTime<Utc>,
) -> Result<Frame, CaptureError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| CaptureError::DecodeFailure {
        camera: source,
        details: e.to_string(),
    })?;
    let rgb = decoded.to_rgb8();
    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(CaptureError::DecodeFailure {
            camera: source,
            details: "decoded image is empty".to_string(),
        });
    }
    Ok(Frame::new(rgb, source, captured_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FixedCamera {
        payload: Option<Vec<u8>>,
        latency: Duration,
    }

    impl CameraSubsystem for FixedCamera {
        fn request_image(&self, _source: CameraSource) -> Option<Vec<u8>> {
            if !self.latency.is_zero() {
                thread::sleep(self.latency);
            }
            self.payload.clone()
        }
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([10, 200, 30]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn acquirer(payload: Option<Vec<u8>>, latency: Duration) -> FrameAcquirer {
        FrameAcquirer::new(Arc::new(FixedCamera { payload, latency }))
    }

    #[test]
    fn capture_decodes_valid_image() {
        let acq = acquirer(Some(png_bytes(8, 6)), Duration::ZERO);
        let frame = acq.capture(CameraSource::LeftFisheye).unwrap();
        assert_eq!((frame.width(), frame.height()), (8, 6));
        assert_eq!(frame.source(), CameraSource::LeftFisheye);
        assert_eq!(frame.pixels().get_pixel(3, 3), &Rgb([10, 200, 30]));
    }

    #[test]
    fn missing_payload_is_no_response() {
        let acq = acquirer(None, Duration::ZERO);
        assert_eq!(
            acq.capture(CameraSource::BackFisheye),
            Err(CaptureError::NoResponse {
                camera: CameraSource::BackFisheye
            })
        );
    }

    #[test]
    fn empty_payload_is_no_response() {
        let acq = acquirer(Some(Vec::new()), Duration::ZERO);
        assert!(matches!(
            acq.capture(CameraSource::BackFisheye),
            Err(CaptureError::NoResponse { .. })
        ));
    }

    #[test]
    fn garbage_payload_is_decode_failure() {
        let acq = acquirer(Some(vec![0xde, 0xad, 0xbe, 0xef]), Duration::ZERO);
        assert!(matches!(
            acq.capture(CameraSource::FrontLeftFisheye),
            Err(CaptureError::DecodeFailure { .. })
        ));
    }

    #[test]
    fn slow_camera_times_out() {
        let acq = acquirer(Some(png_bytes(2, 2)), Duration::from_millis(300))
            .with_timeout(Duration::from_millis(20));
        assert_eq!(
            acq.capture(CameraSource::RightFisheye),
            Err(CaptureError::Timeout {
                camera: CameraSource::RightFisheye,
                after: Duration::from_millis(20),
            })
        );
    }

    /// Blocks every request while `held` is set.
    struct HeldCamera {
        held: AtomicBool,
        requests: AtomicUsize,
    }

    impl HeldCamera {
        fn held() -> Arc<Self> {
            Arc::new(Self {
                held: AtomicBool::new(true),
                requests: AtomicUsize::new(0),
            })
        }
    }

    impl CameraSubsystem for HeldCamera {
        fn request_image(&self, _source: CameraSource) -> Option<Vec<u8>> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            while self.held.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
            Some(png_bytes(2, 2))
        }
    }

    #[test]
    fn hung_camera_keeps_one_request_in_flight() {
        let camera = HeldCamera::held();
        let acq = FrameAcquirer::new(camera.clone()).with_timeout(Duration::from_millis(5));

        for _ in 0..20 {
            assert!(matches!(
                acq.capture(CameraSource::FrontLeftFisheye),
                Err(CaptureError::Timeout { .. })
            ));
        }
        assert!(acq.request_pending());
        // Give the helper thread time to reach the camera before counting.
        thread::sleep(Duration::from_millis(20));
        assert_eq!(camera.requests.load(Ordering::SeqCst), 1);
        camera.held.store(false, Ordering::SeqCst);
    }

    #[test]
    fn clones_share_the_pending_request() {
        let camera = HeldCamera::held();
        let acq = FrameAcquirer::new(camera.clone()).with_timeout(Duration::from_millis(5));
        let other = acq.clone();

        assert!(acq.capture(CameraSource::LeftFisheye).is_err());
        assert!(other.capture(CameraSource::LeftFisheye).is_err());
        thread::sleep(Duration::from_millis(20));
        assert_eq!(camera.requests.load(Ordering::SeqCst), 1);
        camera.held.store(false, Ordering::SeqCst);
    }

    #[test]
    fn camera_is_asked_again_once_the_late_answer_arrives() {
        let camera = HeldCamera::held();
        let acq = FrameAcquirer::new(camera.clone()).with_timeout(Duration::from_secs(2));
        let quick = FrameAcquirer {
            timeout: Some(Duration::from_millis(5)),
            ..acq.clone()
        };

        assert!(quick.capture(CameraSource::BackFisheye).is_err());
        camera.held.store(false, Ordering::SeqCst);
        for _ in 0..200 {
            if !acq.request_pending() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!acq.request_pending());

        let frame = acq.capture(CameraSource::BackFisheye).unwrap();
        assert_eq!((frame.width(), frame.height()), (2, 2));
        assert_eq!(camera.requests.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn fast_camera_within_timeout_succeeds() {
        let acq = acquirer(Some(png_bytes(2, 2)), Duration::ZERO)
            .with_timeout(Duration::from_secs(2));
        assert!(acq.capture(CameraSource::RightFisheye).is_ok());
    }
}

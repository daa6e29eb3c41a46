//! [`MotionPlatform`] – blocking motion commands accepted by the robot.
//!
//! Every call is assumed to block until the commanded state is reached (head
//! pose, translation goal) or the commanded duration has been issued
//! (velocity).  Drivers implement this trait; the sequencing logic lives in
//! `sentinel-runtime`.
//!
//! [`BoundedMotion`] wraps any platform so that no single call can block the
//! caller for longer than a configured limit.

use std::sync::{Arc, Mutex, PoisonError, mpsc};
use std::thread;
use std::time::Duration;

use sentinel_types::{GoalOffset, HeadPose, SentinelError, VelocityCommand};
use tracing::warn;

/// A robot body that can orient its head and move its base.
pub trait MotionPlatform: Send + Sync {
    /// Move the head to `pose`.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::HardwareFault`] if the platform rejects the
    /// command.
    fn move_head(&self, pose: HeadPose) -> Result<(), SentinelError>;

    /// Issue a body velocity command for `command.duration`.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::HardwareFault`] if the platform rejects the
    /// command.
    fn drive(&self, command: VelocityCommand) -> Result<(), SentinelError>;

    /// Walk to a goal expressed relative to the current body frame.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::HardwareFault`] if the platform rejects the
    /// command.
    fn move_to_goal(&self, goal: GoalOffset) -> Result<(), SentinelError>;
}

/// One command as received by a [`MotionPlatform`]; used by recording drivers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionCommand {
    Head(HeadPose),
    Velocity(VelocityCommand),
    Goal(GoalOffset),
}

// ────────────────────────────────────────────────────────────────────────────
// Bounded calls
// ────────────────────────────────────────────────────────────────────────────

type Ack = mpsc::Receiver<Result<(), SentinelError>>;

/// A [`MotionPlatform`] whose calls each return within a time limit.
///
/// The wrapped call runs on a helper thread.  If the platform has not
/// answered after `limit` (plus the command's own duration for
/// [`drive`](MotionPlatform::drive)) the call fails with
/// [`SentinelError::HardwareFault`].  The unanswered command stays pending
/// and every further call fails immediately, without reaching the platform,
/// until it answers.
pub struct BoundedMotion {
    inner: Arc<dyn MotionPlatform>,
    limit: Duration,
    pending: Mutex<Option<Ack>>,
}

impl BoundedMotion {
    pub fn new(inner: Arc<dyn MotionPlatform>, limit: Duration) -> Self {
        Self {
            inner,
            limit,
            pending: Mutex::new(None),
        }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// `true` while an overrun command has not answered yet.
    pub fn command_pending(&self) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        still_pending(&mut pending)
    }

    fn bounded<F>(&self, component: &str, allowance: Duration, call: F) -> Result<(), SentinelError>
    where
        F: FnOnce(&dyn MotionPlatform) -> Result<(), SentinelError> + Send + 'static,
    {
        let fault = |details: String| SentinelError::HardwareFault {
            component: component.to_string(),
            details,
        };

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if still_pending(&mut pending) {
            return Err(fault("previous command still unacknowledged".to_string()));
        }

        let inner = Arc::clone(&self.inner);
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name(format!("motion-{component}"))
            .spawn(move || {
                // The receiver is gone once the wrapper is dropped.
                let _ = tx.send(call(inner.as_ref()));
            })
            .map_err(|e| fault(format!("could not spawn command thread: {e}")))?;

        match rx.recv_timeout(allowance) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(component, after = ?allowance, "motion command unacknowledged");
                *pending = Some(rx);
                Err(fault(format!("no acknowledgement within {allowance:?}")))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(fault("command thread exited without answering".to_string()))
            }
        }
    }
}

impl MotionPlatform for BoundedMotion {
    fn move_head(&self, pose: HeadPose) -> Result<(), SentinelError> {
        self.bounded("head", self.limit, move |p| p.move_head(pose))
    }

    fn drive(&self, command: VelocityCommand) -> Result<(), SentinelError> {
        let allowance = self.limit.saturating_add(command.duration);
        self.bounded("drive_base", allowance, move |p| p.drive(command))
    }

    fn move_to_goal(&self, goal: GoalOffset) -> Result<(), SentinelError> {
        self.bounded("drive_base", self.limit, move |p| p.move_to_goal(goal))
    }
}

/// Clear `pending` if its command has answered and report whether one is
/// still outstanding.
fn still_pending(pending: &mut Option<Ack>) -> bool {
    let outstanding = pending
        .as_ref()
        .is_some_and(|rx| matches!(rx.try_recv(), Err(mpsc::TryRecvError::Empty)));
    if !outstanding {
        *pending = None;
    }
    outstanding
}

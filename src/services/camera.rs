use std::time::Duration;

use crate::error::AppError;

/// Camera acquisition is an external capability: something that can be
/// started, stopped, and asked for one encoded frame. The lifecycle never
/// touches device internals.
pub trait CameraPort {
    /// Acquire the device. May fail transiently (busy, permission prompt).
    fn start(&mut self) -> Result<(), AppError>;

    /// Release the device. Idempotent.
    fn stop(&mut self);

    fn is_active(&self) -> bool;

    /// Produce one encoded frame. Fails with `CaptureUnavailable` when the
    /// device is not active and `EmptyFrame` when it yields no pixels.
    fn capture_frame(&mut self) -> Result<Vec<u8>, AppError>;
}

/// Bounded-retry camera start with exponential backoff. Device acquisition
/// is flaky on shared hardware; a busy device usually frees up within a
/// few hundred milliseconds.
pub async fn start_with_retry(
    camera: &mut impl CameraPort,
    attempts: u32,
    base_delay: Duration,
) -> Result<(), AppError> {
    let mut delay = base_delay;
    let mut last_err = AppError::CaptureUnavailable;
    for attempt in 1..=attempts.max(1) {
        match camera.start() {
            Ok(()) => return Ok(()),
            Err(e) => {
                log::warn!("camera start attempt {}/{} failed: {}", attempt, attempts, e);
                last_err = e;
            }
        }
        if attempt < attempts {
            tokio::time::sleep(delay).await;
            delay *= 2;
        }
    }
    Err(last_err)
}

/// Camera stand-in for the demo binary and tests: serves a fixed encoded
/// frame while active.
pub struct SimulatedCamera {
    frame: Vec<u8>,
    active: bool,
    /// Number of `start` calls that should fail before one succeeds.
    failures_remaining: u32,
}

impl SimulatedCamera {
    pub fn new(frame: Vec<u8>) -> Self {
        Self {
            frame,
            active: false,
            failures_remaining: 0,
        }
    }

    pub fn failing_first(frame: Vec<u8>, failures: u32) -> Self {
        Self {
            frame,
            active: false,
            failures_remaining: failures,
        }
    }
}

impl CameraPort for SimulatedCamera {
    fn start(&mut self) -> Result<(), AppError> {
        if self.failures_remaining > 0 {
            self.failures_remaining -= 1;
            return Err(AppError::CaptureUnavailable);
        }
        self.active = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn capture_frame(&mut self) -> Result<Vec<u8>, AppError> {
        if !self.active {
            return Err(AppError::CaptureUnavailable);
        }
        if self.frame.is_empty() {
            return Err(AppError::EmptyFrame);
        }
        Ok(self.frame.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn retry_recovers_from_transient_start_failures() {
        let mut camera = SimulatedCamera::failing_first(vec![1], 2);
        start_with_retry(&mut camera, 3, Duration::from_millis(1))
            .await
            .unwrap();
        assert!(camera.is_active());
    }

    #[tokio::test]
    async fn retry_gives_up_after_bounded_attempts() {
        let mut camera = SimulatedCamera::failing_first(vec![1], 5);
        let err = start_with_retry(&mut camera, 3, Duration::from_millis(1)).await;
        assert!(matches!(err, Err(AppError::CaptureUnavailable)));
        assert!(!camera.is_active());
    }

    #[test]
    fn capture_without_start_is_unavailable() {
        let mut camera = SimulatedCamera::new(vec![1, 2, 3]);
        assert!(matches!(
            camera.capture_frame(),
            Err(AppError::CaptureUnavailable)
        ));
        camera.start().unwrap();
        assert_eq!(camera.capture_frame().unwrap(), vec![1, 2, 3]);
        camera.stop();
        assert!(matches!(
            camera.capture_frame(),
            Err(AppError::CaptureUnavailable)
        ));
    }
}

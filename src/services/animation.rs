use std::time::Duration;

use crate::models::classify_types::ClassificationResult;

/// The drop animation is an externally owned, timed visual effect. The
/// lifecycle only awaits its completion signal; timing and rendering live
/// behind this trait. Implementations must report completion exactly once
/// per call.
pub trait AnimationPort {
    fn play_drop(
        &mut self,
        result: &ClassificationResult,
    ) -> impl std::future::Future<Output = ()> + Send;
}

/// Demo animation: logs the drop and sleeps for the configured duration
/// (the original effect runs ~1.2 s before its animationend fires).
pub struct ConsoleAnimation {
    pub duration: Duration,
}

impl Default for ConsoleAnimation {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(1200),
        }
    }
}

impl AnimationPort for ConsoleAnimation {
    async fn play_drop(&mut self, result: &ClassificationResult) {
        log::info!(
            "dropping '{}' into the {} bin...",
            result.label,
            result.bin.name
        );
        tokio::time::sleep(self.duration).await;
    }
}

/// Completes immediately. Used in tests and headless runs.
#[derive(Default)]
pub struct InstantAnimation {
    pub plays: u32,
}

impl AnimationPort for InstantAnimation {
    async fn play_drop(&mut self, _result: &ClassificationResult) {
        self.plays += 1;
    }
}

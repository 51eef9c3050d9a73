pub mod inference;
pub mod model_manager;

use std::future::Future;

use crate::error::AppError;
use crate::models::classify_types::ClassificationResult;

/// Readiness of the classification capability. Transitions are one-way:
/// `Loading` resolves to exactly one of `Ready` or `Failed`, and both are
/// terminal for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Loading,
    Ready,
    Failed(String),
}

/// The classifier is an opaque asynchronous capability: bytes in, one
/// immutable [`ClassificationResult`] out. It may be slow and may fail;
/// it must not be invoked before `readiness()` reports `Ready`. The
/// lifecycle, not the classifier, prevents concurrent calls for the
/// same session.
pub trait Classifier {
    fn readiness(&self) -> Readiness;

    fn is_ready(&self) -> bool {
        self.readiness() == Readiness::Ready
    }

    fn classify(
        &self,
        bytes: &[u8],
    ) -> impl Future<Output = Result<ClassificationResult, AppError>> + Send;
}

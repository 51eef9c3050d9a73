use serde::Serialize;

/// Every fallible operation in the crate funnels into this type.
///
/// Capture, upload, and classify failures are recovered at the lifecycle
/// boundary and surfaced to the presentation layer as messages; none of
/// them are fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("no active capture device")]
    CaptureUnavailable,

    #[error("captured frame is empty")]
    EmptyFrame,

    #[error("no file selected")]
    NoFileSelected,

    #[error("no image captured or uploaded")]
    NoImage,

    #[error("classifier is not ready: {0}")]
    ClassifierNotReady(String),

    #[error("classification timed out")]
    ClassifierTimeout,

    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// A classify request arrived for an image that is already being
    /// classified (or already classified). Rejected, never queued.
    #[error("classification already in progress for this image")]
    DuplicateClassifyRejected,

    #[error("history store error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

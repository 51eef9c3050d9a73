use std::sync::Arc;

use image::GenericImageView;
use uuid::Uuid;

use crate::error::AppError;

/// Opaque reference to the currently active image bytes plus a display
/// locator. Valid until the owning [`ImageSource`] releases it.
#[derive(Debug, Clone)]
pub struct ImageHandle {
    pub locator: String,
    pub width: u32,
    pub height: u32,
    bytes: Arc<Vec<u8>>,
}

impl ImageHandle {
    pub fn bytes(&self) -> Arc<Vec<u8>> {
        Arc::clone(&self.bytes)
    }
}

/// Supplies raw image bytes from a live capture or a file upload.
///
/// At most one handle is live per session: every `set_from_*` call
/// releases the previous handle exactly once before installing the new
/// one, and `clear` is an idempotent no-op when nothing is held.
#[derive(Default)]
pub struct ImageSource {
    current: Option<ImageHandle>,
    released: u64,
}

impl ImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install bytes coming from the camera. An empty frame buffer (the
    /// camera produced nothing, e.g. zero-dimension video) fails with
    /// `EmptyFrame`; bytes that cannot be decoded fail with `Decode`.
    pub fn set_from_capture(&mut self, bytes: Vec<u8>) -> Result<&ImageHandle, AppError> {
        if bytes.is_empty() {
            return Err(AppError::EmptyFrame);
        }
        let (width, height) = decode_dimensions(&bytes)?;
        if width == 0 || height == 0 {
            return Err(AppError::EmptyFrame);
        }
        Ok(self.install(bytes, width, height, "capture"))
    }

    /// Install bytes coming from a file upload. An empty input fails with
    /// `NoFileSelected`.
    pub fn set_from_upload(&mut self, bytes: Vec<u8>) -> Result<&ImageHandle, AppError> {
        if bytes.is_empty() {
            return Err(AppError::NoFileSelected);
        }
        let (width, height) = decode_dimensions(&bytes)?;
        Ok(self.install(bytes, width, height, "upload"))
    }

    /// Release the current handle. Calling with no active handle is a
    /// no-op, not an error.
    pub fn clear(&mut self) {
        if let Some(prev) = self.current.take() {
            self.released += 1;
            drop(prev);
        }
    }

    pub fn current(&self) -> Option<&ImageHandle> {
        self.current.as_ref()
    }

    /// How many handles have been released over the session lifetime.
    pub fn released_count(&self) -> u64 {
        self.released
    }

    fn install(&mut self, bytes: Vec<u8>, width: u32, height: u32, kind: &str) -> &ImageHandle {
        self.clear();
        let handle = ImageHandle {
            locator: format!("{}-{}", kind, Uuid::new_v4()),
            width,
            height,
            bytes: Arc::new(bytes),
        };
        log::debug!(
            "image installed: {} ({}x{}, {} bytes)",
            handle.locator,
            width,
            height,
            handle.bytes.len()
        );
        self.current.insert(handle)
    }
}

fn decode_dimensions(bytes: &[u8]) -> Result<(u32, u32), AppError> {
    let img = image::load_from_memory(bytes)?;
    Ok(img.dimensions())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = image::RgbImage::new(w, h);
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn capture_of_empty_buffer_is_empty_frame() {
        let mut source = ImageSource::new();
        assert!(matches!(
            source.set_from_capture(Vec::new()),
            Err(AppError::EmptyFrame)
        ));
        assert!(source.current().is_none());
    }

    #[test]
    fn upload_of_empty_buffer_is_no_file_selected() {
        let mut source = ImageSource::new();
        assert!(matches!(
            source.set_from_upload(Vec::new()),
            Err(AppError::NoFileSelected)
        ));
    }

    #[test]
    fn undecodable_bytes_fail_with_decode() {
        let mut source = ImageSource::new();
        assert!(matches!(
            source.set_from_upload(vec![0x13, 0x37, 0x00]),
            Err(AppError::Decode(_))
        ));
        assert!(source.current().is_none());
    }

    #[test]
    fn installing_a_new_image_releases_the_prior_handle_once() {
        let mut source = ImageSource::new();
        source.set_from_capture(png_bytes(4, 4)).unwrap();
        let first = source.current().unwrap().locator.clone();
        assert_eq!(source.released_count(), 0);

        source.set_from_upload(png_bytes(2, 2)).unwrap();
        assert_eq!(source.released_count(), 1);
        assert_ne!(source.current().unwrap().locator, first);
    }

    #[test]
    fn clear_is_idempotent() {
        let mut source = ImageSource::new();
        source.set_from_capture(png_bytes(4, 4)).unwrap();
        source.clear();
        assert_eq!(source.released_count(), 1);
        source.clear();
        source.clear();
        assert_eq!(source.released_count(), 1);
        assert!(source.current().is_none());
    }

    #[test]
    fn failed_install_keeps_the_prior_handle() {
        let mut source = ImageSource::new();
        source.set_from_capture(png_bytes(4, 4)).unwrap();
        // Decode failure happens before install, so the prior handle stays.
        assert!(source.set_from_upload(vec![1, 2, 3]).is_err());
        assert!(source.current().is_some());
        assert_eq!(source.released_count(), 0);
    }
}

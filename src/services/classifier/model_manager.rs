use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::AppError;
use crate::models::classify_types::{ClassificationResult, ModelStatus};
use crate::services::classifier::inference::{self, LabelEntry};
use crate::services::classifier::{Classifier, Readiness};

const LABEL_TABLE_FILE: &str = "waste_labels.json";

/// Owns the model's label table and its readiness state.
///
/// Loading is asynchronous and reported through a human-readable progress
/// callback; consumers only care about the terminal transition to `Ready`
/// or `Failed`. Both outcomes are final for the session; a failed model
/// is not retried.
#[derive(Clone)]
pub struct ModelManager {
    model_dir: PathBuf,
    table: Arc<Mutex<Option<Vec<LabelEntry>>>>,
    state: Arc<Mutex<Readiness>>,
    /// Simulated inference latency (the original demo waits ~700 ms).
    latency: Duration,
}

impl ModelManager {
    pub fn new(model_dir: PathBuf) -> Self {
        Self {
            model_dir,
            table: Arc::new(Mutex::new(None)),
            state: Arc::new(Mutex::new(Readiness::Loading)),
            latency: Duration::from_millis(700),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Load the label table, preferring `waste_labels.json` in the model
    /// directory over the built-in table. Resolves readiness exactly once;
    /// repeat calls after the terminal transition are no-ops.
    pub async fn load(&self, progress: impl Fn(&str)) -> Result<(), AppError> {
        match &*self.state.lock().unwrap() {
            Readiness::Ready => return Ok(()),
            Readiness::Failed(msg) => {
                return Err(AppError::ClassifierNotReady(msg.clone()));
            }
            Readiness::Loading => {}
        }

        progress("Loading AI model...");
        match self.read_table().await {
            Ok(table) => {
                log::info!("model table loaded: {} labels", table.len());
                *self.table.lock().unwrap() = Some(table);
                *self.state.lock().unwrap() = Readiness::Ready;
                progress("Ready");
                Ok(())
            }
            Err(e) => {
                log::error!("model load failed: {}", e);
                *self.state.lock().unwrap() = Readiness::Failed(e.to_string());
                progress("Model failed to load");
                Err(e)
            }
        }
    }

    pub fn status(&self) -> ModelStatus {
        let state = self.state.lock().unwrap().clone();
        ModelStatus {
            loading: state == Readiness::Loading,
            ready: state == Readiness::Ready,
            error: match state {
                Readiness::Failed(msg) => Some(msg),
                _ => None,
            },
        }
    }

    async fn read_table(&self) -> Result<Vec<LabelEntry>, AppError> {
        let path = self.model_dir.join(LABEL_TABLE_FILE);
        if !path.exists() {
            return Ok(inference::builtin_label_table());
        }
        let content = tokio::fs::read_to_string(&path).await?;
        let table: Vec<LabelEntry> = serde_json::from_str(&content)
            .map_err(|e| AppError::Other(format!("invalid label table {}: {}", path.display(), e)))?;
        if table.is_empty() {
            return Err(AppError::from("label table has no entries"));
        }
        Ok(table)
    }
}

impl Classifier for ModelManager {
    fn readiness(&self) -> Readiness {
        self.state.lock().unwrap().clone()
    }

    async fn classify(&self, bytes: &[u8]) -> Result<ClassificationResult, AppError> {
        let table = match self.readiness() {
            Readiness::Ready => self
                .table
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| AppError::ClassifierNotReady("labels not loaded".into()))?,
            Readiness::Loading => {
                return Err(AppError::ClassifierNotReady("model is still loading".into()))
            }
            Readiness::Failed(msg) => return Err(AppError::ClassifierNotReady(msg)),
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        inference::classify_bytes(&table, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::new(4, 4);
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn manager_in(dir: &std::path::Path) -> ModelManager {
        ModelManager::new(dir.to_path_buf()).with_latency(Duration::ZERO)
    }

    #[tokio::test]
    async fn classify_before_load_is_not_ready() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        assert_eq!(manager.readiness(), Readiness::Loading);
        let err = manager.classify(&png_bytes()).await;
        assert!(matches!(err, Err(AppError::ClassifierNotReady(_))));
    }

    #[tokio::test]
    async fn load_reports_progress_and_becomes_ready() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());

        let seen = std::sync::Mutex::new(Vec::new());
        manager
            .load(|status| seen.lock().unwrap().push(status.to_string()))
            .await
            .unwrap();

        assert!(manager.is_ready());
        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.first().map(String::as_str), Some("Loading AI model..."));
        assert_eq!(seen.last().map(String::as_str), Some("Ready"));

        manager.classify(&png_bytes()).await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_label_table_fails_terminally() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LABEL_TABLE_FILE), "{{nope").unwrap();
        let manager = manager_in(dir.path());

        assert!(manager.load(|_| {}).await.is_err());
        assert!(matches!(manager.readiness(), Readiness::Failed(_)));

        // Failed is terminal: a second load does not resurrect the model.
        assert!(manager.load(|_| {}).await.is_err());
        let err = manager.classify(&png_bytes()).await;
        assert!(matches!(err, Err(AppError::ClassifierNotReady(_))));
    }

    #[tokio::test]
    async fn label_table_file_overrides_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let table = vec![LabelEntry {
            label: "Tin can".to_string(),
            category: crate::models::classify_types::Category::Metal,
            bin: crate::models::classify_types::BinInfo {
                name: "Metal".to_string(),
                advice: "Rinse and recycle".to_string(),
                color_hex: "#9ca3af".to_string(),
            },
            base_confidence: 0.8,
        }];
        std::fs::write(
            dir.path().join(LABEL_TABLE_FILE),
            serde_json::to_string(&table).unwrap(),
        )
        .unwrap();

        let manager = manager_in(dir.path());
        manager.load(|_| {}).await.unwrap();
        let result = manager.classify(&png_bytes()).await.unwrap();
        assert_eq!(result.label, "Tin can");
    }
}

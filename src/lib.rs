pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::AppConfig;
pub use error::AppError;
pub use models::classify_types::{BinInfo, Category, ClassificationResult, ModelStatus};
pub use models::history_types::{HistoryRecord, Statistics};
pub use services::classifier::model_manager::ModelManager;
pub use services::classifier::{Classifier, Readiness};
pub use services::history::HistoryStore;
pub use services::lifecycle::{
    ClassificationLifecycle, EventPayload, EventSink, LifecycleEvent, LifecycleState, Session,
};

use std::io::Cursor;
use std::time::Duration;

use services::animation::ConsoleAnimation;
use services::camera::{self, CameraPort, SimulatedCamera};
use services::lifecycle::LogSink;

/// Wire everything up and run one scripted demo session: load the model,
/// start the (simulated) camera, capture, classify, animate, settle, and
/// print the resulting history and statistics.
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    if !config.data_dir.exists() {
        std::fs::create_dir_all(&config.data_dir)?;
    }

    let history = HistoryStore::open(config.history_db_path())?;
    let classifier =
        ModelManager::new(config.data_dir.clone()).with_latency(config.model_latency);

    classifier
        .load(|status| log::info!("model: {}", status))
        .await?;

    let mut session = Session::new(classifier, history, LogSink)
        .with_classify_timeout(config.classify_timeout);

    let mut camera = SimulatedCamera::new(demo_frame()?);
    camera::start_with_retry(&mut camera, 3, Duration::from_millis(100)).await?;

    session.capture(&mut camera)?;
    session.classify().await?;
    let mut animation = ConsoleAnimation::default();
    if let Some(record) = session.present(&mut animation).await? {
        log::info!(
            "settled: {} -> {} ({:.1}% confident)",
            record.label,
            record.bin.name,
            record.confidence * 100.0
        );
    }
    camera.stop();

    let stats = session.history().statistics()?;
    log::info!(
        "history: total={} recyclable={} organic={} hazardous={} ({}% recyclable)",
        stats.total,
        stats.recyclable,
        stats.organic,
        stats.hazardous,
        stats.recyclable_percent
    );
    for record in session.history().list(Some(5))? {
        log::info!(
            "  {} -> {} [{}]",
            record.label,
            record.bin.name,
            record.category.as_str()
        );
    }

    session.clear();
    Ok(())
}

/// A small gradient frame for the simulated camera.
fn demo_frame() -> Result<Vec<u8>, AppError> {
    let img = image::RgbImage::from_fn(64, 64, |x, y| {
        image::Rgb([(x * 4) as u8, (y * 4) as u8, 128])
    });
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img).write_to(&mut out, image::ImageFormat::Png)?;
    Ok(out.into_inner())
}

use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration, environment-overridable:
///
///   ECO_SORTER_DATA_DIR           where the history db and model table live
///   ECO_SORTER_CLASSIFY_TIMEOUT_MS
///   ECO_SORTER_MODEL_LATENCY_MS   simulated inference latency
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub classify_timeout: Duration,
    pub model_latency: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".eco-sorter"),
            classify_timeout: Duration::from_secs(5),
            model_latency: Duration::from_millis(700),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("ECO_SORTER_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(ms) = env_millis("ECO_SORTER_CLASSIFY_TIMEOUT_MS") {
            config.classify_timeout = ms;
        }
        if let Some(ms) = env_millis("ECO_SORTER_MODEL_LATENCY_MS") {
            config.model_latency = ms;
        }
        config
    }

    pub fn history_db_path(&self) -> PathBuf {
        self.data_dir.join("history.db")
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    match std::env::var(key) {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(ms) => Some(Duration::from_millis(ms)),
            Err(_) => {
                log::warn!("ignoring non-numeric {}={}", key, raw);
                None
            }
        },
        Err(_) => None,
    }
}

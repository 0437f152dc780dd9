//! Offline model packs.
//!
//! Downloads are simulated: a ticker advances progress by 20% every 500 ms
//! and may fail partway through. Failures get less likely with each retry.
//! Only the set of finished downloads is persisted.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use parking_lot::Mutex;
use shared::catalog::{self, LlmModel};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const DOWNLOADED_FILE: &str = "downloaded-models.json";

pub const TICK_INTERVAL: Duration = Duration::from_millis(500);
pub const PROGRESS_STEP: u8 = 20;
/// Chance of failure on the first attempt, divided by the attempt number after
pub const BASE_FAILURE_CHANCE: f64 = 0.3;
/// How long the "canceling" state stays visible
pub const CANCEL_FEEDBACK: Duration = Duration::from_secs(1);
/// Status key shown for failed downloads
pub const FAILED_STATUS: &str = "modelStatusFailed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelStatus {
    NotDownloaded,
    Downloading,
    Canceling,
    Downloaded,
    Error,
}

impl ModelStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ModelStatus::NotDownloaded => "not downloaded",
            ModelStatus::Downloading => "downloading",
            ModelStatus::Canceling => "canceling",
            ModelStatus::Downloaded => "offline",
            ModelStatus::Error => "failed",
        }
    }
}

/// Returns a value in `[0, 1)`; compared against the failure chance each tick
pub type FailureRoll = Arc<dyn Fn() -> f64 + Send + Sync>;

#[derive(Default)]
struct Inner {
    downloaded: BTreeSet<String>,
    downloading: HashMap<String, u8>,
    canceling: HashSet<String>,
    errors: HashMap<String, String>,
    attempts: HashMap<String, u32>,
    tasks: HashMap<String, JoinHandle<()>>,
}

#[derive(Clone)]
pub struct ModelManager {
    inner: Arc<Mutex<Inner>>,
    path: PathBuf,
    roll: FailureRoll,
}

impl ModelManager {
    pub fn load(dir: &Path) -> Self {
        Self::with_roll(dir, Arc::new(rand::random::<f64>))
    }

    pub fn with_roll(dir: &Path, roll: FailureRoll) -> Self {
        let path = dir.join(DOWNLOADED_FILE);
        let downloaded = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str::<BTreeSet<String>>(&content).unwrap_or_else(|e| {
                tracing::error!("Failed to parse downloaded models: {}", e);
                BTreeSet::new()
            }),
            Err(_) => BTreeSet::new(),
        };
        Self {
            inner: Arc::new(Mutex::new(Inner {
                downloaded,
                ..Default::default()
            })),
            path,
            roll,
        }
    }

    /// Start a download. Already downloaded or in-flight models are left alone.
    ///
    /// Must be called from within a tokio runtime.
    pub fn download(&self, model_id: &str) -> Result<()> {
        let model = catalog::find_model(model_id).ok_or_else(|| anyhow!("Unknown model: {}", model_id))?;
        if !model.is_downloadable {
            return Err(anyhow!("{} is hosted only and cannot be downloaded", model.name));
        }

        let attempt = {
            let mut inner = self.inner.lock();
            if inner.downloaded.contains(model_id) || inner.downloading.contains_key(model_id) {
                return Ok(());
            }
            let attempt = inner.attempts.entry(model_id.to_string()).or_insert(0);
            *attempt += 1;
            let attempt = *attempt;
            inner.errors.remove(model_id);
            inner.downloading.insert(model_id.to_string(), 0);
            attempt
        };
        tracing::info!("Downloading {} (attempt {})", model_id, attempt);

        let mgr = self.clone();
        let id = model_id.to_string();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            // First tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                if !mgr.advance(&id, attempt) {
                    break;
                }
            }
        });
        self.inner.lock().tasks.insert(model_id.to_string(), handle);
        Ok(())
    }

    /// One ticker step. Returns false once the download has ended.
    fn advance(&self, model_id: &str, attempt: u32) -> bool {
        let mut inner = self.inner.lock();
        let Some(progress) = inner.downloading.get(model_id).copied() else {
            return false;
        };

        let failure_chance = BASE_FAILURE_CHANCE / attempt as f64;
        if progress > PROGRESS_STEP && (self.roll)() < failure_chance {
            inner.downloading.remove(model_id);
            inner.tasks.remove(model_id);
            inner.errors.insert(model_id.to_string(), FAILED_STATUS.to_string());
            tracing::warn!("Download of {} failed at {}%", model_id, progress);
            return false;
        }

        let progress = progress.saturating_add(PROGRESS_STEP).min(100);
        if progress < 100 {
            inner.downloading.insert(model_id.to_string(), progress);
            return true;
        }

        inner.downloading.remove(model_id);
        inner.tasks.remove(model_id);
        inner.attempts.remove(model_id);
        inner.downloaded.insert(model_id.to_string());
        if let Err(e) = self.persist(&inner.downloaded) {
            tracing::error!("Failed to save downloaded models: {:#}", e);
        }
        tracing::info!("Downloaded {}", model_id);
        false
    }

    /// Stop an in-flight download and show "canceling" briefly.
    pub fn cancel(&self, model_id: &str) {
        {
            let mut inner = self.inner.lock();
            inner.canceling.insert(model_id.to_string());
            if let Some(task) = inner.tasks.remove(model_id) {
                task.abort();
            }
            inner.attempts.remove(model_id);
            inner.downloading.remove(model_id);
        }
        tracing::info!("Canceled download of {}", model_id);

        let inner = Arc::clone(&self.inner);
        let id = model_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(CANCEL_FEEDBACK).await;
            inner.lock().canceling.remove(&id);
        });
    }

    pub fn delete(&self, model_id: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.downloaded.remove(model_id);
        inner.attempts.remove(model_id);
        self.persist(&inner.downloaded)
    }

    pub fn status(&self, model_id: &str) -> ModelStatus {
        let inner = self.inner.lock();
        if inner.errors.contains_key(model_id) {
            ModelStatus::Error
        } else if inner.canceling.contains(model_id) {
            ModelStatus::Canceling
        } else if inner.downloaded.contains(model_id) {
            ModelStatus::Downloaded
        } else if inner.downloading.contains_key(model_id) {
            ModelStatus::Downloading
        } else {
            ModelStatus::NotDownloaded
        }
    }

    pub fn progress(&self, model_id: &str) -> Option<u8> {
        self.inner.lock().downloading.get(model_id).copied()
    }

    pub fn error(&self, model_id: &str) -> Option<String> {
        self.inner.lock().errors.get(model_id).cloned()
    }

    pub fn is_downloaded(&self, model_id: &str) -> bool {
        self.inner.lock().downloaded.contains(model_id)
    }

    pub fn downloaded(&self) -> Vec<String> {
        self.inner.lock().downloaded.iter().cloned().collect()
    }

    /// Write a small JSON descriptor of a downloaded model into `dir`.
    pub fn export(&self, model: &LlmModel, dir: &Path) -> Result<PathBuf> {
        if !self.is_downloaded(model.id) {
            return Err(anyhow!("{} is not downloaded", model.name));
        }
        let body = serde_json::json!({
            "id": model.id,
            "name": model.name,
            "provider": model.provider,
            "exportedAt": Utc::now().to_rfc3339(),
        });
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let path = dir.join(export_file_name(model.id));
        fs::write(&path, serde_json::to_string_pretty(&body)?)
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }

    fn persist(&self, downloaded: &BTreeSet<String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string(downloaded)?)
            .with_context(|| format!("writing {}", self.path.display()))
    }
}

/// `gemma-3-4b` -> `gemma_3_4b.json`
pub fn export_file_name(model_id: &str) -> String {
    let stem: String = model_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("{}.json", stem)
}

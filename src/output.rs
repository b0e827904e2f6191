use crate::error::OutputError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Output sink collaborator. Receives the finished encoded image.
#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn deliver(&self, bytes: &[u8], filename: &str) -> Result<(), OutputError>;
}

/// `<prefix>_<unix-millis>.jpg`
pub fn suggested_filename(prefix: &str, time: SystemTime) -> String {
    let millis = time
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!("{}_{}.jpg", prefix, millis)
}

/// Writes deliveries into a directory.
///
/// Bytes go to a hidden temporary file first and are renamed into place, so
/// a failed write never leaves a partial image under the final name.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn ensure_dir(&self) -> Result<(), OutputError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| OutputError::DirectoryCreation {
                path: self.dir.display().to_string(),
                source,
            })
    }
}

#[async_trait]
impl OutputSink for DirectorySink {
    async fn deliver(&self, bytes: &[u8], filename: &str) -> Result<(), OutputError> {
        if filename.is_empty() || filename.contains(['/', '\\']) || filename.starts_with('.') {
            return Err(OutputError::Rejected {
                filename: filename.to_string(),
                details: "file name must be a plain, non-hidden name".to_string(),
            });
        }

        self.ensure_dir().await?;

        let final_path = self.dir.join(filename);
        let temp_path = self.dir.join(format!(".{}.part", filename));

        if let Err(source) = tokio::fs::write(&temp_path, bytes).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(OutputError::Write {
                path: temp_path.display().to_string(),
                source,
            });
        }

        if let Err(source) = tokio::fs::rename(&temp_path, &final_path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(OutputError::Write {
                path: final_path.display().to_string(),
                source,
            });
        }

        debug!("Wrote {} bytes to {}", bytes.len(), final_path.display());
        info!("Saved {}", final_path.display());
        Ok(())
    }
}

/// Sink that keeps deliveries in memory, for tests and dry runs
#[derive(Default)]
pub struct MemorySink {
    deliveries: Mutex<Vec<(String, Vec<u8>)>>,
    fail: AtomicBool,
    delay: Duration,
    active: AtomicUsize,
    peak_active: AtomicUsize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every delivery for `delay` before accepting it
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn deliveries(&self) -> Vec<(String, Vec<u8>)> {
        self.deliveries.lock().clone()
    }

    pub fn delivery_count(&self) -> usize {
        self.deliveries.lock().len()
    }

    /// Highest number of deliveries observed in progress at once
    pub fn peak_concurrency(&self) -> usize {
        self.peak_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OutputSink for MemorySink {
    async fn deliver(&self, bytes: &[u8], filename: &str) -> Result<(), OutputError> {
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_active.fetch_max(now_active, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(OutputError::Rejected {
                filename: filename.to_string(),
                details: "memory sink set to fail".to_string(),
            });
        }

        self.deliveries
            .lock()
            .push((filename.to_string(), bytes.to_vec()));
        Ok(())
    }
}

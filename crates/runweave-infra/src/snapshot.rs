//! Loader cache snapshot persistence.
//!
//! Consumes the run loader's change listener: every snapshot is written to
//! `{data_dir}/cache/run_loader.json` so a new process can warm-start its
//! caches without re-fetching the working set. Persistence is advisory --
//! a missing or corrupt snapshot file degrades to a cold start, never to a
//! failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use runweave_core::run::LoaderSnapshot;

/// Errors from snapshot persistence.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// File-backed store for [`LoaderSnapshot`]s.
pub struct CacheSnapshotStore {
    path: PathBuf,
}

impl CacheSnapshotStore {
    /// Store snapshots under `{data_dir}/cache/run_loader.json`.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("cache").join("run_loader.json"),
        }
    }

    /// Persist a snapshot atomically (write to a temp file, then rename),
    /// so a crash mid-write never leaves a truncated snapshot behind.
    pub async fn save(&self, snapshot: &LoaderSnapshot) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(snapshot)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &json).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        tracing::debug!(
            path = %self.path.display(),
            routines = snapshot.routines.len(),
            projects = snapshot.projects.len(),
            "cache snapshot persisted"
        );
        Ok(())
    }

    /// Load the last persisted snapshot.
    ///
    /// `Ok(None)` when no snapshot exists yet. A snapshot that fails to
    /// parse is treated the same way (with a warning): warm-start data is
    /// advisory and must not block startup.
    pub async fn load(&self) -> Result<Option<LoaderSnapshot>, SnapshotError> {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_slice(&content) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "cache snapshot unreadable, cold-starting"
                );
                Ok(None)
            }
        }
    }

    /// Build a loader change listener that persists each snapshot in the
    /// background.
    ///
    /// Saves are spawned so the loader never blocks on disk; a failed save
    /// is logged and dropped (the next mutation will try again).
    pub fn change_listener(
        self: &Arc<Self>,
    ) -> impl Fn(LoaderSnapshot) + Send + Sync + 'static {
        let store = Arc::clone(self);
        move |snapshot| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                if let Err(err) = store.save(&snapshot).await {
                    tracing::warn!(error = %err, "cache snapshot persist failed");
                }
            });
        }
    }
}

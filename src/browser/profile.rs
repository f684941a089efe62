use std::path::{Path, PathBuf};

use crate::{Result, SweepError};

/// A worker's private browser profile directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerProfile {
    pub worker_id: usize,
    pub dir: PathBuf,
}

impl WorkerProfile {
    /// Creates `<root>/<run_token>/worker-<id>`
    ///
    /// An uncreatable directory is a fatal error for the run.
    pub async fn prepare(root: &Path, run_token: &str, worker_id: usize) -> Result<Self> {
        let dir = root.join(run_token).join(format!("worker-{}", worker_id));
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| SweepError::ProfileDir {
                path: dir.clone(),
                source,
            })?;

        tracing::debug!("Prepared profile {} for worker {}", dir.display(), worker_id);
        Ok(Self { worker_id, dir })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_profiles_are_private() {
        let root = tempfile::tempdir().unwrap();
        let a = WorkerProfile::prepare(root.path(), "run1", 0).await.unwrap();
        let b = WorkerProfile::prepare(root.path(), "run1", 1).await.unwrap();

        assert_ne!(a.dir, b.dir);
        assert!(a.dir.is_dir());
        assert!(b.dir.ends_with("run1/worker-1"));
    }

    #[tokio::test]
    async fn test_uncreatable_profile_is_fatal() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let err = WorkerProfile::prepare(&blocker, "run1", 0).await.unwrap_err();
        assert!(matches!(err, SweepError::ProfileDir { .. }));
        assert!(err.is_fatal());
    }
}

use crate::error::{IngestError, PipelineError};
use crate::models::RetryPolicy;
use std::io;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

pub const INDEX_DIR_NAME: &str = "vector_index";
pub const SCRATCH_DIR_NAME: &str = "temp_uploads";

/// On-disk layout: one index directory and one scratch directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    index_dir: PathBuf,
    scratch_dir: PathBuf,
}

impl Workspace {
    pub fn new(index_dir: impl Into<PathBuf>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            index_dir: index_dir.into(),
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn under(data_dir: &Path) -> Self {
        Self::new(data_dir.join(INDEX_DIR_NAME), data_dir.join(SCRATCH_DIR_NAME))
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Removes files left behind in the scratch directory by an earlier run.
    pub async fn sweep_scratch(&self) -> Result<usize, IngestError> {
        fs::create_dir_all(&self.scratch_dir).await?;

        let scratch_dir = self.scratch_dir.clone();
        let removed = tokio::task::spawn_blocking(move || remove_stale_files(&scratch_dir))
            .await
            .map_err(io::Error::other)??;

        if removed > 0 {
            warn!(path = %self.scratch_dir.display(), removed, "swept stale uploads");
        }
        Ok(removed)
    }

    /// Writes the upload to a uniquely named scratch file. Only the final
    /// path component of `filename` is used.
    pub async fn materialize(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> Result<ScratchFile, IngestError> {
        let name = Path::new(filename)
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| IngestError::MissingFileName(filename.to_string()))?;

        fs::create_dir_all(&self.scratch_dir).await?;
        let guard = ScratchFile {
            path: self.scratch_dir.join(format!("{}-{name}", Uuid::new_v4())),
            upload_name: name.to_string(),
        };
        fs::write(&guard.path, bytes).await?;

        debug!(path = %guard.path.display(), bytes = bytes.len(), "materialized upload");
        Ok(guard)
    }
}

fn remove_stale_files(scratch_dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in WalkDir::new(scratch_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|item| item.ok())
        .filter(|entry| entry.file_type().is_file())
    {
        std::fs::remove_file(entry.path())?;
        removed += 1;
    }
    Ok(removed)
}

/// Deletes its file when dropped, on every exit path.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    upload_name: String,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name the upload arrived with.
    pub fn upload_name(&self) -> &str {
        &self.upload_name
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed scratch file"),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => {
                warn!(path = %self.path.display(), %error, "failed to remove scratch file")
            }
        }
    }
}

#[cfg(windows)]
const TRANSIENT_LOCK_CODES: [i32; 2] = [
    32, // ERROR_SHARING_VIOLATION
    33, // ERROR_LOCK_VIOLATION
];

#[cfg(not(windows))]
const TRANSIENT_LOCK_CODES: [i32; 2] = [
    16, // EBUSY
    26, // ETXTBSY
];

pub fn is_transient_lock(error: &io::Error) -> bool {
    error
        .raw_os_error()
        .is_some_and(|code| TRANSIENT_LOCK_CODES.contains(&code))
}

/// Deletes `path` recursively. A missing directory is not an error.
pub async fn remove_dir_with_retry(path: &Path, policy: RetryPolicy) -> Result<(), PipelineError> {
    retry_on_lock(path, policy, || async move {
        match fs::remove_dir_all(path).await {
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    })
    .await
}

/// Runs `operation`, retrying transient lock failures with doubling delays.
/// Any other failure is returned at once.
pub async fn retry_on_lock<F, Fut>(
    path: &Path,
    policy: RetryPolicy,
    mut operation: F,
) -> Result<(), PipelineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    let attempts = policy.attempts.max(1);
    let mut delay = policy.initial_delay;
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(()) => return Ok(()),
            Err(error) if is_transient_lock(&error) && attempt < attempts => {
                warn!(
                    path = %path.display(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    %error,
                    "directory locked, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
            Err(error) if is_transient_lock(&error) => {
                return Err(PipelineError::DirectoryLock {
                    path: path.to_path_buf(),
                    attempts,
                    source: error,
                });
            }
            Err(error) => return Err(PipelineError::DocumentProcessing(IngestError::Io(error))),
        }
    }
}

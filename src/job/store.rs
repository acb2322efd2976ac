/*!
 * Output storage for translated files.
 *
 * Artifacts are addressed by job id and the input file's relative path.
 * `DirectoryStore` lays them out as `<root>/<job_id>/output/<path>`;
 * `MemoryStore` keeps them in a map, mostly for tests.
 */

use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::errors::FileError;

/// Where translated files end up
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store (or replace) one output file
    async fn write(&self, job_id: &str, path: &str, contents: &[u8]) -> Result<(), FileError>;

    /// Read one output file back, None when absent
    async fn read(&self, job_id: &str, path: &str) -> Result<Option<Vec<u8>>, FileError>;

    /// Relative paths stored for a job, sorted
    async fn list(&self, job_id: &str) -> Result<Vec<String>, FileError>;

    /// Remove everything stored for a job; removing nothing is not an error
    async fn remove_job(&self, job_id: &str) -> Result<(), FileError>;
}

/// Reject paths that could escape the job directory
fn checked_relative(path: &str) -> Result<&Path, FileError> {
    let relative = Path::new(path);
    let safe = !path.is_empty()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !safe {
        return Err(FileError::Io(format!("invalid artifact path: {}", path)));
    }
    Ok(relative)
}

/// Filesystem store
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn job_dir(&self, job_id: &str) -> Result<PathBuf, FileError> {
        checked_relative(job_id)?;
        Ok(self.root.join(job_id))
    }

    /// Output directory of a job
    pub fn output_dir(&self, job_id: &str) -> Result<PathBuf, FileError> {
        Ok(self.job_dir(job_id)?.join("output"))
    }

    fn artifact_path(&self, job_id: &str, path: &str) -> Result<PathBuf, FileError> {
        Ok(self.output_dir(job_id)?.join(checked_relative(path)?))
    }
}

#[async_trait]
impl ArtifactStore for DirectoryStore {
    async fn write(&self, job_id: &str, path: &str, contents: &[u8]) -> Result<(), FileError> {
        let target = self.artifact_path(job_id, path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, contents).await?;
        debug!("Stored {:?} ({} bytes)", target, contents.len());
        Ok(())
    }

    async fn read(&self, job_id: &str, path: &str) -> Result<Option<Vec<u8>>, FileError> {
        let target = self.artifact_path(job_id, path)?;
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, job_id: &str) -> Result<Vec<String>, FileError> {
        let output = self.output_dir(job_id)?;
        if !tokio::fs::try_exists(&output).await? {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        let mut dirs = vec![output.clone()];
        while let Some(dir) = dirs.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    dirs.push(path);
                } else if let Ok(relative) = path.strip_prefix(&output) {
                    found.push(relative.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        found.sort();
        Ok(found)
    }

    async fn remove_job(&self, job_id: &str) -> Result<(), FileError> {
        let dir = self.job_dir(job_id)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!("Removed {:?}", dir);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<BTreeMap<(String, String), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored artifacts across all jobs
    pub fn len(&self) -> usize {
        self.files.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.lock().is_empty()
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn write(&self, job_id: &str, path: &str, contents: &[u8]) -> Result<(), FileError> {
        checked_relative(path)?;
        self.files
            .lock()
            .insert((job_id.to_string(), path.to_string()), contents.to_vec());
        Ok(())
    }

    async fn read(&self, job_id: &str, path: &str) -> Result<Option<Vec<u8>>, FileError> {
        Ok(self
            .files
            .lock()
            .get(&(job_id.to_string(), path.to_string()))
            .cloned())
    }

    async fn list(&self, job_id: &str) -> Result<Vec<String>, FileError> {
        Ok(self
            .files
            .lock()
            .keys()
            .filter(|(job, _)| job == job_id)
            .map(|(_, path)| path.clone())
            .collect())
    }

    async fn remove_job(&self, job_id: &str) -> Result<(), FileError> {
        self.files.lock().retain(|(job, _), _| job != job_id);
        Ok(())
    }
}

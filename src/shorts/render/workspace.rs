use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::shorts::error::{ShortsError, ShortsResult};

/// Per-job scratch directory, `<root>/autoshorts-<job id>-<random>`.
///
/// Removed by [`Workspace::close`], or on drop if the job unwinds first.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn create(root: &Path, job_id: &str) -> ShortsResult<Self> {
        std::fs::create_dir_all(root).map_err(|err| {
            ShortsError::workspace(format!("creating workspace root {}", root.display()), err)
        })?;

        let dir = tempfile::Builder::new()
            .prefix(&format!("autoshorts-{job_id}-"))
            .tempdir_in(root)
            .map_err(|err| {
                ShortsError::workspace(format!("creating workspace in {}", root.display()), err)
            })?;

        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub async fn write(&self, name: &str, contents: &[u8]) -> ShortsResult<PathBuf> {
        let path = self.file(name);
        tokio::fs::write(&path, contents)
            .await
            .map_err(|err| ShortsError::workspace(format!("writing {name}"), err))?;
        Ok(path)
    }

    pub async fn read(&self, name: &str) -> ShortsResult<Vec<u8>> {
        tokio::fs::read(self.file(name))
            .await
            .map_err(|err| ShortsError::workspace(format!("reading {name}"), err))
    }

    /// Delete the directory and everything in it.
    pub fn close(self) -> std::io::Result<()> {
        self.dir.close()
    }
}

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};

/// The process-wide staging directory.
///
/// `initialize` is the only constructor and always wipes the directory, so a
/// `ScratchSpace` in hand means leftovers from an earlier run are gone. Build
/// it once, before the listener is bound.
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    root: PathBuf,
}

impl ScratchSpace {
    pub fn initialize(root: impl Into<PathBuf>) -> AppResult<Self> {
        let root = root.into();

        fs::create_dir_all(&root).map_err(|e| scratch_error("create", e))?;

        let leftovers = count_files(&root).unwrap_or(0);
        fs::remove_dir_all(&root).map_err(|e| scratch_error("clear", e))?;
        fs::create_dir_all(&root).map_err(|e| scratch_error("recreate", e))?;

        if leftovers > 0 {
            warn!(
                scratch_dir = %root.display(),
                leftovers,
                "Discarded files left behind by a previous run"
            );
        }
        info!(scratch_dir = %root.display(), "Scratch space ready");

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    pub fn is_ready(&self) -> bool {
        self.root.is_dir()
    }

    /// Number of files currently staged. Zero whenever no request is in
    /// flight.
    pub fn staged_count(&self) -> usize {
        count_files(&self.root).unwrap_or(0)
    }
}

fn count_files(dir: &Path) -> io::Result<usize> {
    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        if entry?.file_type()?.is_file() {
            count += 1;
        }
    }
    Ok(count)
}

fn scratch_error(action: &str, err: io::Error) -> AppError {
    AppError::config(format!("failed to {} scratch directory: {}", action, err))
}

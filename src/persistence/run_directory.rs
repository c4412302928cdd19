use chrono::{DateTime, Local};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::constants::files::{BACKUP_DIR, JOURNAL_FILE, PROGRESS_FILE, RESULTS_CSV};
use crate::error::{PersistenceError, PersistenceResult};

/// Layout of a single run's output directory
#[derive(Debug, Clone)]
pub struct RunDirectory {
    root: PathBuf,
}

impl RunDirectory {
    /// Create `{parent}/{run_name}_{YYYYmmdd_HHMMSS}` and its `backups/` subdirectory
    pub fn create(parent: &Path, run_name: &str) -> PersistenceResult<Self> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let base = format!("{run_name}_{stamp}");

        let mut root = parent.join(&base);
        let mut suffix = 1;
        while root.exists() {
            root = parent.join(format!("{base}_{suffix}"));
            suffix += 1;
        }

        let directory = Self { root };
        fs::create_dir_all(directory.backups_dir())
            .map_err(|e| PersistenceError::io(directory.backups_dir(), e))?;

        info!(
            run_directory = %directory.root.display(),
            "📁 RUN_DIRECTORY: Created run directory"
        );
        Ok(directory)
    }

    /// Re-open a directory written by an earlier run
    pub fn open_existing(root: &Path) -> PersistenceResult<Self> {
        if !root.is_dir() {
            return Err(PersistenceError::io(
                root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "run directory not found"),
            ));
        }
        let directory = Self {
            root: root.to_path_buf(),
        };
        fs::create_dir_all(directory.backups_dir())
            .map_err(|e| PersistenceError::io(directory.backups_dir(), e))?;
        Ok(directory)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn progress_path(&self) -> PathBuf {
        self.root.join(PROGRESS_FILE)
    }

    pub fn journal_path(&self) -> PathBuf {
        self.root.join(JOURNAL_FILE)
    }

    pub fn results_csv_path(&self) -> PathBuf {
        self.root.join(RESULTS_CSV)
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.root.join(BACKUP_DIR)
    }

    pub fn milestone_snapshot_path(&self, percent: u32, at: DateTime<Local>) -> PathBuf {
        self.backups_dir()
            .join(format!("backup_{percent}pct_{}.json", at.format("%H%M%S")))
    }

    pub fn milestone_csv_path(&self, percent: u32, at: DateTime<Local>) -> PathBuf {
        self.backups_dir()
            .join(format!("backup_{percent}pct_{}.csv", at.format("%H%M%S")))
    }
}

/// Write `contents` to a sibling temp file, sync it, then rename over `path`
pub fn write_atomic(path: &Path, contents: &[u8]) -> PersistenceResult<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    {
        let mut file = fs::File::create(&tmp_path).map_err(|e| PersistenceError::io(&tmp_path, e))?;
        file.write_all(contents)
            .map_err(|e| PersistenceError::io(&tmp_path, e))?;
        file.sync_all().map_err(|e| PersistenceError::io(&tmp_path, e))?;
    }

    fs::rename(&tmp_path, path).map_err(|e| PersistenceError::io(path, e))
}

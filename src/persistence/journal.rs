//! Append-only journal of committed results, one JSON object per line.
//!
//! Each commit is appended and synced before the call returns, so after a crash
//! the journal holds every committed result except possibly a torn final line.
//! Resuming a run replays the journal to rebuild the completed set.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{PersistenceError, PersistenceResult};
use crate::models::BacktestResult;

#[derive(Debug)]
pub struct ResultJournal {
    path: PathBuf,
    file: Mutex<File>,
}

impl ResultJournal {
    /// Open for appending, creating the file if needed
    pub fn open(path: &Path) -> PersistenceResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| PersistenceError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn append(&self, result: &BacktestResult) -> PersistenceResult<()> {
        let mut line = serde_json::to_string(result)?;
        line.push('\n');

        let mut file = self.file.lock();
        file.write_all(line.as_bytes())
            .map_err(|e| PersistenceError::io(&self.path, e))?;
        file.sync_data()
            .map_err(|e| PersistenceError::io(&self.path, e))
    }

    /// Read every intact entry. A missing file is an empty journal; lines that
    /// do not parse are skipped with a warning.
    pub fn load(path: &Path) -> PersistenceResult<Vec<BacktestResult>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(path).map_err(|e| PersistenceError::io(path, e))?;
        let mut results = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| PersistenceError::io(path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<BacktestResult>(&line) {
                Ok(result) => results.push(result),
                Err(e) => {
                    let err = PersistenceError::CorruptJournal {
                        path: path.display().to_string(),
                        line: index + 1,
                        error: e.to_string(),
                    };
                    warn!(error = %err, "📒 JOURNAL: Skipping unreadable entry");
                }
            }
        }
        Ok(results)
    }
}

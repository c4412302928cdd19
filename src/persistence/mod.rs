//! # Persistence
//!
//! Everything a run writes to disk lives in one run directory:
//!
//! ```text
//! runs/sweep_20250101_093000/
//! ├── progress.json        primary checkpoint, replaced atomically
//! ├── checkpoint.jsonl     append-only journal of committed results
//! ├── results.csv          final export
//! └── backups/             milestone snapshots and CSV backups
//! ```

pub mod csv_export;
pub mod journal;
pub mod run_directory;

pub use csv_export::{render_results_csv, write_results_csv};
pub use journal::ResultJournal;
pub use run_directory::{write_atomic, RunDirectory};

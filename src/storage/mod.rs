//! Storage layer for Burrow
//!
//! The knowledge graph lives in memory while the process runs; SQLite keeps it
//! across runs.

pub mod database;

use crate::config::Config;
use crate::error::{BurrowError, Result};
use std::path::Path;

pub use database::{decode_vector, encode_vector, Database, DbPool, DbStats};

/// Open the database named by the configuration
pub fn open(config: &Config) -> Result<Database> {
    let path = config.database_path()?;
    tracing::debug!("Opening database at {}", path.display());
    Database::new(&path)
}

/// Size of the database file plus its WAL, in bytes
pub fn database_size(db_path: &Path) -> Result<u64> {
    let mut size = 0u64;
    for suffix in ["", "-wal", "-shm"] {
        let path = db_path.with_file_name(format!(
            "{}{}",
            db_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            suffix
        ));
        if path.exists() {
            size += std::fs::metadata(&path)
                .map_err(|e| BurrowError::Io {
                    source: e,
                    context: format!("Failed to get file metadata: {}", path.display()),
                })?
                .len();
        }
    }
    Ok(size)
}

/// Format size as human-readable string
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_idx])
}

//! Summary files on disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::NaiveDate;

/// Summaries older than this are purged after each run.
pub const DEFAULT_RETENTION_DAYS: u64 = 2;

const SUMMARY_PREFIX: &str = "summary_";
const SUMMARY_EXTENSION: &str = "md";

/// Write `markdown` to `<dir>/summary_<date>.md`, creating `dir` if needed.
pub fn write_output(dir: &Path, markdown: &str, date: NaiveDate) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}{}.{}", SUMMARY_PREFIX, date.format("%Y-%m-%d"), SUMMARY_EXTENSION));
    fs::write(&path, markdown)?;
    Ok(path)
}

fn is_summary_file(path: &Path) -> bool {
    let named_like_summary = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(SUMMARY_PREFIX));
    named_like_summary && path.extension().is_some_and(|ext| ext == SUMMARY_EXTENSION)
}

/// Delete summary files in `dir` last modified more than `days` ago.
///
/// Only `summary_*.md` files are considered, so the history database and
/// metrics textfile sharing the directory are left alone. A missing
/// directory purges nothing. Files that cannot be removed are skipped.
pub fn purge_older_than(dir: &Path, days: u64) -> io::Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }
    let cutoff = SystemTime::now()
        .checked_sub(Duration::from_secs(days * 24 * 3600))
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || !is_summary_file(&path) {
            continue;
        }
        let modified = match fs::metadata(&path).and_then(|meta| meta.modified()) {
            Ok(modified) => modified,
            Err(err) => {
                tracing::debug!("Skipping {}: {}", path.display(), err);
                continue;
            }
        };
        if modified < cutoff {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(err) => tracing::warn!("Failed to purge {}: {}", path.display(), err),
            }
        }
    }
    Ok(removed)
}

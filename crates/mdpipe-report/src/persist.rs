use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use mdpipe_model::SummaryRecord;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::ReportError;

/// Atomically replace `path` with the pretty-printed `record`.
///
/// The JSON goes to a temp file next to `path`, is synced, then renamed over
/// it; readers see either the old file or the complete new one. Missing parent
/// directories are created.
pub fn persist(record: &SummaryRecord, path: &Path) -> Result<(), ReportError> {
    if path.file_name().is_none() {
        return Err(ReportError::InvalidPath(path.to_path_buf()));
    }
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|source| ReportError::CreateDir {
        path: parent.clone(),
        source,
    })?;

    let mut json = serde_json::to_vec_pretty(record)?;
    json.push(b'\n');

    let write_err = |source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut tmp = NamedTempFile::new_in(&parent).map_err(write_err)?;
    tmp.write_all(&json).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    debug!(target: "mdpipe.report", path = %path.display(), bytes = json.len(), "summary persisted");
    Ok(())
}

/// Read a summary written by [`persist`].
pub fn load(path: &Path) -> Result<SummaryRecord, ReportError> {
    let bytes = fs::read(path).map_err(|source| ReportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_slice(&bytes)?)
}

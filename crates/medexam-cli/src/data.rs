//! JSON data file holding the catalog, rosters and results

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use medexam_core::MemoryStore;
use tempfile::NamedTempFile;
use tracing::debug;

pub fn load(path: &Path) -> Result<MemoryStore> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read data file {}", path.display()))?;
    let store = serde_json::from_str(&text)
        .with_context(|| format!("Invalid data file {}", path.display()))?;
    debug!(path = %path.display(), "loaded data file");
    Ok(store)
}

/// Replace the data file atomically: readers see the old or the new content
pub fn save(store: &MemoryStore, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    serde_json::to_writer_pretty(&mut file, store)?;
    file.write_all(b"\n")?;
    file.persist(path)
        .with_context(|| format!("Failed to write data file {}", path.display()))?;
    debug!(path = %path.display(), "saved data file");
    Ok(())
}

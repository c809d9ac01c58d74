use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

/// Load a JSON document, or `T::default()` if the file doesn't exist yet.
pub fn load_json_or_default<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return Ok(T::default());
    }
    load_json(path)
}

/// Load a JSON document that must exist.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    tracing::debug!("Reading {}", path.display());
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse JSON in {}", path.display()))
}

/// Save a JSON document atomically
///
/// Uses atomic-write-file so an interrupted run never leaves a truncated
/// cache behind. Creates the parent directory if needed.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    tracing::debug!("Writing {}", path.display());
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;

    serde_json::to_writer(&mut file, value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;

    file.commit()
        .with_context(|| format!("Failed to save {}", path.display()))?;

    Ok(())
}

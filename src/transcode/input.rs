use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// First candidate that exists as a file, in order.
pub fn resolve_input(candidates: &[PathBuf]) -> Result<PathBuf> {
    let found = candidates.iter().find(|p| p.is_file()).cloned();

    match found {
        Some(path) => {
            tracing::info!("Input file detected: {}", path.display());
            Ok(path)
        }
        None => Err(Error::InputNotFound {
            candidates: candidates.to_vec(),
        }),
    }
}

/// Use an explicit input path, checking it exists.
pub fn explicit_input(path: &Path) -> Result<PathBuf> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(Error::InputNotFound {
            candidates: vec![path.to_path_buf()],
        })
    }
}

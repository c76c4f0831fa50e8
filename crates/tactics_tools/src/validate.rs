//! Catalog validation.

use std::path::{Path, PathBuf};

use tactics_core::data::Catalog;

use crate::error::{Result, ToolsError};

/// Outcome of checking every catalog in a directory.
#[derive(Debug, Default)]
pub struct ValidationSummary {
    /// Catalogs that parsed and passed validation.
    pub valid: Vec<(PathBuf, Catalog)>,
    /// Files that failed, with the reason.
    pub failures: Vec<(PathBuf, String)>,
}

impl ValidationSummary {
    /// Whether every file passed.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Parse and validate one catalog file.
///
/// # Errors
///
/// Returns [`ToolsError::Io`] if the file cannot be read, or the catalog's
/// parse or validation error.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let text = std::fs::read_to_string(path).map_err(|source| ToolsError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(Catalog::from_ron_str(&path.display().to_string(), &text)?)
}

/// Validate every `.ron` catalog directly inside `dir`, in file name order.
///
/// Bad catalogs are collected in the summary rather than failing the run.
///
/// # Errors
///
/// Returns [`ToolsError::Io`] if the directory cannot be listed.
pub fn validate_catalog_dir(dir: &Path) -> Result<ValidationSummary> {
    let io_error = |source| ToolsError::Io {
        path: dir.display().to_string(),
        source,
    };
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "ron") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut summary = ValidationSummary::default();
    for path in paths {
        match load_catalog(&path) {
            Ok(catalog) => {
                tracing::info!(path = %path.display(), team = %catalog.team, "Catalog valid");
                summary.valid.push((path, catalog));
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "Catalog invalid: {e}");
                summary.failures.push((path, e.to_string()));
            }
        }
    }
    Ok(summary)
}

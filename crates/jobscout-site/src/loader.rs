//! Site definition loading from TOML files.
//!
//! Definitions live in `site-definitions/`, one file per site named
//! `<site-id>.toml`, optionally grouped into subdirectories.

use crate::{
    definition::SiteDefinition,
    error::{Result, SiteError},
};
use jobscout_core::SiteId;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the definitions directory at the workspace root.
pub const DEFINITIONS_DIR: &str = "site-definitions";

/// Loader for site definitions from TOML files.
pub struct SiteLoader {
    definitions_dir: PathBuf,
}

impl SiteLoader {
    /// Create a loader over an existing definitions directory.
    pub fn new(definitions_dir: impl Into<PathBuf>) -> Result<Self> {
        let definitions_dir = definitions_dir.into();

        if !definitions_dir.is_dir() {
            return Err(SiteError::DirectoryNotFound {
                path: definitions_dir.display().to_string(),
            });
        }

        Ok(Self { definitions_dir })
    }

    /// Create a loader using `site-definitions/` at the workspace root.
    ///
    /// Walks up from the current directory to the first `Cargo.toml` that
    /// declares a `[workspace]`, falling back to a relative path.
    pub fn with_default_dir() -> Result<Self> {
        let mut current = std::env::current_dir()?;

        loop {
            let manifest = current.join("Cargo.toml");
            if let Ok(contents) = std::fs::read_to_string(&manifest) {
                if contents.contains("[workspace]") {
                    return Self::new(current.join(DEFINITIONS_DIR));
                }
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => break,
            }
        }

        Self::new(DEFINITIONS_DIR)
    }

    /// Directory this loader reads from.
    #[must_use]
    pub fn definitions_dir(&self) -> &Path {
        &self.definitions_dir
    }

    /// Load and validate a single site definition by ID.
    pub fn load(&self, site_id: &SiteId) -> Result<SiteDefinition> {
        let filename = format!("{}.toml", site_id.as_str());

        let Some(path) = find_file(&self.definitions_dir, &filename)? else {
            return Err(SiteError::NotFound {
                site_id: site_id.to_string(),
            });
        };

        let definition = load_file(&path)?;

        if definition.id() != site_id {
            return Err(SiteError::ValidationError {
                site_id: site_id.to_string(),
                reason: format!(
                    "file {} declares site id '{}'",
                    path.display(),
                    definition.id()
                ),
            });
        }

        debug!(site_id = %site_id, name = %definition.name(), "loaded site definition");

        Ok(definition)
    }

    /// Load every definition under the directory.
    ///
    /// Files that fail to parse or validate are logged and skipped.
    pub fn load_all(&self) -> Result<Vec<SiteDefinition>> {
        let mut definitions = Vec::new();
        walk_and_load(&self.definitions_dir, &mut definitions)?;

        info!(
            count = definitions.len(),
            dir = %self.definitions_dir.display(),
            "loaded site definitions"
        );

        Ok(definitions)
    }
}

/// Load and validate a definition from an explicit file path.
pub fn load_file(path: &Path) -> Result<SiteDefinition> {
    let contents = std::fs::read_to_string(path).map_err(|e| SiteError::LoadError {
        path: path.display().to_string(),
        source: Box::new(e),
    })?;

    let definition: SiteDefinition =
        toml::from_str(&contents).map_err(|e| SiteError::ParseError {
            path: path.display().to_string(),
            source: e,
        })?;

    definition.validate()?;
    Ok(definition)
}

fn walk_and_load(dir: &Path, definitions: &mut Vec<SiteDefinition>) -> Result<()> {
    let mut entries = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            walk_and_load(&path, definitions)?;
            continue;
        }

        if path.extension().and_then(|s| s.to_str()) != Some("toml") {
            continue;
        }

        match load_file(&path) {
            Ok(definition) => definitions.push(definition),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping site definition");
            }
        }
    }

    Ok(())
}

fn find_file(dir: &Path, filename: &str) -> Result<Option<PathBuf>> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_dir() {
            if let Some(found) = find_file(&path, filename)? {
                return Ok(Some(found));
            }
        } else if path.file_name().and_then(|s| s.to_str()) == Some(filename) {
            return Ok(Some(path));
        }
    }

    Ok(None)
}

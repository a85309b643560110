use crate::domain::ClientRegistry;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// JSON file holding the client registry
///
/// The file is read once at the start of a run and replaced once at the end.
/// Writes go to a temporary file in the same directory which is then renamed
/// over the original, so a crash mid-write never leaves a truncated registry.
/// A symlinked registry is written through to its target, and the target's
/// permissions carry over to the new file.
#[derive(Debug, Clone)]
pub struct RegistryFile {
    path: PathBuf,
}

impl RegistryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<ClientRegistry> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read client registry {}", self.path.display()))?;
        let registry: ClientRegistry = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse client registry {}", self.path.display()))?;

        debug!(path = %self.path.display(), clients = registry.len(), "loaded client registry");
        Ok(registry)
    }

    /// Rewrite the whole registry, 4-space indented, keys in their original order
    pub fn save(&self, registry: &ClientRegistry) -> Result<()> {
        let target = fs::canonicalize(&self.path).unwrap_or_else(|_| self.path.clone());
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;

        let mut serializer =
            serde_json::Serializer::with_formatter(&mut file, PrettyFormatter::with_indent(b"    "));
        registry
            .serialize(&mut serializer)
            .context("failed to serialize client registry")?;
        file.flush()?;

        if let Ok(metadata) = fs::metadata(&target) {
            file.as_file()
                .set_permissions(metadata.permissions())
                .with_context(|| format!("failed to copy permissions of {}", target.display()))?;
        }

        file.persist(&target)
            .with_context(|| format!("failed to replace client registry {}", target.display()))?;

        debug!(path = %target.display(), clients = registry.len(), "saved client registry");
        Ok(())
    }
}

//! Loads style resources from a directory tree.
//!
//! Style documents are often authored by third parties, so `xlink:href`
//! values are confined to the style directory: a reference that resolves
//! outside of it is reported as not found.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use symbology_traits::{ResourceError, ResourceProvider, SharedResourceData};

/// Serves files below a root directory, typically the one holding the styles.
#[derive(Debug)]
pub struct FilesystemResourceProvider {
    root: PathBuf,
    canonical_root: Option<PathBuf>,
}

impl FilesystemResourceProvider {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        let canonical_root = root.canonicalize().ok();
        Self { root, canonical_root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a resource key to a path inside the root, or `None` if the key
    /// escapes it. Absolute keys are accepted when they point into the root,
    /// which is what resolving against an absolute style path produces.
    fn locate(&self, key: &str) -> Option<PathBuf> {
        let requested = Path::new(key);
        let candidate = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            self.root.join(requested)
        };

        if let Ok(canonical) = candidate.canonicalize()
            && let Some(root) = &self.canonical_root
        {
            return canonical.starts_with(root).then_some(canonical);
        }

        // Nothing on disk to canonicalize; refuse anything that climbs.
        if requested.is_absolute() || requested.components().any(|c| matches!(c, Component::ParentDir)) {
            return None;
        }
        Some(candidate)
    }
}

impl ResourceProvider for FilesystemResourceProvider {
    fn load(&self, path: &str) -> Result<SharedResourceData, ResourceError> {
        let full_path = self
            .locate(path)
            .ok_or_else(|| ResourceError::NotFound(format!("{} (outside of style root)", path)))?;

        std::fs::read(&full_path).map(Arc::new).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ResourceError::NotFound(path.to_string())
            } else {
                ResourceError::LoadFailed {
                    path: path.to_string(),
                    message: e.to_string(),
                }
            }
        })
    }

    fn name(&self) -> &'static str {
        "FilesystemResourceProvider"
    }
}

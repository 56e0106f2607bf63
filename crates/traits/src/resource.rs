//! Fetching external style resources.
//!
//! Mark glyph fonts, SVG marks, external graphics and remote rule documents
//! are all addressed by a key (usually a URL or path taken from an
//! `xlink:href`) and fetched as raw bytes through a [`ResourceProvider`].

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResourceError {
    #[error("No resource under '{0}'")]
    NotFound(String),

    #[error("Reading '{path}' failed: {message}")]
    LoadFailed { path: String, message: String },

    #[error("Unreadable resource content: {0}")]
    InvalidFormat(String),
}

/// Resource bytes, shared between the cache and every style using them.
pub type SharedResourceData = Arc<Vec<u8>>;

/// Fetches resource bytes by key.
///
/// Fetches block. Bounding their latency (timeouts, retries) is up to the
/// implementation; style compilation treats any error as "resource missing".
pub trait ResourceProvider: Send + Sync + Debug {
    fn load(&self, key: &str) -> Result<SharedResourceData, ResourceError>;

    /// Short label used in log lines.
    fn name(&self) -> &'static str;
}

/// Resolves `href` against the system id of the document that referenced it.
///
/// Absolute URLs (`scheme:...`) and absolute paths are returned unchanged;
/// `file:` prefixes are stripped so filesystem providers see plain paths.
/// Relative references are joined to the directory part of `base`.
pub fn resolve_href(base: Option<&str>, href: &str) -> String {
    let href = strip_file_scheme(href.trim());

    let is_url = href
        .split_once(':')
        .is_some_and(|(scheme, _)| scheme.len() > 1 && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.'));
    if is_url || href.starts_with('/') {
        return href.to_string();
    }

    let Some(base) = base else {
        return href.to_string();
    };
    let base = strip_file_scheme(base);
    match base.rfind('/') {
        Some(idx) => format!("{}{}", &base[..=idx], href),
        None => href.to_string(),
    }
}

fn strip_file_scheme(s: &str) -> &str {
    s.strip_prefix("file://").or_else(|| s.strip_prefix("file:")).unwrap_or(s)
}

/// Resources held in memory, keyed exactly as they are requested.
///
/// Loads are counted, so callers can observe how often the resolver goes
/// past its cache. Useful for embedding styles with their graphics.
#[derive(Debug, Default)]
pub struct InMemoryResourceProvider {
    entries: RwLock<HashMap<String, SharedResourceData>>,
    loads: AtomicUsize,
}

impl InMemoryResourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `data` under `key`, replacing any previous entry.
    pub fn insert(&self, key: impl Into<String>, data: Vec<u8>) -> Result<(), ResourceError> {
        let key = key.into();
        let mut entries = self.entries.write().map_err(|_| ResourceError::LoadFailed {
            path: key.clone(),
            message: "resource store lock poisoned".to_string(),
        })?;
        entries.insert(key, Arc::new(data));
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert) for fixtures.
    pub fn with(self, key: impl Into<String>, data: Vec<u8>) -> Self {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.into(), Arc::new(data));
        }
        self
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

impl ResourceProvider for InMemoryResourceProvider {
    fn load(&self, key: &str) -> Result<SharedResourceData, ResourceError> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        let entries = self.entries.read().map_err(|_| ResourceError::LoadFailed {
            path: key.to_string(),
            message: "resource store lock poisoned".to_string(),
        })?;
        entries.get(key).cloned().ok_or_else(|| ResourceError::NotFound(key.to_string()))
    }

    fn name(&self) -> &'static str {
        "InMemoryResourceProvider"
    }
}

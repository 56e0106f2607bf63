use serde::Deserialize;
use symbology_core::DEFAULT_CACHE_CAPACITY;

/// Where the style tables live and how referenced documents are resolved.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Schema qualifying every table name; unqualified if absent.
    pub schema: Option<String>,
    /// Base for relative references inside stored SLD snippets.
    pub system_id: Option<String>,
    /// Entries kept in the resource resolver's caches.
    pub cache_capacity: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            schema: None,
            system_id: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl ReaderConfig {
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_system_id(mut self, system_id: impl Into<String>) -> Self {
        self.system_id = Some(system_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_json() {
        let config: ReaderConfig = serde_json::from_str(r#"{"schema": "styles"}"#).unwrap();
        assert_eq!(config.schema.as_deref(), Some("styles"));
        assert_eq!(config.system_id, None);
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
    }
}

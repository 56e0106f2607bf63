//! The feature abstraction styles are evaluated against.

use crate::value::Value;
use std::collections::HashMap;
use std::fmt::Debug;

/// An attribute bag being styled. Property lookup is by local name.
pub trait Feature: Debug + Send + Sync {
    fn id(&self) -> Option<&str>;

    /// All values of the named property, or `None` if the feature has no such property.
    fn property(&self, name: &str) -> Option<&[Value]>;
}

/// A plain in-memory feature.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimpleFeature {
    id: Option<String>,
    properties: HashMap<String, Vec<Value>>,
}

impl SimpleFeature {
    pub fn new(id: Option<String>) -> Self {
        Self { id, properties: HashMap::new() }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Appends a value to the named property.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties.entry(name.into()).or_default().push(value.into());
    }

    /// Builds a feature from a JSON object. An `id` member becomes the feature id;
    /// array members become multi-valued properties; nested objects are skipped.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let object = value.as_object()?;
        let mut feature = SimpleFeature::new(
            object.get("id").and_then(|v| v.as_str()).map(str::to_string),
        );
        for (key, member) in object {
            if key == "id" {
                continue;
            }
            match member {
                serde_json::Value::Array(items) => {
                    let values = items.iter().filter_map(Value::from_json).collect();
                    feature.properties.insert(key.clone(), values);
                }
                other => {
                    if let Some(v) = Value::from_json(other) {
                        feature.insert(key.clone(), v);
                    }
                }
            }
        }
        Some(feature)
    }
}

impl Feature for SimpleFeature {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn property(&self, name: &str) -> Option<&[Value]> {
        self.properties.get(name).map(Vec::as_slice)
    }
}

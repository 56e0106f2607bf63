//! Features from JSON.

use crate::error::SymbologyError;
use serde_json::Value;
use symbology_types::SimpleFeature;

/// Reads an array of flat feature objects or a GeoJSON feature collection.
///
/// GeoJSON features contribute their `properties` and `id`; geometries are
/// not needed for styling and are ignored.
pub fn features_from_json(value: &Value) -> Result<Vec<SimpleFeature>, SymbologyError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(object) => match object.get("features") {
            Some(Value::Array(items)) => items,
            _ => return Err(SymbologyError::Input("expected a 'features' array".to_string())),
        },
        _ => return Err(SymbologyError::Input("expected an array of features".to_string())),
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            flatten(item)
                .and_then(|flat| SimpleFeature::from_json(&flat))
                .ok_or_else(|| SymbologyError::Input(format!("feature {} is not an object", i)))
        })
        .collect()
}

fn flatten(item: &Value) -> Option<Value> {
    let object = item.as_object()?;
    let Some(Value::Object(properties)) = object.get("properties") else {
        return Some(item.clone());
    };
    let mut flat = properties.clone();
    match object.get("id") {
        Some(Value::String(id)) => {
            flat.insert("id".to_string(), Value::String(id.clone()));
        }
        Some(Value::Number(id)) => {
            flat.insert("id".to_string(), Value::String(id.to_string()));
        }
        _ => {}
    }
    Some(Value::Object(flat))
}

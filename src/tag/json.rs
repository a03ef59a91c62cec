//! JSON text reader, for exported or hand-written save trees.

use serde_json::Value;

use super::{Scalar, Tag, TagReader};
use crate::error::{HoardError, Result};

pub struct JsonReader;

impl TagReader for JsonReader {
    fn name(&self) -> &'static str {
        "json"
    }

    fn read(&self, bytes: &[u8]) -> Result<Tag> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| HoardError::Tag(e.to_string()))?;
        if !value.is_object() {
            return Err(HoardError::Tag("root must be a json object".to_string()));
        }
        Ok(convert(value))
    }
}

fn convert(value: Value) -> Tag {
    match value {
        Value::Object(map) => {
            Tag::Compound(map.into_iter().map(|(k, v)| (k, convert(v))).collect())
        }
        Value::Array(items) => Tag::List(items.into_iter().map(convert).collect()),
        Value::String(s) => Tag::Scalar(Scalar::Str(s)),
        Value::Bool(b) => Tag::Scalar(Scalar::Int(i64::from(b))),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Tag::Scalar(Scalar::Int(i)),
            None => Tag::Scalar(Scalar::Float(n.as_f64().unwrap_or_default())),
        },
        Value::Null => Tag::List(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_objects_arrays_and_scalars() {
        let root = JsonReader
            .read(br#"{"Inventory": [{"id": "minecraft:apple", "Count": 3, "Damage": 0.5}]}"#)
            .unwrap();
        let item = &root.get("Inventory").and_then(Tag::as_list).unwrap()[0];
        assert_eq!(item.get("id").and_then(Tag::as_str), Some("minecraft:apple"));
        assert_eq!(item.get("Count"), Some(&Tag::Scalar(Scalar::Int(3))));
        assert_eq!(item.get("Damage"), Some(&Tag::Scalar(Scalar::Float(0.5))));
    }

    #[test]
    fn rejects_non_object_root() {
        assert!(JsonReader.read(b"[1, 2, 3]").is_err());
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(JsonReader.read(b"{\"Inventory\": [").is_err());
    }
}

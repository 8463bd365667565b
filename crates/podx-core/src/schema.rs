use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::error::{PodxError, Result};

/// A JSON-schema object sent with every extract request.
///
/// Each field is wrapped as `{ value, confidenceScore }` so the service reports
/// its certainty next to every extracted value.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionSchema(Value);

impl ExtractionSchema {
    /// Wraps a schema after checking that it names at least one required field and
    /// that every required field is declared under `properties`.
    pub fn new(schema: Value) -> Result<Self> {
        let properties = schema
            .get("properties")
            .and_then(Value::as_object)
            .ok_or_else(|| PodxError::Schema("schema has no 'properties' object".into()))?;

        let required = schema
            .get("required")
            .and_then(Value::as_array)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| PodxError::Schema("schema must list at least one required field".into()))?;

        for field in required {
            let name = field
                .as_str()
                .ok_or_else(|| PodxError::Schema(format!("required entry {field} is not a string")))?;
            if !properties.contains_key(name) {
                return Err(PodxError::Schema(format!(
                    "required field '{name}' is not declared in properties"
                )));
            }
        }

        Ok(Self(schema))
    }

    /// Shipment fields read from proof-of-delivery documents.
    pub fn proof_of_delivery() -> Self {
        let mut properties = Map::new();
        properties.insert(
            "referenceIds".into(),
            scored(json!({
                "type": "array",
                "description": "List of all reference IDs associated with the shipment.",
                "items": {
                    "type": "string",
                    "description": "A unique identifier for a document or entity related to the shipping, billing, or consignment process."
                }
            })),
        );
        for (name, description) in [
            ("shipperName", "Name of the shipper."),
            ("shipperAddress", "Address of the shipper."),
            ("consigneeName", "Name of the consignee."),
            ("consigneeAddress", "Address of the consignee."),
            ("carrierName", "Name of the carrier responsible for shipping the goods."),
        ] {
            properties.insert(
                name.into(),
                scored(json!({ "type": "string", "description": description })),
            );
        }

        Self(json!({
            "type": "object",
            "properties": properties,
            "required": ["referenceIds"],
            "description": "Object containing key information about a shipment, including various identification and party details."
        }))
    }

    pub fn required_fields(&self) -> Vec<&str> {
        self.0
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl Default for ExtractionSchema {
    fn default() -> Self {
        Self::proof_of_delivery()
    }
}

impl Serialize for ExtractionSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

fn scored(value: Value) -> Value {
    json!({
        "type": "object",
        "properties": {
            "value": value,
            "confidenceScore": { "type": "number" }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proof_of_delivery_requires_reference_ids() {
        let schema = ExtractionSchema::proof_of_delivery();
        assert_eq!(schema.required_fields(), vec!["referenceIds"]);
        // The built-in schema satisfies its own invariant.
        assert!(ExtractionSchema::new(schema.as_value().clone()).is_ok());
    }

    #[test]
    fn test_proof_of_delivery_fields() {
        let schema = ExtractionSchema::proof_of_delivery();
        let properties = schema.as_value()["properties"].as_object().unwrap();
        let mut names: Vec<&str> = properties.keys().map(String::as_str).collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                "carrierName",
                "consigneeAddress",
                "consigneeName",
                "referenceIds",
                "shipperAddress",
                "shipperName"
            ]
        );

        for (name, field) in properties {
            assert_eq!(
                field["properties"]["confidenceScore"]["type"], "number",
                "{name} lacks a numeric confidence score"
            );
        }
        assert_eq!(properties["referenceIds"]["properties"]["value"]["type"], "array");
        assert_eq!(properties["carrierName"]["properties"]["value"]["type"], "string");
    }

    #[test]
    fn test_rejects_schema_without_required() {
        let result = ExtractionSchema::new(json!({
            "type": "object",
            "properties": { "a": { "type": "string" } }
        }));
        assert!(matches!(result, Err(PodxError::Schema(_))));
    }

    #[test]
    fn test_rejects_undeclared_required_field() {
        let result = ExtractionSchema::new(json!({
            "type": "object",
            "properties": { "a": { "type": "string" } },
            "required": ["b"]
        }));
        assert!(matches!(result, Err(PodxError::Schema(ref m)) if m.contains("'b'")));
    }

    #[test]
    fn test_serializes_as_plain_schema() {
        let schema = ExtractionSchema::proof_of_delivery();
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(&json, schema.as_value());
    }
}

// src/models/event.rs

//! Inbound event and request shapes.
//!
//! Only the envelope of an event is parsed up front. `operation`, `params`
//! and batch entries stay raw JSON until the gateway inspects them, so one
//! badly typed field is reported against that field (or that batch item)
//! rather than rejecting the whole event.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};

/// Heterogeneous key-value parameter bag.
pub type Params = serde_json::Map<String, Value>;

/// Operation name that switches the top-level entry into batch mode.
pub const BATCH_OPERATION: &str = "batch_operations";

/// Event handed over by the hosting platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<EventInput>,
}

impl GatewayEvent {
    /// Parse a raw platform event.
    pub fn from_value(event: &Value) -> Result<Self> {
        match event {
            Value::Object(_) => {}
            other => {
                return Err(AppError::malformed(format!(
                    "Invalid event: expected a JSON object, got {}",
                    json_type_name(other)
                )));
            }
        }
        match event.get("input") {
            None | Some(Value::Null) | Some(Value::Object(_)) => {}
            Some(other) => {
                return Err(AppError::malformed(format!(
                    "Invalid event: 'input' must be a JSON object, got {}",
                    json_type_name(other)
                )));
            }
        }
        GatewayEvent::deserialize(event)
            .map_err(|e| AppError::malformed(format!("Invalid event: {e}")))
    }

    pub fn single(operation: impl Into<String>, params: Params) -> Self {
        Self {
            input: Some(EventInput {
                operation: Some(Value::String(operation.into())),
                params: Some(Value::Object(params)),
                operations: None,
            }),
        }
    }

    pub fn batch(operations: Vec<BatchItem>) -> Self {
        Self {
            input: Some(EventInput {
                operation: Some(Value::String(BATCH_OPERATION.to_string())),
                params: None,
                operations: Some(Value::Array(
                    operations.into_iter().map(Value::from).collect(),
                )),
            }),
        }
    }
}

/// Body of the `input` field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,

    /// Batch items, only read when `operation` is `batch_operations`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operations: Option<Value>,
}

impl EventInput {
    /// Named operation; `None` when absent, null or blank.
    pub fn operation_name(&self) -> Result<Option<String>> {
        operation_from_value("'operation'", self.operation.as_ref())
    }

    /// Parameter bag; absent or null reads as empty.
    pub fn params(&self) -> Result<Params> {
        params_from_value("'params'", self.params.as_ref())
    }

    /// Raw batch entries; `None` when the list is absent or null.
    pub fn batch_items(&self) -> Result<Option<Vec<Value>>> {
        match &self.operations {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items.clone())),
            Some(other) => Err(AppError::malformed(format!(
                "'operations' must be a JSON array, got {}",
                json_type_name(other)
            ))),
        }
    }
}

/// One entry of a batch request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
}

impl BatchItem {
    pub fn new(operation: impl Into<String>, params: Params) -> Self {
        Self {
            operation: Some(operation.into()),
            params: Some(params),
        }
    }
}

impl From<BatchItem> for Value {
    fn from(item: BatchItem) -> Self {
        let mut entry = Params::new();
        if let Some(operation) = item.operation {
            entry.insert("operation".to_string(), Value::String(operation));
        }
        if let Some(params) = item.params {
            entry.insert("params".to_string(), Value::Object(params));
        }
        Value::Object(entry)
    }
}

/// One operation name plus its parameters, scoped to a single dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    pub operation: String,
    pub params: Params,
}

impl InvocationRequest {
    pub fn new(operation: impl Into<String>, params: Params) -> Self {
        Self {
            operation: operation.into(),
            params,
        }
    }
}

/// Read an operation name out of a raw field.
pub fn operation_from_value(field: &str, value: Option<&Value>) -> Result<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(name)) if name.trim().is_empty() => Ok(None),
        Some(Value::String(name)) => Ok(Some(name.clone())),
        Some(other) => Err(AppError::malformed(format!(
            "{field} must be a string, got {}",
            json_type_name(other)
        ))),
    }
}

/// Read a parameter bag out of a raw field.
pub fn params_from_value(field: &str, value: Option<&Value>) -> Result<Params> {
    match value {
        None | Some(Value::Null) => Ok(Params::new()),
        Some(Value::Object(params)) => Ok(params.clone()),
        Some(other) => Err(AppError::malformed(format!(
            "{field} must be a JSON object, got {}",
            json_type_name(other)
        ))),
    }
}

pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_event_defaults() {
        let event = GatewayEvent::from_value(&json!({})).unwrap();
        assert!(event.input.is_none());

        let event = GatewayEvent::from_value(&json!({ "input": {} })).unwrap();
        let input = event.input.unwrap();
        assert_eq!(input.operation_name().unwrap(), None);
        assert!(input.params().unwrap().is_empty());
        assert_eq!(input.batch_items().unwrap(), None);
    }

    #[test]
    fn test_event_with_batch() {
        let event = GatewayEvent::from_value(&json!({
            "input": {
                "operation": "batch_operations",
                "operations": [
                    { "operation": "crawl_url", "params": { "url": "https://example.com" } },
                    { "params": "not-an-object" },
                    7
                ]
            }
        }))
        .unwrap();

        let input = event.input.unwrap();
        assert_eq!(input.operation_name().unwrap().as_deref(), Some(BATCH_OPERATION));
        let items = input.batch_items().unwrap().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["operation"], "crawl_url");
    }

    #[test]
    fn test_badly_typed_fields_name_the_field() {
        let event = GatewayEvent::from_value(&json!({
            "input": { "operation": 7, "params": [1], "operations": "all" }
        }))
        .unwrap();
        let input = event.input.unwrap();

        let err = input.operation_name().unwrap_err();
        assert!(matches!(err, AppError::MalformedRequest(_)));
        assert!(err.to_string().contains("'operation' must be a string, got number"));

        let err = input.params().unwrap_err();
        assert!(err.to_string().contains("'params' must be a JSON object, got array"));

        let err = input.batch_items().unwrap_err();
        assert!(err.to_string().contains("'operations' must be a JSON array, got string"));
    }

    #[test]
    fn test_event_rejects_non_object_input() {
        let err = GatewayEvent::from_value(&json!({ "input": "crawl please" })).unwrap_err();
        assert!(err.to_string().contains("'input' must be a JSON object, got string"));

        let err = GatewayEvent::from_value(&json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("expected a JSON object, got array"));
    }

    #[test]
    fn test_blank_operation_reads_as_absent() {
        assert_eq!(operation_from_value("'operation'", Some(&json!("  "))).unwrap(), None);
        assert_eq!(
            operation_from_value("'operation'", Some(&json!("crawl_url"))).unwrap(),
            Some("crawl_url".to_string())
        );
    }

    #[test]
    fn test_batch_builder_round_trips_through_value() {
        let event = GatewayEvent::batch(vec![
            BatchItem::new("crawl_url", Params::new()),
            BatchItem::default(),
        ]);
        let items = event.input.unwrap().batch_items().unwrap().unwrap();
        assert_eq!(items[0], json!({ "operation": "crawl_url", "params": {} }));
        assert_eq!(items[1], json!({}));
    }
}

// src/models/envelope.rs

//! Outbound response shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, ErrorKind};

/// Outcome of exactly one dispatched operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub operation: String,

    pub success: bool,

    /// Opaque payload from the operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorKind>,

    /// Valid operation names, present on unknown-operation failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_operations: Option<Vec<String>>,
}

impl ResultEnvelope {
    pub fn completed(operation: impl Into<String>, result: Value) -> Self {
        Self {
            operation: operation.into(),
            success: true,
            result: Some(result),
            error: None,
            error_type: None,
            available_operations: None,
        }
    }

    pub fn failed(operation: impl Into<String>, error: &AppError) -> Self {
        let available_operations = match error {
            AppError::UnknownOperation { available, .. } => Some(available.clone()),
            _ => None,
        };
        Self {
            operation: operation.into(),
            success: false,
            result: None,
            error: Some(error.to_string()),
            error_type: Some(error.kind()),
            available_operations,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error_type
    }
}

/// Ordered outcomes of a batch request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEnvelope {
    /// The batch ran; per-item status lives in `batch_results`
    pub success: bool,
    pub batch_results: Vec<ResultEnvelope>,
    pub total_operations: usize,
}

impl BatchEnvelope {
    pub fn from_results(batch_results: Vec<ResultEnvelope>) -> Self {
        Self {
            success: true,
            total_operations: batch_results.len(),
            batch_results,
        }
    }

    pub fn failure_count(&self) -> usize {
        self.batch_results.iter().filter(|r| !r.success).count()
    }
}

/// Answer to a request that could not be used at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageGuidance {
    pub error: String,
    pub example: Value,
}

/// Everything the top-level entry point can answer with.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HandlerResponse {
    Single(ResultEnvelope),
    Batch(BatchEnvelope),
    Guidance(UsageGuidance),
}

impl HandlerResponse {
    pub fn to_value(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(value) => value,
            Err(e) => serde_json::json!({
                "success": false,
                "error": format!("Failed to serialize response: {e}"),
                "error_type": ErrorKind::BridgeFailure,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_completed_shape() {
        let envelope = ResultEnvelope::completed("crawl_url", json!({ "title": "Example" }));
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "operation": "crawl_url",
                "success": true,
                "result": { "title": "Example" }
            })
        );
    }

    #[test]
    fn test_failed_shape() {
        let error = AppError::shaping("crawl_url", "missing field `url`");
        let envelope = ResultEnvelope::failed("crawl_url", &error);
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "operation": "crawl_url",
                "success": false,
                "error": "Invalid parameters for crawl_url: missing field `url`",
                "error_type": "ParameterShapingError"
            })
        );
    }

    #[test]
    fn test_unknown_operation_carries_available_names() {
        let error = AppError::UnknownOperation {
            name: "fly".into(),
            available: vec!["crawl_url".into()],
        };
        let envelope = ResultEnvelope::failed("fly", &error);
        assert_eq!(envelope.error_kind(), Some(ErrorKind::UnknownOperation));
        assert_eq!(
            envelope.available_operations,
            Some(vec!["crawl_url".to_string()])
        );
    }

    #[test]
    fn test_batch_success_is_unconditional() {
        let error = AppError::malformed("no name");
        let batch = BatchEnvelope::from_results(vec![
            ResultEnvelope::failed("", &error),
            ResultEnvelope::failed("", &error),
        ]);
        assert!(batch.success);
        assert_eq!(batch.total_operations, 2);
        assert_eq!(batch.failure_count(), 2);
    }

    #[test]
    fn test_handler_response_is_untagged() {
        let guidance = HandlerResponse::Guidance(UsageGuidance {
            error: "No parameters provided".into(),
            example: json!({ "operation": "crawl_url" }),
        });
        assert_eq!(
            guidance.to_value(),
            json!({
                "error": "No parameters provided",
                "example": { "operation": "crawl_url" }
            })
        );
    }
}

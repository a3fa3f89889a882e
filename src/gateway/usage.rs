// src/gateway/usage.rs

//! Sample request payloads shown to callers.

use serde_json::{Value, json};

use crate::models::{BATCH_OPERATION, UsageGuidance};

/// Sample `input` bodies keyed by operation name.
pub fn examples() -> Vec<(&'static str, Value)> {
    vec![
        (
            "crawl_url",
            json!({
                "operation": "crawl_url",
                "params": {
                    "url": "https://example.com",
                    "generate_markdown": true,
                    "wait_for_js": false,
                    "timeout": 30
                }
            }),
        ),
        (
            "deep_crawl_site",
            json!({
                "operation": "deep_crawl_site",
                "params": {
                    "url": "https://docs.example.com",
                    "max_depth": 2,
                    "max_pages": 10,
                    "crawl_strategy": "bfs"
                }
            }),
        ),
        (
            "extract_youtube_transcript",
            json!({
                "operation": "extract_youtube_transcript",
                "params": {
                    "url": "https://www.youtube.com/watch?v=VIDEO_ID",
                    "languages": ["en"],
                    "include_timestamps": true
                }
            }),
        ),
        (
            "process_file",
            json!({
                "operation": "process_file",
                "params": {
                    "url": "https://example.com/document.pdf",
                    "max_size_mb": 50,
                    "include_metadata": true
                }
            }),
        ),
        (
            "search_and_crawl",
            json!({
                "operation": "search_and_crawl",
                "params": {
                    "search_query": "python machine learning tutorial",
                    "num_search_results": 5,
                    "crawl_top_results": 3
                }
            }),
        ),
        (
            BATCH_OPERATION,
            json!({
                "operation": BATCH_OPERATION,
                "operations": [
                    {
                        "operation": "crawl_url",
                        "params": { "url": "https://example1.com", "generate_markdown": true }
                    },
                    {
                        "operation": "crawl_url",
                        "params": { "url": "https://example2.com", "generate_markdown": true }
                    }
                ]
            }),
        ),
    ]
}

pub fn example(name: &str) -> Option<Value> {
    examples()
        .into_iter()
        .find(|(example, _)| *example == name)
        .map(|(_, value)| value)
}

/// Guidance for a request that carried no parameters.
pub fn missing_params() -> UsageGuidance {
    UsageGuidance {
        error: "No parameters provided".to_string(),
        example: json!({
            "operation": "crawl_url",
            "params": { "url": "https://example.com", "generate_markdown": true }
        }),
    }
}

/// Guidance for a batch request without an `operations` list.
pub fn missing_batch_items() -> UsageGuidance {
    UsageGuidance {
        error: "Batch requests need an 'operations' list".to_string(),
        example: example(BATCH_OPERATION).unwrap_or(Value::Null),
    }
}

/// Guidance for a batch request whose `operations` field is unusable.
pub fn malformed_batch(message: impl Into<String>) -> UsageGuidance {
    UsageGuidance {
        error: message.into(),
        example: missing_batch_items().example,
    }
}

/// Guidance for an event that could not be parsed.
pub fn invalid_event(message: impl Into<String>) -> UsageGuidance {
    UsageGuidance {
        error: message.into(),
        example: missing_params().example,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GatewayEvent, OperationName};

    #[test]
    fn test_every_example_parses_as_event() {
        for (name, body) in examples() {
            let event = GatewayEvent::from_value(&json!({ "input": body })).unwrap();
            let input = event.input.unwrap();
            assert_eq!(input.operation_name().unwrap().as_deref(), Some(name));
        }
    }

    #[test]
    fn test_examples_name_real_operations() {
        for (name, _) in examples() {
            assert!(name == BATCH_OPERATION || name.parse::<OperationName>().is_ok());
        }
    }

    #[test]
    fn test_guidance_payloads() {
        assert_eq!(missing_params().error, "No parameters provided");
        assert_eq!(missing_params().example["operation"], "crawl_url");
        assert_eq!(
            missing_batch_items().example["operations"]
                .as_array()
                .unwrap()
                .len(),
            2
        );
        assert!(example("nope").is_none());
    }
}

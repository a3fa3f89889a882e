// src/lambda/mod.rs

//! AWS Lambda handler for the gateway.
//!
//! The platform event is handed to [`Gateway::handle_event`] on a blocking
//! worker, so operations run on the bridge's offloaded path while the
//! Lambda runtime keeps its own scheduler.

use std::sync::Arc;
use std::time::Instant;

use lambda_runtime::{Error as LambdaError, LambdaEvent};
use serde_json::{Value, json};
use tracing::{error, info, instrument};

use crate::config::load_runtime_config;
use crate::error::{ErrorKind, Result};
use crate::gateway::Gateway;
use crate::logging::facade;

/// Build the gateway from the runtime configuration.
pub fn build_gateway() -> Result<Gateway> {
    let config = load_runtime_config()?;
    info!(
        "Gateway configured: default_operation={}, upstream={}",
        config.gateway.default_operation,
        config.upstream.endpoint.as_deref().unwrap_or("none")
    );
    Gateway::from_config(&config, facade())
}

/// Main Lambda handler function.
///
/// Always answers with a JSON body; failures are reported inside it.
#[instrument(skip(gateway, event))]
pub async fn handler(
    gateway: Arc<Gateway>,
    event: LambdaEvent<Value>,
) -> std::result::Result<Value, LambdaError> {
    let start = Instant::now();
    let (payload, context) = event.into_parts();
    info!("Received request {}", context.request_id);

    let response = match tokio::task::spawn_blocking(move || {
        gateway.handle_event(&payload).to_value()
    })
    .await
    {
        Ok(response) => response,
        Err(e) => {
            error!("Gateway worker failed: {}", e);
            bridge_failure(&e.to_string())
        }
    };

    info!(
        "Request {} answered in {}ms",
        context.request_id,
        start.elapsed().as_millis()
    );
    Ok(response)
}

fn bridge_failure(message: &str) -> Value {
    json!({
        "success": false,
        "error": format!("Execution bridge failure: {message}"),
        "error_type": ErrorKind::BridgeFailure,
    })
}

#[cfg(test)]
mod tests {
    use lambda_runtime::Context;

    use super::*;
    use crate::logging::MemoryLogger;
    use crate::models::Config;

    fn gateway() -> Arc<Gateway> {
        Arc::new(
            Gateway::from_config(&Config::default(), Arc::new(MemoryLogger::new())).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_empty_params_return_guidance() {
        let event = LambdaEvent::new(
            json!({ "input": { "operation": "crawl_url", "params": {} } }),
            Context::default(),
        );
        let body = handler(gateway(), event).await.unwrap();
        assert_eq!(body["error"], "No parameters provided");
        assert_eq!(body["example"]["operation"], "crawl_url");
    }

    #[tokio::test]
    async fn test_unknown_operation_is_reported_in_body() {
        let event = LambdaEvent::new(
            json!({ "input": { "operation": "teleport", "params": { "url": "x" } } }),
            Context::default(),
        );
        let body = handler(gateway(), event).await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error_type"], "UnknownOperation");
        assert!(body["available_operations"].as_array().unwrap().len() >= 13);
    }

    #[tokio::test]
    async fn test_upstream_only_operation_without_endpoint() {
        let event = LambdaEvent::new(
            json!({ "input": { "operation": "search_google", "params": { "query": "rust" } } }),
            Context::default(),
        );
        let body = handler(gateway(), event).await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error_type"], "OperationFailure");
    }

    #[test]
    fn test_bridge_failure_body() {
        let body = bridge_failure("worker lost");
        assert_eq!(body["success"], false);
        assert_eq!(body["error_type"], "BridgeFailure");
        assert!(body["error"].as_str().unwrap().ends_with("worker lost"));
    }
}

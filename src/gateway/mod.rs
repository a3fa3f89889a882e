// src/gateway/mod.rs

//! Dispatch gateway.
//!
//! Turns `{operation, params}` pairs into result envelopes. Lookup and
//! parameter shaping go through the [`OperationRegistry`], execution goes
//! through the [`ExecutionBridge`], and every failure is folded into the
//! envelope instead of escaping to the caller.

mod registry;
pub mod usage;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::bridge::ExecutionBridge;
use crate::error::{AppError, Result};
use crate::logging::Logger;
use crate::models::{
    BATCH_OPERATION, BatchEnvelope, Config, GatewayEvent, HandlerResponse, InvocationRequest,
    OperationName, ResultEnvelope, json_type_name, operation_from_value, params_from_value,
};
use crate::services::{CrawlTools, NativeTools};

pub use registry::{OperationEntry, OperationRegistry, ParamMode, WorkUnit};

#[derive(Clone)]
pub struct Gateway {
    registry: Arc<OperationRegistry>,
    bridge: ExecutionBridge,
    logger: Arc<dyn Logger>,
    default_operation: String,
    deadline: Option<Duration>,
}

impl Gateway {
    pub fn new(tools: Arc<dyn CrawlTools>, logger: Arc<dyn Logger>) -> Self {
        Self {
            registry: Arc::new(OperationRegistry::new(tools)),
            bridge: ExecutionBridge::new(Arc::clone(&logger)),
            logger,
            default_operation: OperationName::CrawlUrl.as_str().to_string(),
            deadline: None,
        }
    }

    /// Gateway over the native tools, configured from `config`.
    pub fn from_config(config: &Config, logger: Arc<dyn Logger>) -> Result<Self> {
        let tools = NativeTools::new(config)?;
        let bridge = ExecutionBridge::new(Arc::clone(&logger))
            .with_teardown_grace(config.gateway.teardown_grace());
        Ok(Self::new(Arc::new(tools), logger)
            .with_bridge(bridge)
            .with_default_operation(config.gateway.default_operation.clone())
            .with_deadline(config.gateway.operation_deadline()))
    }

    pub fn with_bridge(mut self, bridge: ExecutionBridge) -> Self {
        self.bridge = bridge;
        self
    }

    /// Operation used when an event names none.
    pub fn with_default_operation(mut self, operation: impl Into<String>) -> Self {
        self.default_operation = operation.into();
        self
    }

    /// Deadline applied to every operation.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn bridge(&self) -> &ExecutionBridge {
        &self.bridge
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Names accepted by [`Gateway::dispatch`].
    pub fn operations(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Run one operation and report its outcome.
    pub fn dispatch(&self, request: InvocationRequest) -> ResultEnvelope {
        let InvocationRequest { operation, params } = request;
        self.logger.info(&format!("Dispatching {operation}"));

        let outcome = self.registry.prepare(&operation, params).and_then(|work| {
            self.bridge
                .run_to_completion(work, self.deadline)
                .map_err(AppError::from)
        });

        match outcome {
            Ok(result) => ResultEnvelope::completed(operation, result),
            Err(error) => {
                self.logger
                    .error(&format!("Operation {operation} failed: {error}"));
                ResultEnvelope::failed(operation, &error)
            }
        }
    }

    /// Run each raw batch entry in order.
    ///
    /// Every entry yields exactly one envelope. An entry that cannot be
    /// shaped into a request fails on its own without stopping the batch.
    pub fn dispatch_batch(&self, items: Vec<Value>) -> BatchEnvelope {
        self.logger
            .info(&format!("Processing batch of {} operations", items.len()));

        let results = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match batch_request(index, &item) {
                Ok(request) => self.dispatch(request),
                Err((operation, error)) => {
                    self.logger.warn(&error.to_string());
                    ResultEnvelope::failed(operation, &error)
                }
            })
            .collect();

        let batch = BatchEnvelope::from_results(results);
        self.logger.info(&format!(
            "Batch finished: {} of {} operations failed",
            batch.failure_count(),
            batch.total_operations
        ));
        batch
    }

    /// Top-level entry point for a raw platform event.
    pub fn handle_event(&self, event: &Value) -> HandlerResponse {
        let event = match GatewayEvent::from_value(event) {
            Ok(event) => event,
            Err(error) => {
                self.logger.warn(&error.to_string());
                return HandlerResponse::Guidance(usage::invalid_event(error.to_string()));
            }
        };
        let input = event.input.unwrap_or_default();
        let operation = match input.operation_name() {
            Ok(name) => name.unwrap_or_else(|| self.default_operation.clone()),
            Err(error) => {
                self.logger.warn(&error.to_string());
                return HandlerResponse::Guidance(usage::invalid_event(error.to_string()));
            }
        };

        if operation == BATCH_OPERATION {
            return match input.batch_items() {
                Ok(Some(items)) => HandlerResponse::Batch(self.dispatch_batch(items)),
                Ok(None) => HandlerResponse::Guidance(usage::missing_batch_items()),
                Err(error) => {
                    self.logger.warn(&error.to_string());
                    HandlerResponse::Guidance(usage::malformed_batch(error.to_string()))
                }
            };
        }

        let params = match input.params() {
            Ok(params) => params,
            Err(error) => {
                self.logger
                    .error(&format!("Operation {operation} failed: {error}"));
                return HandlerResponse::Single(ResultEnvelope::failed(operation, &error));
            }
        };
        if params.is_empty() {
            self.logger
                .warn(&format!("Request for {operation} carried no parameters"));
            return HandlerResponse::Guidance(usage::missing_params());
        }
        HandlerResponse::Single(self.dispatch(InvocationRequest::new(operation, params)))
    }
}

/// Shape one raw batch entry into a request.
///
/// On failure, returns the operation name to report (empty when unknown)
/// with the error for that entry alone.
fn batch_request(
    index: usize,
    item: &Value,
) -> std::result::Result<InvocationRequest, (String, AppError)> {
    let Value::Object(entry) = item else {
        return Err((
            String::new(),
            AppError::malformed(format!(
                "Batch item {index} must be a JSON object, got {}",
                json_type_name(item)
            )),
        ));
    };

    let field = format!("Batch item {index}: 'operation'");
    let operation = match operation_from_value(&field, entry.get("operation")) {
        Ok(Some(operation)) => operation,
        Ok(None) => {
            return Err((
                String::new(),
                AppError::malformed(format!("Batch item {index} is missing an operation name")),
            ));
        }
        Err(error) => return Err((String::new(), error)),
    };

    match params_from_value("'params'", entry.get("params")) {
        Ok(params) => Ok(InvocationRequest::new(operation, params)),
        Err(error) => {
            let error = AppError::shaping(operation.as_str(), error_detail(&error));
            Err((operation, error))
        }
    }
}

fn error_detail(error: &AppError) -> String {
    match error {
        AppError::MalformedRequest(message) => message.clone(),
        other => other.to_string(),
    }
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("registry", &self.registry)
            .field("bridge", &self.bridge)
            .field("default_operation", &self.default_operation)
            .field("deadline", &self.deadline)
            .finish()
    }
}

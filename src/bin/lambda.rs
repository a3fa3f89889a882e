//! AWS Lambda entry point for the crawl gateway.
//!
//! Deploy with `cargo lambda build --release --features lambda`.

use std::sync::Arc;

use lambda_runtime::{Error as LambdaError, LambdaEvent, service_fn};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crawl_gateway::lambda::{build_gateway, handler};

/// Main entry point for the AWS Lambda function.
#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Crawl gateway starting...");
    let gateway = Arc::new(build_gateway()?);
    info!("Registered operations: {}", gateway.operations().join(", "));

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let gateway = Arc::clone(&gateway);
        async move { handler(gateway, event).await }
    }))
    .await
}

// src/models/mod.rs

//! Domain models for the gateway.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod envelope;
mod event;
mod operation;
mod requests;
mod responses;

// Re-export all public types
pub use config::{Config, CrawlerConfig, GatewaySettings, UpstreamConfig};
pub use envelope::{BatchEnvelope, HandlerResponse, ResultEnvelope, UsageGuidance};
pub use event::{
    BATCH_OPERATION, BatchItem, EventInput, GatewayEvent, InvocationRequest, Params,
    json_type_name, operation_from_value, params_from_value,
};
pub use operation::{OperationName, UnknownOperationName};
pub use requests::{
    BatchCrawlArgs, CrawlRequest, CrawlStrategy, DeepCrawlArgs, ExtractEntitiesArgs,
    FileProcessRequest, GoogleBatchSearchRequest, GoogleSearchRequest, IntelligentExtractArgs,
    SearchAndCrawlArgs, StructuredExtractionRequest,
};
pub use responses::{
    CrawlResponse, EntityGroup, EntityMatch, EntityMetadata, EntityReport, MediaItem,
    PageSummary, SearchAndCrawlReport, SiteMap,
};

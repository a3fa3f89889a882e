//! Service layer: the operations exposed through the gateway.
//!
//! This module contains:
//! - The `CrawlTools` trait, one async method per operation
//! - Native page operations over HTTP (`NativeTools`)
//! - A client for an upstream tool server (`RemoteTools`)
//! - HTML page analysis (`PageSnapshot`) and entity patterns

mod entities;
mod native;
mod page;
mod remote;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::models::{
    BatchCrawlArgs, CrawlRequest, CrawlResponse, DeepCrawlArgs, EntityReport,
    ExtractEntitiesArgs, FileProcessRequest, GoogleBatchSearchRequest, GoogleSearchRequest,
    IntelligentExtractArgs, Params, SearchAndCrawlArgs, SearchAndCrawlReport, SiteMap,
    StructuredExtractionRequest,
};

pub use entities::{BUILTIN_ENTITY_TYPES, EntityExtractor};
pub use native::NativeTools;
pub use page::{PageSnapshot, select_fields};
pub use remote::RemoteTools;

/// The operations the gateway dispatches to.
#[async_trait]
pub trait CrawlTools: Send + Sync {
    async fn crawl_url(&self, request: CrawlRequest) -> Result<CrawlResponse>;

    async fn crawl_url_with_fallback(&self, request: CrawlRequest) -> Result<CrawlResponse>;

    async fn deep_crawl_site(&self, args: DeepCrawlArgs) -> Result<SiteMap>;

    async fn intelligent_extract(&self, args: IntelligentExtractArgs) -> Result<Value>;

    async fn extract_entities(&self, args: ExtractEntitiesArgs) -> Result<EntityReport>;

    async fn extract_structured_data(
        &self,
        request: StructuredExtractionRequest,
    ) -> Result<CrawlResponse>;

    async fn process_file(&self, request: FileProcessRequest) -> Result<Value>;

    async fn extract_youtube_transcript(&self, params: Params) -> Result<Value>;

    async fn batch_extract_youtube_transcripts(&self, params: Params) -> Result<Value>;

    async fn search_google(&self, request: GoogleSearchRequest) -> Result<Value>;

    async fn batch_search_google(&self, request: GoogleBatchSearchRequest) -> Result<Value>;

    async fn search_and_crawl(&self, args: SearchAndCrawlArgs) -> Result<SearchAndCrawlReport>;

    async fn batch_crawl(&self, args: BatchCrawlArgs) -> Result<Vec<CrawlResponse>>;
}

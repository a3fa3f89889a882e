// src/models/responses.rs

//! Result payloads produced by the native operations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A media reference found on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// image, video or audio
    pub kind: String,
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// Response model for crawling operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlResponse {
    pub success: bool,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub markdown: Option<String>,
    #[serde(default)]
    pub media: Option<Vec<MediaItem>>,
    #[serde(default)]
    pub screenshot: Option<String>,
    #[serde(default)]
    pub extracted_data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl CrawlResponse {
    pub fn failure(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            url: url.into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// One page visited by a deep crawl.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSummary {
    pub url: String,
    pub title: String,
    pub depth: u32,
    pub content_length: usize,
    pub links_found: usize,
    pub content_preview: String,
    pub markdown_preview: String,
    /// SHA-256 of the page text, hex encoded
    pub content_hash: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<MediaItem>,
}

/// Result of `deep_crawl_site`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteMap {
    pub success: bool,
    pub starting_url: String,
    pub strategy_used: String,
    pub total_pages_crawled: usize,
    pub pages: Vec<PageSummary>,
    /// Path prefix → URLs visited under it
    pub site_structure: BTreeMap<String, Vec<String>>,
    pub content_summary: String,
    /// Pages skipped because their text duplicated an earlier page
    pub duplicates_skipped: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SiteMap {
    pub fn failure(url: impl Into<String>, strategy: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            starting_url: url.into(),
            strategy_used: strategy.to_string(),
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// One entity occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMatch {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

/// Matches for one entity type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityGroup {
    pub count: usize,
    pub entities: Vec<EntityMatch>,
}

/// Metadata attached to an entity report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub title: Option<String>,
    pub content_length: usize,
    pub deduplicated: bool,
    pub context_included: bool,
}

/// Result of `extract_entities`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityReport {
    pub url: String,
    pub success: bool,
    pub entity_types_requested: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_entities_found: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<BTreeMap<String, EntityGroup>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EntityMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_types: Option<Vec<String>>,
}

impl EntityReport {
    pub fn failure(url: impl Into<String>, requested: Vec<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            success: false,
            entity_types_requested: requested,
            total_entities_found: None,
            entities: None,
            metadata: None,
            error: Some(error.into()),
            available_types: None,
        }
    }
}

/// Result of `search_and_crawl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchAndCrawlReport {
    pub success: bool,
    pub search_query: String,
    pub search_results: Value,
    pub crawled_pages: Vec<CrawlResponse>,
    pub total_crawled: usize,
}

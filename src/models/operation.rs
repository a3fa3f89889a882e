// src/models/operation.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Name of an operation exposed through the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationName {
    CrawlUrl,
    CrawlUrlWithFallback,
    DeepCrawlSite,
    IntelligentExtract,
    ExtractEntities,
    ExtractStructuredData,
    ProcessFile,
    ExtractYoutubeTranscript,
    BatchExtractYoutubeTranscripts,
    SearchGoogle,
    BatchSearchGoogle,
    SearchAndCrawl,
    BatchCrawl,
}

impl OperationName {
    /// Every operation, in the order they are advertised to callers.
    pub const ALL: [OperationName; 13] = [
        OperationName::CrawlUrl,
        OperationName::CrawlUrlWithFallback,
        OperationName::DeepCrawlSite,
        OperationName::IntelligentExtract,
        OperationName::ExtractEntities,
        OperationName::ExtractStructuredData,
        OperationName::ProcessFile,
        OperationName::ExtractYoutubeTranscript,
        OperationName::BatchExtractYoutubeTranscripts,
        OperationName::SearchGoogle,
        OperationName::BatchSearchGoogle,
        OperationName::SearchAndCrawl,
        OperationName::BatchCrawl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationName::CrawlUrl => "crawl_url",
            OperationName::CrawlUrlWithFallback => "crawl_url_with_fallback",
            OperationName::DeepCrawlSite => "deep_crawl_site",
            OperationName::IntelligentExtract => "intelligent_extract",
            OperationName::ExtractEntities => "extract_entities",
            OperationName::ExtractStructuredData => "extract_structured_data",
            OperationName::ProcessFile => "process_file",
            OperationName::ExtractYoutubeTranscript => "extract_youtube_transcript",
            OperationName::BatchExtractYoutubeTranscripts => "batch_extract_youtube_transcripts",
            OperationName::SearchGoogle => "search_google",
            OperationName::BatchSearchGoogle => "batch_search_google",
            OperationName::SearchAndCrawl => "search_and_crawl",
            OperationName::BatchCrawl => "batch_crawl",
        }
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOperationName(pub String);

impl fmt::Display for UnknownOperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown operation name '{}'", self.0)
    }
}

impl std::error::Error for UnknownOperationName {}

impl FromStr for OperationName {
    type Err = UnknownOperationName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownOperationName(s.to_string()))
    }
}

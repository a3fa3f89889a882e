// src/services/entities.rs

//! Pattern-based entity extraction.

use std::collections::{BTreeMap, HashSet};

use regex::Regex;

use crate::error::Result;
use crate::models::{EntityGroup, EntityMatch};

/// Characters of surrounding text kept on each side of a match.
const CONTEXT_RADIUS: usize = 40;

/// Built-in entity types and their patterns.
const CATALOG: &[(&str, &str)] = &[
    ("emails", r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b"),
    ("phones", r"(\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}"),
    (
        "urls",
        r"https?://(?:[-\w.])+(?:[:\d]+)?(?:/(?:[\w/_.])*(?:\?(?:[\w&=%.])*)?(?:#(?:[\w.])*)?)?",
    ),
    (
        "dates",
        r"\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b|\b\d{4}[/-]\d{1,2}[/-]\d{1,2}\b",
    ),
    ("ips", r"\b(?:\d{1,3}\.){3}\d{1,3}\b"),
    ("social_media", r"@[A-Za-z0-9_]+|#[A-Za-z0-9_]+"),
    ("prices", r"\$\d+(?:\.\d{2})?|\d+(?:\.\d{2})?\s*(?:USD|EUR|GBP|JPY)"),
    ("credit_cards", r"\b(?:\d{4}[-\s]?){3}\d{4}\b"),
    (
        "coordinates",
        r"[-+]?(?:[1-8]?\d(?:\.\d+)?|90(?:\.0+)?),\s*[-+]?(?:180(?:\.0+)?|(?:1[0-7]\d|[1-9]?\d)(?:\.\d+)?)",
    ),
];

/// Names of the built-in entity types.
pub const BUILTIN_ENTITY_TYPES: [&str; 9] = [
    "emails",
    "phones",
    "urls",
    "dates",
    "ips",
    "social_media",
    "prices",
    "credit_cards",
    "coordinates",
];

/// Compiled entity patterns.
#[derive(Debug, Clone)]
pub struct EntityExtractor {
    builtin: BTreeMap<&'static str, Regex>,
}

impl EntityExtractor {
    pub fn new() -> Result<Self> {
        let builtin = CATALOG
            .iter()
            .map(|(name, pattern)| -> Result<(&'static str, Regex)> {
                Ok((*name, Regex::new(pattern)?))
            })
            .collect::<Result<_>>()?;
        Ok(Self { builtin })
    }

    pub fn available_types(&self) -> Vec<String> {
        BUILTIN_ENTITY_TYPES.iter().map(|t| t.to_string()).collect()
    }

    /// Resolve requested types plus custom patterns into the set to run.
    ///
    /// Unknown built-in names are skipped. Custom patterns that fail to
    /// compile are errors.
    pub fn patterns(
        &self,
        requested: &[String],
        custom: Option<&BTreeMap<String, String>>,
    ) -> Result<Vec<(String, Regex)>> {
        let mut patterns: Vec<(String, Regex)> = requested
            .iter()
            .filter_map(|name| {
                let key = name.trim().to_lowercase();
                self.builtin.get(key.as_str()).map(|re| (key, re.clone()))
            })
            .collect();

        for (name, pattern) in custom.into_iter().flatten() {
            patterns.push((name.clone(), Regex::new(pattern)?));
        }
        Ok(patterns)
    }

    /// Run `patterns` over `text`.
    pub fn extract(
        &self,
        text: &str,
        patterns: &[(String, Regex)],
        deduplicate: bool,
        include_context: bool,
    ) -> BTreeMap<String, EntityGroup> {
        let mut groups = BTreeMap::new();
        for (name, re) in patterns {
            let mut seen: HashSet<&str> = HashSet::new();
            let mut entities = Vec::new();
            for m in re.find_iter(text) {
                let value = m.as_str().trim();
                if value.is_empty() {
                    continue;
                }
                if deduplicate && !seen.insert(value) {
                    continue;
                }
                entities.push(EntityMatch {
                    value: value.to_string(),
                    context: include_context.then(|| context_window(text, m.start(), m.end())),
                    position: include_context.then_some(m.start()),
                });
            }
            groups.insert(
                name.clone(),
                EntityGroup {
                    count: entities.len(),
                    entities,
                },
            );
        }
        groups
    }
}

/// Text around `start..end`, widened by `CONTEXT_RADIUS` chars each side.
fn context_window(text: &str, start: usize, end: usize) -> String {
    let from = text[..start]
        .char_indices()
        .rev()
        .nth(CONTEXT_RADIUS - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let to = text[end..]
        .char_indices()
        .nth(CONTEXT_RADIUS)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());
    text[from..to].trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> EntityExtractor {
        EntityExtractor::new().unwrap()
    }

    fn types(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_catalog_matches_type_list() {
        let names: Vec<&str> = CATALOG.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, BUILTIN_ENTITY_TYPES.to_vec());
        assert_eq!(extractor().available_types().len(), 9);
    }

    #[test]
    fn test_emails_with_dedupe() {
        let ex = extractor();
        let patterns = ex.patterns(&types(&["emails"]), None).unwrap();
        let text = "Write to sales@example.com or support@example.org. Again: sales@example.com";

        let groups = ex.extract(text, &patterns, true, false);
        let emails = &groups["emails"];
        assert_eq!(emails.count, 2);
        assert_eq!(emails.entities[0].value, "sales@example.com");
        assert!(emails.entities[0].context.is_none());

        let all = ex.extract(text, &patterns, false, false);
        assert_eq!(all["emails"].count, 3);
    }

    #[test]
    fn test_context_and_position() {
        let ex = extractor();
        let patterns = ex.patterns(&types(&["ips"]), None).unwrap();
        let text = "server at 10.0.0.1 responded";
        let groups = ex.extract(text, &patterns, true, true);
        let hit = &groups["ips"].entities[0];
        assert_eq!(hit.value, "10.0.0.1");
        assert_eq!(hit.position, Some(10));
        assert_eq!(hit.context.as_deref(), Some(text));
    }

    #[test]
    fn test_context_window_is_char_safe() {
        let prefix = "é".repeat(60);
        let text = format!("{prefix} 192.168.1.1 {prefix}");
        let start = text.find("192").unwrap();
        let window = context_window(&text, start, start + "192.168.1.1".len());
        assert!(window.contains("192.168.1.1"));
        assert!(window.chars().count() <= 2 * CONTEXT_RADIUS + "192.168.1.1".len());
    }

    #[test]
    fn test_unknown_types_are_skipped() {
        let ex = extractor();
        let patterns = ex.patterns(&types(&["bogus", "PRICES"]), None).unwrap();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].0, "prices");

        let groups = ex.extract("Only $19.99 or 20 EUR", &patterns, true, false);
        let values: Vec<&str> = groups["prices"]
            .entities
            .iter()
            .map(|e| e.value.as_str())
            .collect();
        assert_eq!(values, vec!["$19.99", "20 EUR"]);
    }

    #[test]
    fn test_custom_patterns() {
        let ex = extractor();
        let custom = BTreeMap::from([("tickets".to_string(), r"TKT-\d+".to_string())]);
        let patterns = ex.patterns(&[], Some(&custom)).unwrap();
        let groups = ex.extract("See TKT-42 and TKT-7", &patterns, true, false);
        assert_eq!(groups["tickets"].count, 2);
    }

    #[test]
    fn test_invalid_custom_pattern_is_error() {
        let ex = extractor();
        let custom = BTreeMap::from([("broken".to_string(), "(unclosed".to_string())]);
        assert!(ex.patterns(&[], Some(&custom)).is_err());
    }

    #[test]
    fn test_empty_group_is_reported() {
        let ex = extractor();
        let patterns = ex.patterns(&types(&["coordinates"]), None).unwrap();
        let groups = ex.extract("nothing here", &patterns, true, true);
        assert_eq!(groups["coordinates"], EntityGroup::default());
    }
}

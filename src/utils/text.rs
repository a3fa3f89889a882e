// src/utils/text.rs

//! Text shaping helpers: whitespace cleanup, previews, content filters and
//! chunking.

use unicode_segmentation::UnicodeSegmentation;

/// Paragraphs shorter than this are dropped by the pruning filter.
const PRUNING_MIN_WORDS: usize = 5;

/// Collapse runs of whitespace into single spaces.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `max_chars` graphemes of `text`, with "..." appended when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut graphemes = text.graphemes(true);
    let head: String = graphemes.by_ref().take(max_chars).collect();
    if graphemes.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Split text into paragraphs separated by blank lines.
pub fn paragraphs(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    let mut end = 0;
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim().is_empty() {
            if let Some(s) = start.take() {
                out.push(text[s..end].trim());
            }
        } else {
            start.get_or_insert(offset);
            end = offset + line.len();
        }
        offset += line.len();
    }
    if let Some(s) = start {
        out.push(text[s..end].trim());
    }
    out
}

/// Apply a named content filter.
///
/// `bm25` keeps paragraphs mentioning a query term, `pruning` drops short
/// boilerplate paragraphs. Filters that would remove everything, and
/// unknown filters, leave the text untouched.
pub fn filter_content(text: &str, filter: &str, query: Option<&str>) -> String {
    let kept: Vec<&str> = match filter {
        "bm25" => {
            let terms: Vec<String> = query
                .unwrap_or_default()
                .unicode_words()
                .map(str::to_lowercase)
                .collect();
            if terms.is_empty() {
                return text.to_string();
            }
            paragraphs(text)
                .into_iter()
                .filter(|p| {
                    let lower = p.to_lowercase();
                    terms.iter().any(|term| lower.contains(term.as_str()))
                })
                .collect()
        }
        "pruning" => paragraphs(text)
            .into_iter()
            .filter(|p| p.split_whitespace().count() >= PRUNING_MIN_WORDS)
            .collect(),
        _ => return text.to_string(),
    };

    if kept.is_empty() {
        text.to_string()
    } else {
        kept.join("\n\n")
    }
}

fn split_units<'a>(text: &'a str, strategy: &str) -> Vec<&'a str> {
    match strategy {
        "sentence" => text.unicode_sentences().collect(),
        "regex" => paragraphs(text),
        _ => {
            // Topic sections start at markdown headings.
            let mut sections = Vec::new();
            let mut start = 0;
            let mut offset = 0;
            for line in text.split_inclusive('\n') {
                if line.trim_start().starts_with('#') && offset > start {
                    sections.push(&text[start..offset]);
                    start = offset;
                }
                offset += line.len();
            }
            sections.push(&text[start..]);
            sections
        }
    }
}

fn flush<'a>(chunks: &mut Vec<String>, current: &mut Vec<&'a str>, overlap: usize) {
    chunks.push(current.join(" "));
    let keep = overlap.min(current.len());
    let tail = current.split_off(current.len() - keep);
    *current = tail;
}

/// Split `text` into chunks of at most `chunk_size` words.
///
/// Chunks break at unit boundaries (`sentence`, `regex` paragraphs, or
/// `topic` sections) when they can. Consecutive chunks share the last
/// `chunk_size * overlap_rate` words of the previous one.
pub fn chunk(text: &str, strategy: &str, chunk_size: usize, overlap_rate: f64) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let overlap = (chunk_size as f64 * overlap_rate.clamp(0.0, 0.9)) as usize;

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut fresh = 0usize;

    for unit in split_units(text, strategy) {
        let words: Vec<&str> = unit.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }
        if fresh > 0 && current.len() + words.len() > chunk_size {
            flush(&mut chunks, &mut current, overlap);
            fresh = 0;
        }
        for word in words {
            if fresh > 0 && current.len() >= chunk_size {
                flush(&mut chunks, &mut current, overlap);
                fresh = 0;
            }
            current.push(word);
            fresh += 1;
        }
    }
    if fresh > 0 {
        chunks.push(current.join(" "));
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\t b  c "), "a b c");
    }

    #[test]
    fn test_preview_is_char_safe() {
        assert_eq!(preview("short", 200), "short");
        assert_eq!(preview("héllo wörld", 5), "héllo...");
        assert_eq!(preview("日本語のテキスト", 3), "日本語...");
    }

    #[test]
    fn test_paragraphs() {
        let text = "first\n\n  \nsecond line\nstill second\n\nthird";
        assert_eq!(
            paragraphs(text),
            vec!["first", "second line\nstill second", "third"]
        );
    }

    #[test]
    fn test_bm25_filter_keeps_matching_paragraphs() {
        let text = "Rust ownership rules\n\nCooking pasta\n\nThe borrow checker and OWNERSHIP";
        let filtered = filter_content(text, "bm25", Some("ownership"));
        assert_eq!(
            filtered,
            "Rust ownership rules\n\nThe borrow checker and OWNERSHIP"
        );
    }

    #[test]
    fn test_filter_keeps_text_when_nothing_matches() {
        let text = "alpha\n\nbeta";
        assert_eq!(filter_content(text, "bm25", Some("gamma")), text);
        assert_eq!(filter_content(text, "bm25", None), text);
        assert_eq!(filter_content(text, "llm", Some("alpha")), text);
    }

    #[test]
    fn test_pruning_filter() {
        let text = "Menu\n\nThis paragraph has plenty of words in it\n\nFooter";
        assert_eq!(
            filter_content(text, "pruning", None),
            "This paragraph has plenty of words in it"
        );
    }

    #[test]
    fn test_chunk_respects_size_and_overlap() {
        let text = (1..=25).map(|n| format!("w{n}")).collect::<Vec<_>>().join(" ");
        let chunks = chunk(&text, "regex", 10, 0.2);
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].starts_with("w1 "));
        assert!(chunks[0].ends_with("w10"));
        // Two words carried over from the previous chunk.
        assert!(chunks[1].starts_with("w9 w10 w11"));
        for c in &chunks {
            assert!(c.split_whitespace().count() <= 10);
        }
    }

    #[test]
    fn test_chunk_breaks_at_paragraphs() {
        let text = "one two three\n\nfour five six\n\nseven";
        let chunks = chunk(text, "regex", 6, 0.0);
        assert_eq!(chunks, vec!["one two three four five six", "seven"]);

        let chunks = chunk(text, "regex", 4, 0.0);
        assert_eq!(chunks, vec!["one two three", "four five six seven"]);
    }

    #[test]
    fn test_chunk_by_topic_sections() {
        let text = "# Intro\nhello there\n# Usage\nrun it";
        let chunks = chunk(text, "topic", 4, 0.0);
        assert_eq!(chunks, vec!["# Intro hello there", "# Usage run it"]);
    }

    #[test]
    fn test_chunk_empty_text() {
        assert!(chunk("", "sentence", 100, 0.1).is_empty());
    }
}

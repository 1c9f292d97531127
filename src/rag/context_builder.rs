//! Formatting of retrieved chunks into prompt context and citation lines.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::store::ChunkHit;

/// A `(source, page)` pair shown to the customer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Citation {
    pub source: Option<String>,
    pub page: Option<u32>,
}

impl From<&ChunkHit> for Citation {
    fn from(hit: &ChunkHit) -> Self {
        Self {
            source: Some(hit.chunk.source.clone()),
            page: hit.chunk.page,
        }
    }
}

/// True when the closest hit is within `threshold` cosine distance.
///
/// Expects `hits` sorted ascending by distance.
pub fn is_answer_found(hits: &[ChunkHit], threshold: f32) -> bool {
    hits.first()
        .map(|best| best.distance <= threshold)
        .unwrap_or(false)
}

/// Numbered context blocks: `[1] SOURCE: manual.pdf p.3` followed by the chunk text.
pub fn build_context(hits: &[ChunkHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            let cite = match hit.chunk.page {
                Some(page) => format!("{} p.{}", hit.chunk.source, page),
                None => hit.chunk.source.clone(),
            };
            format!("[{}] SOURCE: {}\n{}", i + 1, cite, hit.chunk.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// `Sources: a.pdf (page 1), b.pdf (page 4)` with duplicates removed, or an
/// empty string when there is nothing to cite.
pub fn format_citations(citations: &[Citation]) -> String {
    let mut seen = HashSet::new();
    let items: Vec<String> = citations
        .iter()
        .filter(|citation| seen.insert((citation.source.clone(), citation.page)))
        .map(|citation| {
            let source = citation.source.as_deref().unwrap_or("unknown");
            let page = citation
                .page
                .map(|p| p.to_string())
                .unwrap_or_else(|| "?".to_string());
            format!("{} (page {})", source, page)
        })
        .collect();

    if items.is_empty() {
        return String::new();
    }
    format!("Sources: {}", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::store::StoredChunk;

    fn hit(source: &str, page: Option<u32>, text: &str, distance: f32) -> ChunkHit {
        ChunkHit {
            chunk: StoredChunk {
                chunk_id: format!("{source}-{text}"),
                content: text.to_string(),
                source: source.to_string(),
                page,
            },
            distance,
        }
    }

    fn citation(source: &str, page: u32) -> Citation {
        Citation {
            source: Some(source.to_string()),
            page: Some(page),
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        let hits = vec![hit("a.pdf", Some(1), "x", 0.35), hit("a.pdf", Some(2), "y", 0.9)];
        assert!(is_answer_found(&hits, 0.35));
        assert!(!is_answer_found(&hits, 0.34));
        assert!(!is_answer_found(&[], 0.35));
    }

    #[test]
    fn context_numbers_blocks_and_handles_missing_page() {
        let hits = vec![
            hit("manual.pdf", Some(3), "Use a CR2032 battery.", 0.1),
            hit("notes.pdf", None, "Keep the fob dry.", 0.2),
        ];

        assert_eq!(
            build_context(&hits),
            "[1] SOURCE: manual.pdf p.3\nUse a CR2032 battery.\n\n[2] SOURCE: notes.pdf\nKeep the fob dry."
        );
        assert_eq!(build_context(&[]), "");
    }

    #[test]
    fn citations_are_deduplicated_in_order() {
        let citations = vec![
            citation("b.pdf", 2),
            citation("a.pdf", 1),
            citation("b.pdf", 2),
            Citation { source: None, page: None },
        ];

        assert_eq!(
            format_citations(&citations),
            "Sources: b.pdf (page 2), a.pdf (page 1), unknown (page ?)"
        );
        assert_eq!(format_citations(&[]), "");
    }
}

use std::sync::Arc;

use tiktoken_rs::CoreBPE;

use crate::core::errors::ApiError;

/// Multi-byte characters span at most this many BPE tokens at a window edge.
const MAX_EDGE_TRIM: usize = 3;

/// Splits text into overlapping windows of `cl100k_base` tokens.
#[derive(Clone)]
pub struct TokenChunker {
    bpe: Arc<CoreBPE>,
    max_tokens: usize,
    overlap: usize,
}

impl TokenChunker {
    pub fn new(max_tokens: usize, overlap: usize) -> Result<Self, ApiError> {
        if max_tokens == 0 || overlap >= max_tokens {
            return Err(ApiError::BadRequest(format!(
                "Chunk overlap ({}) must be smaller than the window ({})",
                overlap, max_tokens
            )));
        }

        let bpe = tiktoken_rs::cl100k_base().map_err(ApiError::internal)?;
        Ok(Self {
            bpe: Arc::new(bpe),
            max_tokens,
            overlap,
        })
    }

    pub fn step(&self) -> usize {
        self.max_tokens - self.overlap
    }

    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Windows start every `max_tokens - overlap` tokens until the text is exhausted,
    /// so the last `overlap` tokens of one chunk open the next.
    pub fn split(&self, text: &str) -> Vec<String> {
        let tokens = self.bpe.encode_ordinary(text);
        let step = self.step();

        // Narrow the window until both edges fall on character boundaries.
        let decode = |start: usize, end: usize| {
            for trim_start in 0..=MAX_EDGE_TRIM {
                for trim_end in 0..=MAX_EDGE_TRIM {
                    let from = start + trim_start;
                    let to = end.saturating_sub(trim_end);
                    if from >= to {
                        continue;
                    }
                    if let Ok(text) = self.bpe.decode(tokens[from..to].to_vec()) {
                        return Some(text);
                    }
                }
            }
            None
        };

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < tokens.len() {
            let end = (start + self.max_tokens).min(tokens.len());
            match decode(start, end) {
                Some(chunk) => chunks.push(chunk),
                None => tracing::warn!("Skipping undecodable token window {}..{}", start, end),
            }
            start += step;
        }

        chunks
    }
}

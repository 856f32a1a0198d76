//! Word-based text splitter for resume ingestion. Targets 500-word chunks
//! with a 200-word minimum and 10% overlap between neighbours, so retrieval
//! never loses context that straddles a chunk boundary.

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_MIN_CHUNK_SIZE: usize = 200;
pub const DEFAULT_OVERLAP_PERCENT: usize = 10;

#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    min_chunk_size: usize,
    overlap: usize,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(
            DEFAULT_CHUNK_SIZE,
            DEFAULT_MIN_CHUNK_SIZE,
            DEFAULT_OVERLAP_PERCENT,
        )
    }
}

impl TextSplitter {
    pub fn new(chunk_size: usize, min_chunk_size: usize, overlap_percent: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            min_chunk_size: min_chunk_size.min(chunk_size),
            overlap: (chunk_size * overlap_percent / 100).min(chunk_size - 1),
        }
    }

    /// Splits text into overlapping word-window chunks. A trailing fragment
    /// shorter than the minimum is merged into the previous chunk instead of
    /// standing alone.
    pub fn split(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Vec::new();
        }
        if words.len() <= self.chunk_size {
            return vec![words.join(" ")];
        }

        let step = self.chunk_size - self.overlap;
        let mut chunks: Vec<String> = Vec::new();
        let mut start = 0;

        while start < words.len() {
            let end = (start + self.chunk_size).min(words.len());
            let len = end - start;

            if len < self.min_chunk_size && !chunks.is_empty() {
                // Fold the short tail into the previous chunk.
                let tail = words[start..end].join(" ");
                if let Some(last) = chunks.last_mut() {
                    if !last.ends_with(&tail) {
                        last.push(' ');
                        last.push_str(&tail);
                    }
                }
                break;
            }

            chunks.push(words[start..end].join(" "));
            if end == words.len() {
                break;
            }
            start += step;
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(TextSplitter::default().split("   ").is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = TextSplitter::default().split(&words(100));
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_chunks_respect_size_and_overlap() {
        let splitter = TextSplitter::new(100, 40, 10);
        let chunks = splitter.split(&words(250));

        for chunk in &chunks {
            let count = chunk.split_whitespace().count();
            assert!(count <= 100 + 40, "chunk too large: {count}");
        }

        // Each step advances 90 words, so neighbours share the last 10.
        let first: Vec<&str> = chunks[0].split_whitespace().collect();
        let second: Vec<&str> = chunks[1].split_whitespace().collect();
        assert_eq!(&first[90..], &second[..10]);
    }

    #[test]
    fn test_short_tail_is_merged() {
        // 210 words with chunk 100/min 40/overlap 10%: windows start at
        // 0, 90, 180; the last window is 30 words and merges backwards.
        let splitter = TextSplitter::new(100, 40, 10);
        let chunks = splitter.split(&words(210));
        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].split_whitespace().count() > 100);
    }
}

use crate::error::IngestError;
use crate::extractor::PageText;
use crate::models::{Chunk, PipelineOptions};
use tracing::warn;

pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl From<&PipelineOptions> for ChunkingConfig {
    fn from(value: &PipelineOptions) -> Self {
        Self {
            chunk_size: value.chunk_size,
            chunk_overlap: value.chunk_overlap,
        }
    }
}

/// Splits text on the coarsest separator present, recursing into finer ones
/// for pieces that are still too long, then merges neighbours back up to
/// `chunk_size` characters with `chunk_overlap` characters carried over.
#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    config: ChunkingConfig,
    separators: Vec<String>,
}

impl RecursiveCharacterSplitter {
    pub fn new(config: ChunkingConfig) -> Result<Self, IngestError> {
        if config.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be positive".to_string(),
            ));
        }
        if config.chunk_overlap > config.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "chunk overlap {} is larger than chunk size {}",
                config.chunk_overlap, config.chunk_size
            )));
        }

        Ok(Self {
            config,
            separators: DEFAULT_SEPARATORS.iter().map(|sep| sep.to_string()).collect(),
        })
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    /// Splits every page independently; chunk indices run across pages.
    pub fn split_pages(&self, pages: &[PageText]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut cursor = 0u64;

        for page in pages {
            for text in self.split_text(&page.text) {
                chunks.push(Chunk {
                    chunk_index: cursor,
                    page: page.number,
                    text,
                });
                cursor = cursor.saturating_add(1);
            }
        }

        chunks
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut finer: &[String] = &[];

        for (position, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate.as_str();
                finer = &separators[position + 1..];
                break;
            }
        }

        let mut output = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.config.chunk_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                output.extend(self.merge_pieces(&pending));
                pending.clear();
            }

            if finer.is_empty() {
                output.push(piece.to_string());
            } else {
                output.extend(self.split_recursive(piece, finer));
            }
        }

        if !pending.is_empty() {
            output.extend(self.merge_pieces(&pending));
        }

        output
    }

    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut merged = Vec::new();
        let mut window: Vec<(&str, usize)> = Vec::new();
        let mut window_start = 0usize;
        let mut total = 0usize;

        for &piece in pieces {
            let length = char_len(piece);

            if total + length > size {
                if total > size {
                    warn!(length = total, chunk_size = size, "created a chunk larger than the chunk size");
                }

                if window_start < window.len() {
                    if let Some(text) = join_window(&window[window_start..]) {
                        merged.push(text);
                    }

                    while window_start < window.len()
                        && (total > overlap || (total + length > size && total > 0))
                    {
                        total -= window[window_start].1;
                        window_start += 1;
                    }
                }
            }

            window.push((piece, length));
            total += length;
        }

        if let Some(text) = join_window(&window[window_start..]) {
            merged.push(text);
        }

        merged
    }
}

fn join_window(window: &[(&str, usize)]) -> Option<String> {
    let joined = window.iter().map(|(piece, _)| *piece).collect::<String>();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Splits on `separator`, attaching each separator to the start of the piece
/// that follows it. An empty separator splits into single characters.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(index, ch)| &text[index..index + ch.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (index, _) in text.match_indices(separator) {
        if index > start {
            pieces.push(&text[start..index]);
        }
        start = index;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }

    pieces
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

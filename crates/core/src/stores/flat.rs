use crate::error::BackendError;
use crate::models::{IndexManifest, IndexedChunk, SearchHit};
use crate::traits::{IndexReader, VectorStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

const VECTORS_FILE: &str = "index.json";
const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    dimensions: usize,
    entries: Vec<IndexedChunk>,
}

/// Brute-force cosine index persisted as JSON files in one directory.
///
/// The manifest is written last, so a directory without one is never
/// treated as an index.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlatIndexStore;

impl FlatIndexStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl VectorStore for FlatIndexStore {
    type Reader = FlatIndexReader;

    async fn write(
        &self,
        dir: &Path,
        chunks: &[IndexedChunk],
        manifest: &IndexManifest,
    ) -> Result<(), BackendError> {
        if let Some(entry) = chunks
            .iter()
            .find(|entry| entry.embedding.len() != manifest.dimensions)
        {
            return Err(BackendError::DimensionMismatch {
                expected: manifest.dimensions,
                got: entry.embedding.len(),
            });
        }

        fs::create_dir_all(dir).await?;

        let index = IndexFile {
            dimensions: manifest.dimensions,
            entries: chunks.to_vec(),
        };
        write_atomic(&dir.join(VECTORS_FILE), &serde_json::to_vec(&index)?).await?;
        write_atomic(
            &dir.join(MANIFEST_FILE),
            &serde_json::to_vec_pretty(manifest)?,
        )
        .await?;

        debug!(path = %dir.display(), entries = chunks.len(), "wrote flat index");
        Ok(())
    }

    async fn open(&self, dir: &Path) -> Result<Self::Reader, BackendError> {
        let path = dir.join(VECTORS_FILE);
        let bytes = fs::read(&path).await?;
        let index: IndexFile = serde_json::from_slice(&bytes)?;

        if let Some(entry) = index
            .entries
            .iter()
            .find(|entry| entry.embedding.len() != index.dimensions)
        {
            return Err(BackendError::MalformedIndex {
                path: path.display().to_string(),
                details: format!(
                    "chunk {} has {} dimensions, index declares {}",
                    entry.chunk.chunk_index,
                    entry.embedding.len(),
                    index.dimensions
                ),
            });
        }

        debug!(path = %path.display(), entries = index.entries.len(), "opened flat index");
        Ok(FlatIndexReader {
            path,
            dimensions: index.dimensions,
            entries: index.entries,
        })
    }

    async fn manifest(&self, dir: &Path) -> Result<Option<IndexManifest>, BackendError> {
        let path = dir.join(MANIFEST_FILE);
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }

        let bytes = fs::read(&path).await?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), BackendError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[derive(Debug)]
pub struct FlatIndexReader {
    path: PathBuf,
    dimensions: usize,
    entries: Vec<IndexedChunk>,
}

impl IndexReader for FlatIndexReader {
    fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<SearchHit>, BackendError> {
        if query_vector.len() != self.dimensions {
            return Err(BackendError::DimensionMismatch {
                expected: self.dimensions,
                got: query_vector.len(),
            });
        }

        let query_norm = l2_norm(query_vector);
        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .map(|entry| SearchHit {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(query_vector, &entry.embedding, query_norm),
            })
            .collect();

        hits.sort_by(|left, right| {
            right
                .score
                .partial_cmp(&left.score)
                .unwrap_or(Ordering::Equal)
                .then(left.chunk.chunk_index.cmp(&right.chunk.chunk_index))
        });
        hits.truncate(k);

        Ok(hits)
    }

    fn close(self) {
        debug!(path = %self.path.display(), "released index reader");
    }
}

fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|value| value * value).sum::<f32>().sqrt()
}

fn cosine_similarity(query: &[f32], candidate: &[f32], query_norm: f32) -> f32 {
    let candidate_norm = l2_norm(candidate);
    if query_norm == 0.0 || candidate_norm == 0.0 {
        return 0.0;
    }

    let dot = query
        .iter()
        .zip(candidate.iter())
        .map(|(left, right)| left * right)
        .sum::<f32>();
    dot / (query_norm * candidate_norm)
}

use crate::error::BackendError;
use crate::models::{IndexManifest, IndexedChunk, SearchHit};
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait VectorStore: Send + Sync {
    type Reader: IndexReader;

    /// Writes a complete index into `dir`. Nothing is resolvable as an index
    /// until every file is in place.
    async fn write(
        &self,
        dir: &Path,
        chunks: &[IndexedChunk],
        manifest: &IndexManifest,
    ) -> Result<(), BackendError>;

    async fn open(&self, dir: &Path) -> Result<Self::Reader, BackendError>;

    /// Returns `None` when `dir` holds no complete index.
    async fn manifest(&self, dir: &Path) -> Result<Option<IndexManifest>, BackendError>;
}

pub trait IndexReader: Send {
    fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<SearchHit>, BackendError>;

    /// Releases everything the reader holds on the persisted index.
    fn close(self);
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model(&self) -> &str;

    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, BackendError>;
}

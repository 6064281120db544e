use crate::chunking::{ChunkingConfig, RecursiveCharacterSplitter};
use crate::embeddings::Embedder;
use crate::error::{BackendError, IngestError, PipelineError};
use crate::extractor::{LopdfExtractor, PageText, PdfExtractor};
use crate::models::{IndexManifest, IndexedChunk, PipelineOptions, UploadReceipt};
use crate::traits::VectorStore;
use crate::workspace::{remove_dir_with_retry, ScratchFile, Workspace};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Replaces the current index with one built from a single uploaded PDF.
pub struct IndexingPipeline<S>
where
    S: VectorStore,
{
    workspace: Workspace,
    store: S,
    embedder: Arc<dyn Embedder>,
    extractor: Arc<dyn PdfExtractor>,
    splitter: RecursiveCharacterSplitter,
    options: PipelineOptions,
}

impl<S> IndexingPipeline<S>
where
    S: VectorStore,
{
    pub fn new(
        workspace: Workspace,
        store: S,
        embedder: Arc<dyn Embedder>,
        options: PipelineOptions,
    ) -> Result<Self, IngestError> {
        let splitter = RecursiveCharacterSplitter::new(ChunkingConfig::from(&options))?;
        Ok(Self {
            workspace,
            store,
            embedder,
            extractor: Arc::new(LopdfExtractor),
            splitter,
            options,
        })
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn PdfExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub async fn index(
        &self,
        document: &[u8],
        filename: &str,
    ) -> Result<UploadReceipt, PipelineError> {
        if document.is_empty() {
            return Err(PipelineError::InvalidRequest(
                "uploaded file is empty".to_string(),
            ));
        }
        let name = Path::new(filename)
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                PipelineError::InvalidRequest(format!("upload has no file name: {filename}"))
            })?
            .to_string();

        info!(file = %name, bytes = document.len(), "indexing upload");

        remove_dir_with_retry(self.workspace.index_dir(), self.options.delete_retry).await?;
        debug!(path = %self.workspace.index_dir().display(), "cleared previous index");

        self.workspace.sweep_scratch().await?;
        let pages = {
            let scratch = self.workspace.materialize(&name, document).await?;
            self.extract(&scratch).await?
        };
        debug!(file = %name, pages = pages.len(), "extracted pdf text");

        let chunks = self.splitter.split_pages(&pages);
        if chunks.is_empty() {
            return Err(IngestError::PdfParse(format!("no text chunks produced from {name}")).into());
        }
        debug!(file = %name, chunks = chunks.len(), "split document");

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(processing_failure)?;

        let dimensions = embeddings.first().map(Vec::len).unwrap_or_default();
        if embeddings.len() != chunks.len() {
            return Err(IngestError::InvalidArgument(format!(
                "embedding count {} doesn't match chunk count {}",
                embeddings.len(),
                chunks.len()
            ))
            .into());
        }

        let indexed: Vec<IndexedChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexedChunk { chunk, embedding })
            .collect();

        let manifest = IndexManifest {
            document_name: name.clone(),
            checksum: digest_bytes(document),
            embedding_model: self.embedder.model().to_string(),
            dimensions,
            chunk_count: indexed.len(),
            indexed_at: Utc::now(),
        };

        self.store
            .write(self.workspace.index_dir(), &indexed, &manifest)
            .await
            .map_err(processing_failure)?;

        info!(
            file = %name,
            chunk_count = manifest.chunk_count,
            dimensions,
            model = %manifest.embedding_model,
            "document indexed"
        );
        Ok(UploadReceipt::processed(&name))
    }

    async fn extract(&self, scratch: &ScratchFile) -> Result<Vec<PageText>, PipelineError> {
        let extractor = Arc::clone(&self.extractor);
        let path = scratch.path().to_path_buf();
        let extracted = tokio::task::spawn_blocking(move || extractor.extract_pages(&path))
            .await
            .map_err(|error| {
                PipelineError::Unexpected(format!("pdf extraction task failed: {error}"))
            })?;

        extracted.map_err(|error| match error {
            IngestError::PdfParse(details) => {
                IngestError::PdfParse(format!("{}: {details}", scratch.upload_name())).into()
            }
            other => other.into(),
        })
    }
}

fn processing_failure(error: BackendError) -> PipelineError {
    PipelineError::DocumentProcessing(IngestError::Backend(error))
}

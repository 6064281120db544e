pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod response;
pub mod stores;
pub mod traits;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testing;

pub use chunking::{ChunkingConfig, RecursiveCharacterSplitter, DEFAULT_SEPARATORS};
pub use embeddings::{CharacterNgramEmbedder, Embedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{BackendError, IngestError, PipelineError};
pub use extractor::{extract_page_texts, LopdfExtractor, PageText, PdfExtractor};
pub use ingest::{digest_bytes, IndexingPipeline};
pub use models::{
    AnswerTrace, Chunk, IndexManifest, IndexedChunk, Justification, PipelineOptions, RetryPolicy,
    SearchHit, StructuredAnswer, UploadReceipt,
};
pub use orchestrator::QueryPipeline;
pub use prompt::build_prompt;
pub use response::{extract_json_payload, parse_answer};
pub use stores::{FlatIndexReader, FlatIndexStore, OllamaChatModel, OllamaClient, OllamaEmbedder};
pub use traits::{ChatModel, IndexReader, VectorStore};
pub use workspace::{remove_dir_with_retry, Workspace};

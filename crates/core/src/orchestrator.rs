use crate::embeddings::Embedder;
use crate::error::PipelineError;
use crate::models::{AnswerTrace, IndexManifest, PipelineOptions, SearchHit, StructuredAnswer};
use crate::prompt::build_prompt;
use crate::response::parse_answer;
use crate::traits::{ChatModel, IndexReader, VectorStore};
use crate::workspace::Workspace;
use std::sync::Arc;
use tracing::{debug, warn};

/// Answers claims questions against the persisted index.
pub struct QueryPipeline<S>
where
    S: VectorStore,
{
    workspace: Workspace,
    store: S,
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatModel>,
    options: PipelineOptions,
}

impl<S> QueryPipeline<S>
where
    S: VectorStore,
{
    pub fn new(
        workspace: Workspace,
        store: S,
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatModel>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            workspace,
            store,
            embedder,
            chat,
            options,
        }
    }

    pub async fn status(&self) -> Result<Option<IndexManifest>, PipelineError> {
        Ok(self.store.manifest(self.workspace.index_dir()).await?)
    }

    /// Embeds the question and returns the `k` closest chunks. The index
    /// reader is closed before this returns.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<SearchHit>, PipelineError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PipelineError::InvalidRequest(
                "question must not be empty".to_string(),
            ));
        }

        let Some(manifest) = self.status().await? else {
            warn!(path = %self.workspace.index_dir().display(), "vector store not found");
            return Err(PipelineError::IndexNotFound);
        };
        if manifest.embedding_model != self.embedder.model() {
            warn!(
                indexed_with = %manifest.embedding_model,
                querying_with = %self.embedder.model(),
                "embedding model differs from the one used for indexing"
            );
        }

        let query_vector = self.embedder.embed(question).await?;

        debug!(path = %self.workspace.index_dir().display(), "loading vector store");
        let reader = self.store.open(self.workspace.index_dir()).await?;
        let hits = reader.search(&query_vector, k);
        reader.close();

        let hits = hits?;
        debug!(hits = hits.len(), k, "retrieved chunks");
        Ok(hits)
    }

    pub async fn answer_with_trace(&self, question: &str) -> Result<AnswerTrace, PipelineError> {
        debug!(question, "received query");
        let hits = self.retrieve(question, self.options.top_k).await?;
        let prompt = build_prompt(&hits, question);

        debug!(model = %self.chat.model(), "invoking chat model");
        let raw_response = self
            .chat
            .complete(&prompt, self.options.temperature)
            .await?;
        debug!(raw_response = %raw_response, "received raw response");

        let answer = parse_answer(&raw_response)?;
        Ok(AnswerTrace {
            answer,
            hits,
            prompt,
            raw_response,
        })
    }

    pub async fn answer(&self, question: &str) -> Result<StructuredAnswer, PipelineError> {
        Ok(self.answer_with_trace(question).await?.answer)
    }
}

pub mod flat;
pub mod ollama;

pub use flat::{FlatIndexReader, FlatIndexStore};
pub use ollama::{OllamaChatModel, OllamaClient, OllamaEmbedder};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("embedding dimension {got} does not match {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("malformed index at {path}: {details}")]
    MalformedIndex { path: String, details: String },

    #[error("{backend} returned an empty response")]
    EmptyResponse { backend: String },
}

/// Errors surfaced at the request boundary of the indexing and query pipelines.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("directory {path} is still locked after {attempts} attempts: {source}")]
    DirectoryLock {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("Error processing file: {0}")]
    DocumentProcessing(#[source] IngestError),

    #[error("No document has been uploaded and processed yet.")]
    IndexNotFound,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("Error during query: {0}")]
    QueryProcessing(#[source] BackendError),

    #[error("Error parsing LLM response. Raw: {raw}")]
    ResponseParse {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl PipelineError {
    /// HTTP status class a web layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::IndexNotFound | Self::InvalidRequest(_) => 400,
            _ => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

impl From<IngestError> for PipelineError {
    fn from(value: IngestError) -> Self {
        Self::DocumentProcessing(value)
    }
}

impl From<BackendError> for PipelineError {
    fn from(value: BackendError) -> Self {
        Self::QueryProcessing(value)
    }
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;

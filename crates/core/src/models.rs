use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_index: u64,
    pub page: u32,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// Metadata persisted alongside the vectors of the current index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub document_name: String,
    pub checksum: String,
    pub embedding_model: String,
    pub dimensions: usize,
    pub chunk_count: usize,
    pub indexed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk: Chunk,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub status: String,
    pub message: String,
}

impl UploadReceipt {
    pub fn processed(filename: &str) -> Self {
        Self {
            status: "success".to_string(),
            message: format!("File '{filename}' processed successfully."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Justification {
    pub finding: String,
    pub clause_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredAnswer {
    pub decision: String,
    #[serde(deserialize_with = "whole_amount")]
    pub amount: i64,
    pub justification: Vec<Justification>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Integer(i64),
    Float(f64),
    Text(String),
}

/// Accepts integers, floats without a fractional part and numeric strings.
fn whole_amount<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let float = match RawAmount::deserialize(deserializer)? {
        RawAmount::Integer(value) => return Ok(value),
        RawAmount::Float(value) => value,
        RawAmount::Text(text) => {
            let text = text.trim();
            if let Ok(value) = text.parse::<i64>() {
                return Ok(value);
            }
            text.parse::<f64>()
                .map_err(|_| D::Error::custom(format!("amount {text:?} is not a number")))?
        }
    };

    if float.is_finite()
        && float.fract() == 0.0
        && float >= i64::MIN as f64
        && float < i64::MAX as f64
    {
        Ok(float as i64)
    } else {
        Err(D::Error::custom(format!("amount {float} is not a whole number")))
    }
}

/// Everything a query produced, kept for diagnostics.
#[derive(Debug, Clone)]
pub struct AnswerTrace {
    pub answer: StructuredAnswer,
    pub hits: Vec<SearchHit>,
    pub prompt: String,
    pub raw_response: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            initial_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub temperature: f32,
    pub delete_retry: RetryPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1_000,
            chunk_overlap: 150,
            top_k: 5,
            temperature: 0.0,
            delete_retry: RetryPolicy::default(),
        }
    }
}

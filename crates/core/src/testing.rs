//! Fixtures shared by the unit tests.

use crate::embeddings::Embedder;
use crate::error::BackendError;
use crate::models::{IndexManifest, IndexedChunk, SearchHit};
use crate::traits::{ChatModel, IndexReader, VectorStore};
use async_trait::async_trait;
use chrono::Utc;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Builds a PDF with one Courier text line per page.
pub(crate) fn pdf_bytes(pages: &[&str]) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut document = Document::with_version("1.5");
    let pages_id = document.new_object_id();
    let font_id = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = document.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Td", vec![40.into(), 760.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = document.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(Object::from(page_id));
    }

    let count = kids.len() as i64;
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    document.save_to(&mut bytes)?;
    Ok(bytes)
}

pub(crate) fn write_pdf(path: &Path, pages: &[&str]) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::write(path, pdf_bytes(pages)?)?;
    Ok(())
}

/// Ordered record of backend calls shared between fakes.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventLog(Arc<Mutex<Vec<&'static str>>>);

impl EventLog {
    pub(crate) fn push(&self, event: &'static str) {
        if let Ok(mut events) = self.0.lock() {
            events.push(event);
        }
    }

    pub(crate) fn events(&self) -> Vec<&'static str> {
        self.0.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

/// Chat model that replays a fixed response and records what it was sent.
pub(crate) struct ScriptedChatModel {
    response: String,
    calls: Mutex<Vec<(String, f32)>>,
    log: EventLog,
}

impl ScriptedChatModel {
    pub(crate) fn new(response: impl Into<String>) -> Self {
        Self::with_log(response, EventLog::default())
    }

    pub(crate) fn with_log(response: impl Into<String>, log: EventLog) -> Self {
        Self {
            response: response.into(),
            calls: Mutex::new(Vec::new()),
            log,
        }
    }

    pub(crate) fn calls(&self) -> Vec<(String, f32)> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, BackendError> {
        self.log.push("complete");
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((prompt.to_string(), temperature));
        }
        Ok(self.response.clone())
    }
}

/// Embedder whose backend is always down.
pub(crate) struct UnreachableEmbedder;

#[async_trait]
impl Embedder for UnreachableEmbedder {
    fn model(&self) -> &str {
        "unreachable"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, BackendError> {
        Err(BackendError::BackendResponse {
            backend: "ollama".to_string(),
            details: "503 Service Unavailable".to_string(),
        })
    }
}

/// Store with a fixed manifest whose readers log `open`, `search` and `close`.
pub(crate) struct RecordingStore {
    pub(crate) log: EventLog,
    pub(crate) hits: Vec<SearchHit>,
    pub(crate) fail_search: bool,
    pub(crate) embedding_model: String,
}

#[async_trait]
impl VectorStore for RecordingStore {
    type Reader = RecordingReader;

    async fn write(
        &self,
        _dir: &Path,
        _chunks: &[IndexedChunk],
        _manifest: &IndexManifest,
    ) -> Result<(), BackendError> {
        self.log.push("write");
        Ok(())
    }

    async fn open(&self, _dir: &Path) -> Result<Self::Reader, BackendError> {
        self.log.push("open");
        Ok(RecordingReader {
            log: self.log.clone(),
            hits: self.hits.clone(),
            fail_search: self.fail_search,
        })
    }

    async fn manifest(&self, _dir: &Path) -> Result<Option<IndexManifest>, BackendError> {
        Ok(Some(IndexManifest {
            document_name: "policy.pdf".to_string(),
            checksum: "recorded".to_string(),
            embedding_model: self.embedding_model.clone(),
            dimensions: 0,
            chunk_count: self.hits.len(),
            indexed_at: Utc::now(),
        }))
    }
}

pub(crate) struct RecordingReader {
    log: EventLog,
    hits: Vec<SearchHit>,
    fail_search: bool,
}

impl IndexReader for RecordingReader {
    fn search(&self, _query_vector: &[f32], k: usize) -> Result<Vec<SearchHit>, BackendError> {
        self.log.push("search");
        if self.fail_search {
            return Err(BackendError::MalformedIndex {
                path: "index.json".to_string(),
                details: "truncated".to_string(),
            });
        }
        Ok(self.hits.iter().take(k).cloned().collect())
    }

    fn close(self) {
        self.log.push("close");
    }
}

//! Document repository: read-mostly storage the core consults to
//! materialize `document:<name>` context entries. The core only ever calls
//! `get_document`; list/put/delete exist for the repository's own
//! maintenance and aren't invoked by the generation/task machinery.
//!
//! Grounded on [`crate::thread`]'s map-and-file repository pair, the same
//! shape applied to opaque named blobs instead of conversation threads.

use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A named document a task's context can reference as `document:<name>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub media_type: String,
    pub content: Vec<u8>,
}

impl Document {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            content,
        }
    }
}

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn get_document(&self, name: &str) -> Result<Document>;
    async fn put_document(&self, document: Document) -> Result<()>;
    async fn delete_document(&self, name: &str) -> Result<()>;
    async fn list_documents(&self) -> Result<Vec<String>>;
}

/// In-process document store keyed by name.
pub struct MemoryDocumentRepository {
    documents: RwLock<HashMap<String, Document>>,
}

impl MemoryDocumentRepository {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryDocumentRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentRepository for MemoryDocumentRepository {
    async fn get_document(&self, name: &str) -> Result<Document> {
        self.documents
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| Error::document_not_found(name))
    }

    async fn put_document(&self, document: Document) -> Result<()> {
        self.documents
            .write()
            .await
            .insert(document.name.clone(), document);
        Ok(())
    }

    async fn delete_document(&self, name: &str) -> Result<()> {
        self.documents
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::document_not_found(name))
    }

    async fn list_documents(&self) -> Result<Vec<String>> {
        Ok(self.documents.read().await.keys().cloned().collect())
    }
}

/// One file per document, named `<name>`, inside a directory. The media
/// type is inferred from the file's stored sidecar rather than the raw
/// bytes, so each document is written as a small JSON envelope, mirroring
/// `FileThreadRepository`'s one-file-per-record convention.
pub struct FileDocumentRepository {
    dir: PathBuf,
}

impl FileDocumentRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

#[async_trait]
impl DocumentRepository for FileDocumentRepository {
    async fn get_document(&self, name: &str) -> Result<Document> {
        match tokio::fs::read(self.path_for(name)).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(Error::Json),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::document_not_found(name))
            }
            Err(e) => Err(Error::other(format!("failed to read document file: {e}"))),
        }
    }

    async fn put_document(&self, document: Document) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::other(format!("failed to create document directory: {e}")))?;
        let bytes = serde_json::to_vec_pretty(&document).map_err(Error::Json)?;
        tokio::fs::write(self.path_for(&document.name), bytes)
            .await
            .map_err(|e| Error::other(format!("failed to write document file: {e}")))
    }

    async fn delete_document(&self, name: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::document_not_found(name))
            }
            Err(e) => Err(Error::other(format!("failed to delete document file: {e}"))),
        }
    }

    async fn list_documents(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::other(format!("failed to list document directory: {e}"))),
        };
        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::other(format!("failed to read directory entry: {e}")))?
        {
            if let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        Ok(names)
    }
}

/// Convenience alias used by `Agent` for the trait-object form it stores.
pub type SharedDocumentRepository = Arc<dyn DocumentRepository>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_repository_round_trips() {
        let repo = MemoryDocumentRepository::new();
        repo.put_document(Document::new("report", "text/plain", b"hello".to_vec()))
            .await
            .unwrap();

        let doc = repo.get_document("report").await.unwrap();
        assert_eq!(doc.content, b"hello");
    }

    #[tokio::test]
    async fn missing_document_is_not_found() {
        let repo = MemoryDocumentRepository::new();
        let err = repo.get_document("missing").await.unwrap_err();
        assert!(matches!(err, Error::DocumentNotFound(_)));
    }

    #[tokio::test]
    async fn list_documents_returns_every_name() {
        let repo = MemoryDocumentRepository::new();
        repo.put_document(Document::new("a", "text/plain", vec![]))
            .await
            .unwrap();
        repo.put_document(Document::new("b", "text/plain", vec![]))
            .await
            .unwrap();
        let mut names = repo.list_documents().await.unwrap();
        names.sort();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn file_repository_round_trips_through_disk() {
        let dir = std::env::temp_dir().join(format!("agentrie-doc-test-{}", std::process::id()));
        let repo = FileDocumentRepository::new(&dir);

        repo.put_document(Document::new("report", "text/plain", b"hi".to_vec()))
            .await
            .unwrap();
        let doc = repo.get_document("report").await.unwrap();
        assert_eq!(doc.content, b"hi");

        repo.delete_document("report").await.unwrap();
        assert!(repo.get_document("report").await.is_err());

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}

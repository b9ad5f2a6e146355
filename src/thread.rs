//! Thread repository: durable storage for a chat thread's message history,
//! behind a repository trait with a memory and a per-file-per-thread JSON
//! implementation.
//!
//! Grounded on `other_examples/8ac16540_bochaco-formicaio`'s `ChatSessions`
//! map-of-sessions style, minus its bounded eviction: threads here are
//! durable, not a capped cache. Timestamps are plain `String`s stamped by
//! the repository rather than `chrono::DateTime`s: the base crate's
//! dependency stack doesn't carry `chrono`, so `PutThread` formats Unix
//! seconds itself (see DESIGN.md).

use crate::types::Message;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

/// A persisted conversation: its full message history plus bookkeeping
/// stamped by whichever [`ThreadRepository`] stored it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub user_id: Option<String>,
    pub messages: Vec<Message>,
    pub created_at: String,
    pub updated_at: String,
}

impl Thread {
    /// A brand-new, unsaved thread. `created_at`/`updated_at` are stamped by
    /// the repository on the first `put_thread`, not here.
    pub fn new(id: impl Into<String>, user_id: Option<String>) -> Self {
        Self {
            id: id.into(),
            user_id,
            messages: Vec::new(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }
}

/// Lightweight metadata returned by [`ThreadRepository::list_threads`]:
/// message bodies are omitted, leaving just a page of id, user_id,
/// created_at, updated_at fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub id: String,
    pub user_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Optional narrowing applied by [`ThreadRepository::list_threads`].
#[derive(Debug, Clone, Default)]
pub struct ThreadFilter {
    pub user_id: Option<String>,
}

/// A page of thread summaries. Repositories here return everything matching
/// the filter in one page; a cursor-based implementation could extend this.
#[derive(Debug, Clone, Default)]
pub struct ThreadPage {
    pub threads: Vec<ThreadSummary>,
}

fn now_stamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        .to_string()
}

/// Durable storage for chat threads, consulted by `Agent::handle_chat` when
/// a thread id is supplied.
#[async_trait]
pub trait ThreadRepository: Send + Sync {
    async fn get_thread(&self, id: &str) -> Result<Option<Thread>>;

    /// Creates or replaces a thread, stamping `created_at` (first write
    /// only) and `updated_at` (every write). At-least-once durability: a
    /// caller that doesn't see a success response should retry, and a
    /// duplicate write is harmless since `put_thread` is a full replace.
    async fn put_thread(&self, thread: Thread) -> Result<()>;

    /// Returns `Ok(())` on success, `Err(Error::ThreadNotFound)` if no such
    /// thread exists.
    async fn delete_thread(&self, id: &str) -> Result<()>;

    async fn list_threads(&self, filter: Option<ThreadFilter>) -> Result<ThreadPage>;
}

/// In-process thread store keyed by thread id.
pub struct MemoryThreadRepository {
    threads: RwLock<HashMap<String, Thread>>,
}

impl MemoryThreadRepository {
    pub fn new() -> Self {
        Self {
            threads: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryThreadRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ThreadRepository for MemoryThreadRepository {
    async fn get_thread(&self, id: &str) -> Result<Option<Thread>> {
        Ok(self.threads.read().await.get(id).cloned())
    }

    async fn put_thread(&self, mut thread: Thread) -> Result<()> {
        let mut threads = self.threads.write().await;
        let created_at = threads
            .get(&thread.id)
            .map(|existing| existing.created_at.clone())
            .unwrap_or_else(now_stamp);
        thread.created_at = created_at;
        thread.updated_at = now_stamp();
        threads.insert(thread.id.clone(), thread);
        Ok(())
    }

    async fn delete_thread(&self, id: &str) -> Result<()> {
        let mut threads = self.threads.write().await;
        threads
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::thread_not_found(id))
    }

    async fn list_threads(&self, filter: Option<ThreadFilter>) -> Result<ThreadPage> {
        let threads = self.threads.read().await;
        let user_id_filter = filter.and_then(|f| f.user_id);
        let summaries = threads
            .values()
            .filter(|t| {
                user_id_filter
                    .as_ref()
                    .is_none_or(|wanted| t.user_id.as_ref() == Some(wanted))
            })
            .map(|t| ThreadSummary {
                id: t.id.clone(),
                user_id: t.user_id.clone(),
                created_at: t.created_at.clone(),
                updated_at: t.updated_at.clone(),
            })
            .collect();
        Ok(ThreadPage { threads: summaries })
    }
}

/// One JSON file per thread, named `<id>.json`, inside a directory.
pub struct FileThreadRepository {
    dir: PathBuf,
}

impl FileThreadRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

#[async_trait]
impl ThreadRepository for FileThreadRepository {
    async fn get_thread(&self, id: &str) -> Result<Option<Thread>> {
        match tokio::fs::read(self.path_for(id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes).map_err(Error::Json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::other(format!("failed to read thread file: {e}"))),
        }
    }

    async fn put_thread(&self, mut thread: Thread) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::other(format!("failed to create thread directory: {e}")))?;

        let created_at = match self.get_thread(&thread.id).await? {
            Some(existing) => existing.created_at,
            None => now_stamp(),
        };
        thread.created_at = created_at;
        thread.updated_at = now_stamp();

        let bytes = serde_json::to_vec_pretty(&thread).map_err(Error::Json)?;
        tokio::fs::write(self.path_for(&thread.id), bytes)
            .await
            .map_err(|e| Error::other(format!("failed to write thread file: {e}")))
    }

    async fn delete_thread(&self, id: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::thread_not_found(id))
            }
            Err(e) => Err(Error::other(format!("failed to delete thread file: {e}"))),
        }
    }

    async fn list_threads(&self, filter: Option<ThreadFilter>) -> Result<ThreadPage> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ThreadPage::default());
            }
            Err(e) => return Err(Error::other(format!("failed to list thread directory: {e}"))),
        };

        let user_id_filter = filter.and_then(|f| f.user_id);
        let mut summaries = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::other(format!("failed to read directory entry: {e}")))?
        {
            let bytes = match tokio::fs::read(entry.path()).await {
                Ok(bytes) => bytes,
                Err(_) => continue,
            };
            let thread: Thread = match serde_json::from_slice(&bytes) {
                Ok(thread) => thread,
                // A file that fails to parse is skipped, not a hard error.
                Err(_) => continue,
            };
            if let Some(wanted) = &user_id_filter {
                if thread.user_id.as_ref() != Some(wanted) {
                    continue;
                }
            }
            summaries.push(ThreadSummary {
                id: thread.id,
                user_id: thread.user_id,
                created_at: thread.created_at,
                updated_at: thread.updated_at,
            });
        }
        Ok(ThreadPage { threads: summaries })
    }
}

/// Convenience alias used by `Agent` for the trait-object form it stores.
pub type SharedThreadRepository = Arc<dyn ThreadRepository>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_repository_round_trips_and_stamps_timestamps() {
        let repo = MemoryThreadRepository::new();
        let thread = Thread::new("t1", Some("alice".to_string()));
        repo.put_thread(thread).await.unwrap();

        let fetched = repo.get_thread("t1").await.unwrap().expect("thread exists");
        assert!(!fetched.created_at.is_empty());
        assert_eq!(fetched.updated_at, fetched.created_at);
    }

    #[tokio::test]
    async fn memory_repository_preserves_created_at_on_replace() {
        let repo = MemoryThreadRepository::new();
        repo.put_thread(Thread::new("t1", None)).await.unwrap();
        let first = repo.get_thread("t1").await.unwrap().unwrap();

        let mut replacement = Thread::new("t1", None);
        replacement.messages.push(Message::user("hi"));
        repo.put_thread(replacement).await.unwrap();

        let second = repo.get_thread("t1").await.unwrap().unwrap();
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.messages.len(), 1);
    }

    #[tokio::test]
    async fn delete_missing_thread_is_not_found() {
        let repo = MemoryThreadRepository::new();
        let err = repo.delete_thread("missing").await.unwrap_err();
        assert!(matches!(err, Error::ThreadNotFound(_)));
    }

    #[tokio::test]
    async fn list_threads_filters_by_user_id() {
        let repo = MemoryThreadRepository::new();
        repo.put_thread(Thread::new("t1", Some("alice".to_string())))
            .await
            .unwrap();
        repo.put_thread(Thread::new("t2", Some("bob".to_string())))
            .await
            .unwrap();

        let page = repo
            .list_threads(Some(ThreadFilter {
                user_id: Some("alice".to_string()),
            }))
            .await
            .unwrap();
        assert_eq!(page.threads.len(), 1);
        assert_eq!(page.threads[0].id, "t1");
    }

    #[tokio::test]
    async fn file_repository_round_trips_through_disk() {
        let dir = std::env::temp_dir().join(format!("agentrie-thread-test-{}", std::process::id()));
        let repo = FileThreadRepository::new(&dir);

        let mut thread = Thread::new("t1", None);
        thread.messages.push(Message::user("hello"));
        repo.put_thread(thread).await.unwrap();

        let fetched = repo.get_thread("t1").await.unwrap().expect("thread exists");
        assert_eq!(fetched.messages.len(), 1);

        repo.delete_thread("t1").await.unwrap();
        assert!(repo.get_thread("t1").await.unwrap().is_none());

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}

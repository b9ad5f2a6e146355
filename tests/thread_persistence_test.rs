//! Integration tests for thread-backed chat turns and the thread repository
//! contract (`get`/`put`/`delete` round-trips).

use agentrie::{
    AgentBuilder, AgentIdentity, ChatRequest, ContentBlock, Error, GenerateOptions, Llm,
    MemoryThreadRepository, Message, Response, TextBlock, Thread, ThreadRepository,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

/// Always replies with a fixed text turn; used to keep these tests focused
/// on thread bookkeeping rather than generation content.
struct FixedLlm(Mutex<Vec<Vec<Message>>>);

impl FixedLlm {
    fn new() -> Self {
        Self(Mutex::new(Vec::new()))
    }
}

impl Llm for FixedLlm {
    fn name(&self) -> &str {
        "fixed"
    }

    fn generate<'a>(
        &'a self,
        messages: &'a [Message],
        _opts: &'a GenerateOptions,
    ) -> Pin<Box<dyn Future<Output = agentrie::Result<Response>> + Send + 'a>> {
        self.0.lock().unwrap().push(messages.to_vec());
        Box::pin(async move {
            let mut response = Response::new("r", "m");
            response.content.push(ContentBlock::Text(TextBlock::new("ack")));
            Ok(response)
        })
    }
}

/// E6: a second call with the same thread id begins generation with the
/// first call's messages prepended, and the persisted thread ends up with
/// all four messages (two user, two assistant).
#[tokio::test]
async fn second_call_on_a_thread_sees_the_first_calls_history() {
    let threads: Arc<MemoryThreadRepository> = Arc::new(MemoryThreadRepository::new());
    let llm = Arc::new(FixedLlm::new());
    let agent = AgentBuilder::new(AgentIdentity::new("tester"))
        .llm(llm.clone())
        .threads(threads.clone())
        .build(None)
        .unwrap();
    agent.start().await.unwrap();

    agent
        .create_response(
            ChatRequest::new(vec![Message::user("first message")]).with_thread("t1"),
        )
        .await
        .unwrap();

    agent
        .create_response(
            ChatRequest::new(vec![Message::user("second message")]).with_thread("t1"),
        )
        .await
        .unwrap();

    fn text_of(block: &ContentBlock) -> &str {
        match block {
            ContentBlock::Text(t) => &t.text,
            _ => panic!("expected a text block"),
        }
    }

    let calls = llm.0.lock().unwrap();
    assert_eq!(calls.len(), 2);
    // Second call's history: system + first user + first assistant + second user.
    let second_call = &calls[1];
    assert_eq!(second_call.len(), 4);
    assert_eq!(text_of(&second_call[1].content[0]), "first message");
    assert_eq!(text_of(&second_call[3].content[0]), "second message");
    drop(calls);

    let stored = threads.get_thread("t1").await.unwrap().expect("thread persisted");
    assert_eq!(stored.messages.len(), 4);

    agent.stop().await.unwrap();
}

/// Chatting with a thread id but no repository configured fails with
/// `threads-not-enabled` rather than silently ignoring the id.
#[tokio::test]
async fn thread_id_without_a_repository_errors() {
    struct EchoLlm;
    impl Llm for EchoLlm {
        fn name(&self) -> &str {
            "echo"
        }
        fn generate<'a>(
            &'a self,
            _messages: &'a [Message],
            _opts: &'a GenerateOptions,
        ) -> Pin<Box<dyn Future<Output = agentrie::Result<Response>> + Send + 'a>> {
            Box::pin(async move { Err(Error::other("should not be called")) })
        }
    }

    let agent = AgentBuilder::new(AgentIdentity::new("tester"))
        .llm(Arc::new(EchoLlm))
        .build(None)
        .unwrap();
    agent.start().await.unwrap();

    let err = agent
        .create_response(ChatRequest::new(vec![Message::user("hi")]).with_thread("t1"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ThreadsNotEnabled));
    agent.stop().await.unwrap();
}

/// Property #9/#10: put-then-get round-trips modulo timestamps, and
/// deleting a thread (existent or not) behaves as documented.
#[tokio::test]
async fn memory_repository_put_get_delete_round_trip() {
    let repo = MemoryThreadRepository::new();

    let missing = repo.delete_thread("ghost").await;
    assert!(matches!(missing.unwrap_err(), Error::ThreadNotFound(_)));

    let thread = Thread::new("t1", Some("user-1".to_string()));
    repo.put_thread(thread.clone()).await.unwrap();

    let fetched = repo.get_thread("t1").await.unwrap().expect("thread exists");
    assert_eq!(fetched.id, "t1");
    assert_eq!(fetched.user_id, Some("user-1".to_string()));
    assert!(!fetched.created_at.is_empty());
    assert!(!fetched.updated_at.is_empty());

    repo.delete_thread("t1").await.unwrap();
    assert!(repo.get_thread("t1").await.unwrap().is_none());

    let deleted_again = repo.delete_thread("t1").await;
    assert!(matches!(deleted_again.unwrap_err(), Error::ThreadNotFound(_)));
}

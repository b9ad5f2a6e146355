//! Event stream and publisher: a bounded, single-producer/single-consumer
//! channel of [`ResponseEvent`]s with graceful, idempotent close.
//!
//! Grounded on the base crate's `ContentStream` (`Pin<Box<dyn Stream...>>`)
//! pattern in `client.rs`, backed here by a bounded `tokio::sync::mpsc` pair
//! instead of a raw SSE fold, since this stream carries structured lifecycle
//! events rather than provider deltas.

use crate::accumulator::ProviderEvent;
use crate::response::{Response, Usage};
use crate::task::TaskStatus;
use crate::types::{Message, ToolResultBlock, ToolUseBlock};
use crate::{Error, Result};
use futures::Stream;
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Default bounded capacity for event streams, per the concurrency model.
pub const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Closed set of event types a [`ResponseEvent`] may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseEventType {
    ResponseCreated,
    ResponseInProgress,
    LlmEvent,
    ResponseToolCall,
    ResponseToolResult,
    ResponseCompleted,
    ResponseFailed,
    TaskActivated,
    TaskProgress,
    TaskPaused,
    TaskCompleted,
    TaskError,
    Error,
}

/// Where an event originated: which agent, which environment, which task.
#[derive(Debug, Clone, Default)]
pub struct EventOrigin {
    pub agent: Option<String>,
    pub environment: Option<String>,
    pub task: Option<String>,
}

impl EventOrigin {
    pub fn agent(name: impl Into<String>) -> Self {
        Self {
            agent: Some(name.into()),
            environment: None,
            task: None,
        }
    }

    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }
}

/// Payload carried by an event, keyed off its [`ResponseEventType`].
#[derive(Debug, Clone)]
pub enum EventPayload {
    Response(Response),
    Message(Message),
    Delta(ProviderEvent),
    ToolUse(ToolUseBlock),
    ToolResult(ToolResultBlock),
    Task(TaskEventPayload),
}

/// Payload for task-lifecycle events: the task's last output text (if any),
/// cumulative usage, and the status it transitioned to.
#[derive(Debug, Clone)]
pub struct TaskEventPayload {
    pub content: Option<String>,
    pub usage: Usage,
    pub status: TaskStatus,
}

/// A tagged record published on a caller's stream describing progress.
#[derive(Debug, Clone)]
pub struct ResponseEvent {
    pub event_type: ResponseEventType,
    pub origin: Option<EventOrigin>,
    pub payload: Option<EventPayload>,
    pub error: Option<String>,
}

impl ResponseEvent {
    pub fn new(event_type: ResponseEventType) -> Self {
        Self {
            event_type,
            origin: None,
            payload: None,
            error: None,
        }
    }

    pub fn with_origin(mut self, origin: EventOrigin) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_payload(mut self, payload: EventPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn failed(origin: EventOrigin, err: &Error) -> Self {
        Self {
            event_type: ResponseEventType::ResponseFailed,
            origin: Some(origin),
            payload: None,
            error: Some(err.to_string()),
        }
    }
}

/// Stream of events observed by a caller. Single-producer/single-consumer;
/// to broadcast, wrap externally: this type will not fan out.
pub type EventStream = Pin<Box<dyn Stream<Item = ResponseEvent> + Send>>;

/// Writer half of an event stream. `send` fails with [`Error::StreamClosed`]
/// once the reader has been dropped; `close` is idempotent because dropping
/// an already-dropped sender is a no-op.
#[derive(Clone)]
pub struct EventPublisher {
    tx: mpsc::Sender<ResponseEvent>,
}

impl EventPublisher {
    pub async fn send(&self, event: ResponseEvent) -> Result<()> {
        self.tx.send(event).await.map_err(|_| Error::StreamClosed)
    }

    /// Consume the publisher, dropping its sender half. Safe to call, or skip
    /// (the `Drop` impl on the last clone does the same thing), more than once
    /// across clones since each clone's drop only closes its own handle.
    pub fn close(self) {
        drop(self);
    }
}

/// Create a bounded event channel, returning the writer and the reader stream.
pub fn channel(capacity: usize) -> (EventPublisher, EventStream) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        EventPublisher { tx },
        Box::pin(ReceiverStream::new(rx)) as EventStream,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn send_then_close_drains_then_ends_stream() {
        let (publisher, mut stream) = channel(EVENT_CHANNEL_CAPACITY);
        publisher
            .send(ResponseEvent::new(ResponseEventType::ResponseCreated))
            .await
            .unwrap();
        publisher.close();

        let first = stream.next().await;
        assert!(matches!(
            first.unwrap().event_type,
            ResponseEventType::ResponseCreated
        ));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn send_after_close_fails_with_stream_closed() {
        let (publisher, stream) = channel(EVENT_CHANNEL_CAPACITY);
        drop(stream);
        let err = publisher
            .send(ResponseEvent::new(ResponseEventType::ResponseCreated))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StreamClosed));
    }

    #[tokio::test]
    async fn events_are_observed_in_emission_order() {
        let (publisher, mut stream) = channel(EVENT_CHANNEL_CAPACITY);
        publisher
            .send(ResponseEvent::new(ResponseEventType::ResponseCreated))
            .await
            .unwrap();
        publisher
            .send(ResponseEvent::new(ResponseEventType::ResponseCompleted))
            .await
            .unwrap();
        publisher.close();

        let first = stream.next().await.unwrap();
        let second = stream.next().await.unwrap();
        assert!(matches!(
            first.event_type,
            ResponseEventType::ResponseCreated
        ));
        assert!(matches!(
            second.event_type,
            ResponseEventType::ResponseCompleted
        ));
    }
}

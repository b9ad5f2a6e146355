//! Agent actor: the single-threaded per-agent loop that owns a
//! bounded mailbox, a ticker, a task queue, an at-most-one active-task slot,
//! and a bounded recent-task ring, and dispatches `Chat`/`Work`/`Stop`
//! messages into the generation loop.
//!
//! Grounded on the base crate's `Client` (`client.rs`) for the
//! start/stop/request-response shape, generalized from a single-shot query
//! object into a long-lived actor with its own background task. The mailbox
//! and ticker pattern has no direct analog in the base crate; it follows
//! `tokio::sync::mpsc` + `tokio::select!` as used throughout its other
//! async call sites.

use crate::confirmer::{AutoConfirmer, ConfirmMode, Confirmer};
use crate::context::{is_approaching_limit, truncate_messages};
use crate::document::SharedDocumentRepository;
use crate::environment::Environment;
use crate::events::{
    EventOrigin, EventPayload, EventPublisher, EventStream, ResponseEvent, ResponseEventType,
    TaskEventPayload, channel,
};
use crate::generation::{DEFAULT_TOOL_ITERATION_LIMIT, GenerationLoop};
use crate::hooks::Hooks;
use crate::llm::Llm;
use crate::prompt::{PromptIdentity, PromptMode, render_system_prompt};
use crate::response::Response;
use crate::task::{
    ContextEntry, RecentTaskRing, Task, TaskState, TaskStatus, parse_structured_response, resume_nudge,
};
use crate::thread::{SharedThreadRepository, Thread};
use crate::tools::Tool;
use crate::types::{Message, MessageRole};
use crate::{Error, Result};
use futures::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;

/// Default capacity of the actor's mailbox: a bounded queue of 16 messages.
pub const MAILBOX_CAPACITY: usize = 16;

/// Default ticker period driving `do_some_work` between mailbox items.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Context window assumed when deciding whether to truncate history before a
/// turn. Conservative default for local models in the 8k-32k range;
/// oversized for a given model just means truncation kicks in later than it
/// strictly needs to, never that it's skipped.
const CONTEXT_TOKEN_LIMIT: usize = 32_000;

/// How many of the most recent messages survive a truncation pass.
const CONTEXT_KEEP_RECENT: usize = 40;

/// Truncates `messages` in place once estimated token usage approaches
/// [`CONTEXT_TOKEN_LIMIT`], always preserving a leading system message.
fn truncate_if_approaching_limit(messages: &mut Vec<Message>) {
    if is_approaching_limit(messages, CONTEXT_TOKEN_LIMIT, 0.9) {
        *messages = truncate_messages(messages, CONTEXT_KEEP_RECENT, true);
    }
}

/// The configured, immutable-after-construction identity of an agent: name,
/// role description, and generation-tuning knobs. Runtime state (mailbox,
/// task queue, active task, recent-task ring) is owned exclusively by the
/// spawned loop, never stored here.
#[derive(Debug, Clone)]
pub struct AgentIdentity {
    pub name: String,
    pub goal: Option<String>,
    pub instructions: Option<String>,
    pub is_supervisor: bool,
    pub subordinates: Vec<String>,
    pub tool_iteration_limit: u32,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub date_awareness: bool,
    pub response_guidelines: Option<String>,
    pub chat_timeout: Duration,
    pub response_timeout: Duration,
    pub task_timeout: Duration,
}

impl AgentIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            goal: None,
            instructions: None,
            is_supervisor: false,
            subordinates: Vec::new(),
            tool_iteration_limit: DEFAULT_TOOL_ITERATION_LIMIT,
            temperature: 0.7,
            max_tokens: None,
            date_awareness: true,
            response_guidelines: None,
            chat_timeout: Duration::from_secs(120),
            response_timeout: Duration::from_secs(120),
            task_timeout: Duration::from_secs(600),
        }
    }

    fn prompt_identity(&self) -> PromptIdentity {
        PromptIdentity {
            name: Some(self.name.clone()),
            goal: self.goal.clone(),
            instructions: self.instructions.clone(),
            is_supervisor: self.is_supervisor,
            subordinates: self.subordinates.clone(),
        }
    }
}

/// A chat turn submitted to an agent: the new messages to append, and an
/// optional thread id to load history from / persist the result into.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub thread_id: Option<String>,
    pub user_id: Option<String>,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            thread_id: None,
            user_id: None,
        }
    }

    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }
}

/// Builds an [`Agent`]. Mirrors the base crate's builder convention
/// (`AgentOptionsBuilder` in `types.rs`), scoped to the actor's own
/// long-lived configuration surface rather than a single-shot request.
pub struct AgentBuilder {
    identity: AgentIdentity,
    llm: Option<Arc<dyn Llm>>,
    tools: HashMap<String, Arc<Tool>>,
    hooks: Hooks,
    confirmer: Arc<dyn Confirmer>,
    threads: Option<SharedThreadRepository>,
    documents: Option<SharedDocumentRepository>,
    tick_interval: Duration,
    mailbox_capacity: usize,
}

impl AgentBuilder {
    pub fn new(identity: AgentIdentity) -> Self {
        Self {
            identity,
            llm: None,
            tools: HashMap::new(),
            hooks: Hooks::new(),
            confirmer: Arc::new(AutoConfirmer::new(ConfirmMode::Auto)),
            threads: None,
            documents: None,
            tick_interval: DEFAULT_TICK_INTERVAL,
            mailbox_capacity: MAILBOX_CAPACITY,
        }
    }

    pub fn llm(mut self, llm: Arc<dyn Llm>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn tool(mut self, tool: Tool) -> Self {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
        self
    }

    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn confirmer(mut self, confirmer: Arc<dyn Confirmer>) -> Self {
        self.confirmer = confirmer;
        self
    }

    pub fn threads(mut self, threads: SharedThreadRepository) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn documents(mut self, documents: SharedDocumentRepository) -> Self {
        self.documents = Some(documents);
        self
    }

    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Builds the agent, wiring it into `environment` (if given) with a
    /// [`Weak`] handle so the pair doesn't form an `Arc` reference cycle:
    /// `Environment` holds a strong `Arc<Agent>` for every registered peer,
    /// so `Agent` must hold the environment weakly.
    pub fn build(self, environment: Option<Arc<dyn Environment>>) -> Result<Arc<Agent>> {
        let llm = self.llm.ok_or_else(|| Error::no_llm("no LLM configured"))?;
        let weak_environment = environment.as_ref().map(Arc::downgrade);
        let mut tools = self.tools;
        if self.identity.is_supervisor && !tools.contains_key("assign_work") {
            let tool = crate::delegate::delegation_tool_for(
                self.identity.name.clone(),
                weak_environment.clone(),
            );
            tools.insert(tool.name().to_string(), Arc::new(tool));
        }
        Ok(Arc::new(Agent {
            identity: self.identity,
            llm,
            tools,
            hooks: self.hooks,
            confirmer: self.confirmer,
            threads: self.threads,
            documents: self.documents,
            environment: weak_environment,
            tick_interval: self.tick_interval,
            mailbox_capacity: self.mailbox_capacity,
            running: Mutex::new(None),
        }))
    }
}

/// An addressable LLM-backed agent: a configured identity plus the shared
/// resources (LLM, tools, repositories, peer environment) its loop consults.
/// Public operations enqueue onto the running loop's mailbox; the loop itself
/// owns all mutable scheduling state.
pub struct Agent {
    identity: AgentIdentity,
    llm: Arc<dyn Llm>,
    tools: HashMap<String, Arc<Tool>>,
    hooks: Hooks,
    confirmer: Arc<dyn Confirmer>,
    threads: Option<SharedThreadRepository>,
    documents: Option<SharedDocumentRepository>,
    environment: Option<Weak<dyn Environment>>,
    tick_interval: Duration,
    mailbox_capacity: usize,
    running: Mutex<Option<RunningHandle>>,
}

struct RunningHandle {
    mailbox_tx: mpsc::Sender<ActorMessage>,
    join: JoinHandle<()>,
}

enum ActorMessage {
    Chat {
        request: ChatRequest,
        publisher: EventPublisher,
    },
    Work {
        task: Task,
        publisher: EventPublisher,
    },
    Stop {
        ack: oneshot::Sender<()>,
    },
}

impl Agent {
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    /// Idempotent: a second `start` on an already-running agent is a no-op.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Ok(());
        }
        let (mailbox_tx, mailbox_rx) = mpsc::channel(self.mailbox_capacity);
        let agent = self.clone();
        let join = tokio::spawn(run_loop(agent, mailbox_rx));
        *running = Some(RunningHandle { mailbox_tx, join });
        Ok(())
    }

    /// Enqueues a stop message, closes the mailbox, and waits for the loop
    /// to drain and exit. A second `stop` on an already-stopped agent fails
    /// with `not-running`: stopping an agent is a one-shot transition, not an
    /// idempotent one.
    pub async fn stop(&self) -> Result<()> {
        let handle = self.running.lock().await.take().ok_or(Error::NotRunning)?;
        let (ack_tx, ack_rx) = oneshot::channel();
        // A send failure means the loop already exited; proceed to join it.
        let _ = handle.mailbox_tx.send(ActorMessage::Stop { ack: ack_tx }).await;
        let _ = ack_rx.await;
        let _ = handle.join.await;
        Ok(())
    }

    async fn mailbox(&self) -> Result<mpsc::Sender<ActorMessage>> {
        self.running
            .lock()
            .await
            .as_ref()
            .map(|h| h.mailbox_tx.clone())
            .ok_or(Error::NotRunning)
    }

    /// Enqueues a chat turn and returns the stream reader immediately; the
    /// generation runs in the actor's loop.
    pub async fn chat(&self, request: ChatRequest) -> Result<EventStream> {
        let tx = self.mailbox().await?;
        let (publisher, stream) = channel(crate::events::EVENT_CHANNEL_CAPACITY);
        tx.send(ActorMessage::Chat { request, publisher })
            .await
            .map_err(|_| Error::NotRunning)?;
        Ok(stream)
    }

    /// Same contract as [`Agent::chat`] with a task instead of a chat turn.
    pub async fn work(&self, task: Task) -> Result<EventStream> {
        let tx = self.mailbox().await?;
        let (publisher, stream) = channel(crate::events::EVENT_CHANNEL_CAPACITY);
        tx.send(ActorMessage::Work { task, publisher })
            .await
            .map_err(|_| Error::NotRunning)?;
        Ok(stream)
    }

    /// Sync variant of [`Agent::chat`]: internalizes the stream and returns
    /// the final response, or the first failure event as an error.
    pub async fn create_response(&self, request: ChatRequest) -> Result<Response> {
        let mut stream = self.chat(request).await?;
        drain_to_response(&mut stream).await
    }

    /// Async variant; identical to [`Agent::chat`], kept as a distinct name
    /// for callers that think in terms of streaming a response rather than
    /// starting a chat turn.
    pub async fn stream_response(&self, request: ChatRequest) -> Result<EventStream> {
        self.chat(request).await
    }
}

/// Drains an event stream until a terminal response event, folding it into a
/// single [`Response`]. Used by both the sync chat variant and the
/// delegation tool's peer call.
pub(crate) async fn drain_to_response(stream: &mut EventStream) -> Result<Response> {
    while let Some(event) = stream.next().await {
        match event.event_type {
            ResponseEventType::ResponseCompleted => {
                if let Some(EventPayload::Response(response)) = event.payload {
                    return Ok(response);
                }
            }
            ResponseEventType::ResponseFailed => {
                return Err(Error::other(
                    event.error.unwrap_or_else(|| "generation failed".to_string()),
                ));
            }
            _ => {}
        }
    }
    Err(Error::LlmNoResponse)
}

async fn run_loop(agent: Arc<Agent>, mut mailbox_rx: mpsc::Receiver<ActorMessage>) {
    let mut ticker = tokio::time::interval(agent.tick_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let mut queue: VecDeque<(TaskState, EventPublisher)> = VecDeque::new();
    let mut active: Option<(TaskState, EventPublisher)> = None;
    let mut recent = RecentTaskRing::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            msg = mailbox_rx.recv() => {
                match msg {
                    None => break,
                    Some(ActorMessage::Stop { ack }) => {
                        let _ = ack.send(());
                        break;
                    }
                    Some(ActorMessage::Chat { request, publisher }) => {
                        handle_chat(&agent, &request, &publisher).await;
                        publisher.close();
                    }
                    Some(ActorMessage::Work { task, publisher }) => {
                        queue.push_back((TaskState::new(task), publisher));
                    }
                }
            }
        }

        do_some_work(&agent, &mut queue, &mut active, &mut recent).await;
    }
}

async fn do_some_work(
    agent: &Arc<Agent>,
    queue: &mut VecDeque<(TaskState, EventPublisher)>,
    active: &mut Option<(TaskState, EventPublisher)>,
    recent: &mut RecentTaskRing,
) {
    if active.is_none() {
        match queue.pop_front() {
            Some((mut state, publisher)) => {
                if state.is_fresh() {
                    prime_task_with_recent_summary(&mut state.task, recent);
                }
                state.status = TaskStatus::Active;
                state.paused = false;
                let _ = publish_task_event(
                    &publisher,
                    &agent.identity.name,
                    &state.task.name,
                    ResponseEventType::TaskActivated,
                    &state,
                )
                .await;
                *active = Some((state, publisher));
            }
            None => return,
        }
    }

    let (mut state, publisher) = active.take().expect("checked above");

    match handle_task(agent, &mut state).await {
        Err(err) => {
            state.status = TaskStatus::Error;
            state.last_status = err.to_string();
            let _ = publish_task_event(
                &publisher,
                &agent.identity.name,
                &state.task.name,
                ResponseEventType::TaskError,
                &state,
            )
            .await;
            publisher.close();
            recent.push(state);
        }
        Ok(()) => match state.status {
            TaskStatus::Active => {
                let _ = publish_task_event(
                    &publisher,
                    &agent.identity.name,
                    &state.task.name,
                    ResponseEventType::TaskProgress,
                    &state,
                )
                .await;
                *active = Some((state, publisher));
            }
            TaskStatus::Completed => {
                let _ = publish_task_event(
                    &publisher,
                    &agent.identity.name,
                    &state.task.name,
                    ResponseEventType::TaskCompleted,
                    &state,
                )
                .await;
                publisher.close();
                recent.push(state);
            }
            TaskStatus::Paused => {
                let _ = publish_task_event(
                    &publisher,
                    &agent.identity.name,
                    &state.task.name,
                    ResponseEventType::TaskPaused,
                    &state,
                )
                .await;
                queue.push_back((state, publisher));
            }
            TaskStatus::Blocked | TaskStatus::Error | TaskStatus::Invalid => {
                let _ = publish_task_event(
                    &publisher,
                    &agent.identity.name,
                    &state.task.name,
                    ResponseEventType::TaskError,
                    &state,
                )
                .await;
                publisher.close();
                recent.push(state);
            }
            TaskStatus::Queued => {
                // handle_task never leaves a task queued; treat as progress.
                *active = Some((state, publisher));
            }
        },
    }
}

async fn publish_task_event(
    publisher: &EventPublisher,
    agent_name: &str,
    task_name: &str,
    event_type: ResponseEventType,
    state: &TaskState,
) -> Result<()> {
    let origin = EventOrigin::agent(agent_name).with_task(task_name);
    let payload = TaskEventPayload {
        content: Some(state.last_status.clone()),
        usage: state.usage,
        status: state.status,
    };
    publisher
        .send(
            ResponseEvent::new(event_type)
                .with_origin(origin)
                .with_payload(EventPayload::Task(payload)),
        )
        .await
}

/// Builds a chat-mode system prompt, optionally loads/persists thread
/// history, runs the generation loop, and surfaces any error as a
/// `response.failed` event on `publisher` (the sync variant surfaces the same
/// failure to its caller by draining this same stream).
async fn handle_chat(agent: &Arc<Agent>, request: &ChatRequest, publisher: &EventPublisher) {
    if let Err(err) = run_chat_generation(agent, request, publisher).await {
        let origin = EventOrigin::agent(&agent.identity.name);
        let _ = publisher.send(ResponseEvent::failed(origin, &err)).await;
    }
}

async fn run_chat_generation(
    agent: &Arc<Agent>,
    request: &ChatRequest,
    publisher: &EventPublisher,
) -> Result<()> {
    let system_prompt = render_system_prompt(
        &agent.identity.prompt_identity(),
        PromptMode::Chat,
        agent.identity.response_guidelines.as_deref(),
        agent.identity.date_awareness,
    );
    let mut history = vec![Message::system(system_prompt)];

    let mut thread = match &request.thread_id {
        Some(id) => {
            let repo = agent.threads.as_ref().ok_or(Error::ThreadsNotEnabled)?;
            match repo.get_thread(id).await? {
                Some(existing) => {
                    history.extend(existing.messages.clone());
                    existing
                }
                None => Thread::new(id.clone(), request.user_id.clone()),
            }
        }
        None => Thread::new(String::new(), request.user_id.clone()),
    };

    history.extend(request.messages.clone());
    truncate_if_approaching_limit(&mut history);

    let generation = GenerationLoop::new(
        agent.llm.as_ref(),
        &agent.tools,
        agent.confirmer.as_ref(),
        &agent.hooks,
        publisher,
        &agent.identity.name,
        agent.identity.tool_iteration_limit,
        agent.identity.temperature,
        agent.identity.max_tokens,
    );
    let outcome = generation.run(history).await?;

    if let Some(id) = &request.thread_id {
        if let Some(repo) = &agent.threads {
            thread.id = id.clone();
            thread.messages = outcome
                .messages
                .into_iter()
                .filter(|m| m.role != MessageRole::System)
                .collect();
            repo.put_thread(thread).await?;
        }
    }

    Ok(())
}

/// Builds a task-mode system prompt, prepares messages (recent-task
/// summary for a fresh task, history + resume nudge otherwise), runs the
/// generation loop, and folds the parsed `<status>`/`<think>` report back
/// into `state`.
async fn handle_task(agent: &Arc<Agent>, state: &mut TaskState) -> Result<()> {
    if state.task.prompt.text.trim().is_empty() {
        return Err(Error::NoInstructions);
    }

    let system_prompt = render_system_prompt(
        &agent.identity.prompt_identity(),
        PromptMode::Task,
        agent.identity.response_guidelines.as_deref(),
        agent.identity.date_awareness,
    );

    // The generation loop's own response.* events are internal to a single
    // turn; only the task.* lifecycle events published by `do_some_work` are
    // externally observable. A background drain keeps the bounded channel
    // from filling and blocking the generation loop's publisher sends.
    let (publisher, mut discarded) = channel(crate::events::EVENT_CHANNEL_CAPACITY);
    tokio::spawn(async move { while discarded.next().await.is_some() {} });

    if state.is_fresh() {
        let context_block =
            render_task_context(agent.documents.as_ref(), &state.task.prompt.context).await?;
        let prompt_text = if context_block.is_empty() {
            state.task.prompt.text.clone()
        } else {
            format!("{context_block}\n{}", state.task.prompt.text)
        };
        state.messages.push(Message::system(system_prompt));
        state.messages.push(Message::user(prompt_text));
    } else {
        let nudge = resume_nudge(state.messages.len());
        state.messages.push(Message::user(nudge));
    }

    truncate_if_approaching_limit(&mut state.messages);

    let generation = GenerationLoop::new(
        agent.llm.as_ref(),
        &agent.tools,
        agent.confirmer.as_ref(),
        &agent.hooks,
        &publisher,
        &agent.identity.name,
        agent.identity.tool_iteration_limit,
        agent.identity.temperature,
        agent.identity.max_tokens,
    );
    let outcome = generation.run(state.messages.clone()).await?;
    state.messages = outcome.messages;
    state.usage += outcome.response.usage;

    let parsed = parse_structured_response(&outcome.response.text());
    state.status = parsed.status;
    state.last_status = parsed.text;
    Ok(())
}

/// Renders a task prompt's context entries into a block prepended to the
/// first user message. `document:<name>` entries are the only ones that
/// consult a repository; text/path/url entries are inlined as-is, since the
/// core never reads files or fetches URLs itself.
async fn render_task_context(
    documents: Option<&SharedDocumentRepository>,
    context: &[ContextEntry],
) -> Result<String> {
    if context.is_empty() {
        return Ok(String::new());
    }
    let mut block = String::from("## Context\n\n");
    for entry in context {
        match entry {
            ContextEntry::Text(text) => {
                block.push_str(text);
                block.push('\n');
            }
            ContextEntry::Path(path) => {
                block.push_str(&format!("(file reference: {})\n", path.display()));
            }
            ContextEntry::Url(url) => {
                block.push_str(&format!("(url reference: {url})\n"));
            }
            ContextEntry::Document(name) => {
                let repo = documents
                    .ok_or_else(|| Error::document_not_found(name.clone()))?;
                let document = repo.get_document(name).await?;
                block.push_str(&format!(
                    "### document:{name} ({})\n{}\n",
                    document.media_type,
                    String::from_utf8_lossy(&document.content)
                ));
            }
        }
    }
    Ok(block)
}

/// Prepends a recent-task-ring summary to a fresh task's prompt text, so the
/// first activation of a new task carries a compressed view of recent work.
/// Called from `do_some_work` right before a fresh task's first activation,
/// since `handle_task` itself no longer has access to the ring once a task
/// is in the active slot.
fn prime_task_with_recent_summary(task: &mut Task, recent: &RecentTaskRing) {
    if recent.is_empty() {
        return;
    }
    let summary = recent.summarize();
    task.prompt.text = format!("Recent tasks:\n{summary}\n\n{}", task.prompt.text);
}

/// A `Weak` handle to the peer environment, for `delegate.rs` to capture in
/// the `assign_work` tool's closure. Kept weak past this point too: the
/// closure upgrades it at call time rather than holding a strong `Arc`,
/// which would turn the tool (owned by this very agent) into another leg of
/// the reference cycle this type already avoids on `Agent` itself.
pub(crate) fn environment_handle(agent: &Agent) -> Option<Weak<dyn Environment>> {
    agent.environment.clone()
}

/// Test-only helpers shared with `environment.rs`'s test module, which needs
/// a minimally-configured, never-started agent purely to exercise peer
/// registration.
#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::llm::GenerateOptions;
    use std::future::Future;
    use std::pin::Pin;

    struct UnreachableLlm;

    impl Llm for UnreachableLlm {
        fn name(&self) -> &str {
            "unreachable"
        }

        fn generate<'a>(
            &'a self,
            _messages: &'a [Message],
            _opts: &'a GenerateOptions,
        ) -> Pin<Box<dyn Future<Output = Result<Response>> + Send + 'a>> {
            Box::pin(async move { Err(Error::other("stub agent has no LLM")) })
        }
    }

    pub fn stub_agent(name: &str) -> Arc<Agent> {
        AgentBuilder::new(AgentIdentity::new(name))
            .llm(Arc::new(UnreachableLlm))
            .build(None)
            .expect("stub agent builds")
    }
}

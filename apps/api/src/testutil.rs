//! Deterministic in-process stand-ins for the external collaborators:
//! a fixed-vector embedder, a manual clock, a scripted chat model, and a
//! canned link-search service. No test touches the network.

use async_trait::async_trait;
use futures_util::stream;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::llm::{ChatChunk, ChatMessage, ChatModel, ChatStream, Embedder, LlmError, ToolDescriptor};
use crate::search::{LinkSearch, SearchError};
use crate::store::freshness::Clock;

/// Embedder returning fixed vectors per text, with an optional default and a
/// deterministic hash fallback.
pub struct TestEmbedder {
    vectors: Mutex<HashMap<String, Vec<f32>>>,
    default: Mutex<Option<Vec<f32>>>,
    fail_next: AtomicBool,
}

impl TestEmbedder {
    pub fn new() -> Self {
        Self {
            vectors: Mutex::new(HashMap::new()),
            default: Mutex::new(None),
            fail_next: AtomicBool::new(false),
        }
    }

    pub fn set(&self, text: &str, vector: Vec<f32>) {
        self.vectors.lock().unwrap().insert(text.to_string(), vector);
    }

    /// Vector returned for any text without an explicit mapping. Makes every
    /// record maximally similar to every query, which keeps retrieval tests
    /// about filtering rather than ranking.
    pub fn set_default(&self, vector: Vec<f32>) {
        *self.default.lock().unwrap() = Some(vector);
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Embedder for TestEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(LlmError::EmptyContent);
        }
        if let Some(vector) = self.vectors.lock().unwrap().get(text) {
            return Ok(vector.clone());
        }
        if let Some(vector) = self.default.lock().unwrap().clone() {
            return Ok(vector);
        }
        // Deterministic 8-dim fold of the bytes.
        let mut vector = vec![0.0f32; 8];
        for (i, b) in text.bytes().enumerate() {
            vector[i % 8] += f32::from(b) / 255.0;
        }
        Ok(vector)
    }
}

/// Clock whose time only moves when a test advances it.
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    pub fn advance(&self, delta_millis: i64) {
        self.millis.fetch_add(delta_millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// Chat model replaying scripted replies for `call` and scripted chunk
/// streams for `chat_stream`, recording everything it was asked.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    streams: Mutex<VecDeque<Vec<ChatChunk>>>,
    calls: Mutex<Vec<(String, String)>>,
    streamed: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<String, LlmError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            streams: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            streamed: Mutex::new(Vec::new()),
        }
    }

    pub fn push_stream(&self, chunks: Vec<ChatChunk>) {
        self.streams.lock().unwrap().push_back(chunks);
    }

    /// Every `(system, user)` pair `call` received, in order.
    pub fn recorded_calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// The message list of every `chat_stream` invocation, in order.
    pub fn streamed_messages(&self) -> Vec<Vec<ChatMessage>> {
        self.streamed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn call(&self, system: &str, user: &str) -> Result<String, LlmError> {
        self.calls
            .lock()
            .unwrap()
            .push((system.to_string(), user.to_string()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyContent))
    }

    async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolDescriptor],
    ) -> Result<ChatStream, LlmError> {
        self.streamed.lock().unwrap().push(messages.to_vec());
        let chunks = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();
        Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok))))
    }
}

/// Link-search collaborator with canned links, pages, and per-page delays.
pub struct StubLinkSearch {
    links: Mutex<Vec<String>>,
    pages: Mutex<HashMap<String, String>>,
    delays: Mutex<HashMap<String, Duration>>,
    fail_links: AtomicBool,
}

impl StubLinkSearch {
    pub fn new(links: Vec<String>) -> Self {
        Self {
            links: Mutex::new(links),
            pages: Mutex::new(HashMap::new()),
            delays: Mutex::new(HashMap::new()),
            fail_links: AtomicBool::new(false),
        }
    }

    pub fn set_links(&self, links: Vec<String>) {
        *self.links.lock().unwrap() = links;
    }

    pub fn set_page(&self, url: &str, html: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), html.to_string());
    }

    pub fn set_delay(&self, url: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(url.to_string(), delay);
    }

    pub fn fail_links(&self) {
        self.fail_links.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl LinkSearch for StubLinkSearch {
    async fn links(&self, _query: &str, size: usize) -> Result<Vec<String>, SearchError> {
        if self.fail_links.load(Ordering::SeqCst) {
            return Err(SearchError::Status(503));
        }
        let links = self.links.lock().unwrap().clone();
        Ok(links.into_iter().take(size).collect())
    }

    async fn page(&self, url: &str) -> Result<String, SearchError> {
        let delay = self.delays.lock().unwrap().get(url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let page = self.pages.lock().unwrap().get(url).cloned();
        page.ok_or(SearchError::Status(404))
    }
}

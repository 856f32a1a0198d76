//! Chat engine: per-conversation memory, the advisor chain, and the
//! tool-dispatch loop around the streaming model call.

use futures_util::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::llm::{ChatMessage, ChatModel, ToolCall};
use crate::tools::ToolRegistry;

pub mod advisors;

use advisors::{Advisor, ChatRequest};

/// Upper bound on dispatch rounds for one user message; past it the loop
/// stops feeding tool output back to the model.
pub const MAX_TOOL_ROUNDS: usize = 4;

/// Exchanges kept per conversation.
pub const MEMORY_WINDOW: usize = 5;

/// Rolling window of (user, assistant) exchanges keyed by chat id.
pub struct ChatMemory {
    inner: Mutex<HashMap<String, VecDeque<(String, String)>>>,
    window: usize,
}

impl ChatMemory {
    pub fn new(window: usize) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            window,
        }
    }

    pub fn record(&self, chat_id: &str, user: &str, assistant: &str) {
        let mut inner = self.inner.lock().expect("chat memory mutex poisoned");
        let history = inner.entry(chat_id.to_string()).or_default();
        history.push_back((user.to_string(), assistant.to_string()));
        while history.len() > self.window {
            history.pop_front();
        }
    }

    pub fn history(&self, chat_id: &str) -> Vec<(String, String)> {
        let inner = self.inner.lock().expect("chat memory mutex poisoned");
        inner
            .get(chat_id)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }
}

pub struct ChatEngine {
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
    advisors: Vec<Arc<dyn Advisor>>,
    memory: ChatMemory,
    system_prompt: String,
}

impl ChatEngine {
    pub fn new(
        model: Arc<dyn ChatModel>,
        tools: ToolRegistry,
        mut advisors: Vec<Arc<dyn Advisor>>,
        system_prompt: String,
    ) -> Self {
        advisors.sort_by_key(|a| a.order());
        Self {
            model,
            tools,
            advisors,
            memory: ChatMemory::new(MEMORY_WINDOW),
            system_prompt,
        }
    }

    /// Produces the streamed reply for one user message. The stream is lazy,
    /// finite, and non-restartable; the transport layer consumes it as SSE.
    pub fn respond(self: &Arc<Self>, chat_id: String, message: String) -> ReceiverStream<String> {
        let (tx, rx) = mpsc::channel(32);
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = engine.run(&chat_id, &message, &tx).await {
                warn!("chat turn failed: {e}");
            }
        });
        ReceiverStream::new(rx)
    }

    async fn run(
        &self,
        chat_id: &str,
        message: &str,
        tx: &mpsc::Sender<String>,
    ) -> Result<(), AppError> {
        info!(chat_id, "message received");

        let mut request = ChatRequest {
            chat_id: chat_id.to_string(),
            system_text: self.system_prompt.clone(),
            user_text: message.to_string(),
        };
        // Ascending order before the call.
        for advisor in &self.advisors {
            request = advisor.before(request).await;
        }

        let mut messages = vec![ChatMessage::system(&request.system_text)];
        for (user, assistant) in self.memory.history(chat_id) {
            messages.push(ChatMessage::user(user));
            messages.push(ChatMessage::assistant(assistant));
        }
        messages.push(ChatMessage::user(&request.user_text));

        let descriptors = self.tools.descriptors();
        let mut reply = String::new();

        for round in 0..MAX_TOOL_ROUNDS {
            let mut stream = self
                .model
                .chat_stream(&messages, &descriptors)
                .await
                .map_err(|e| AppError::Llm(e.to_string()))?;

            let mut content = String::new();
            let mut tool_calls: Vec<ToolCall> = Vec::new();

            while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        warn!("chat stream interrupted: {e}");
                        break;
                    }
                };
                tool_calls.extend(chunk.tool_calls);
                if !chunk.content.is_empty() {
                    // Forward live unless this round turned into a tool round.
                    if tool_calls.is_empty() {
                        let _ = tx.send(chunk.content.clone()).await;
                    }
                    content.push_str(&chunk.content);
                }
            }

            if tool_calls.is_empty() {
                reply = content;
                break;
            }

            debug!("round {round}: dispatching {} tool calls", tool_calls.len());
            let mut assistant = ChatMessage::assistant(content);
            assistant.tool_calls = tool_calls.clone();
            messages.push(assistant);

            for call in tool_calls {
                let output = self
                    .tools
                    .dispatch(&call.function.name, &call.function.arguments)
                    .await;
                messages.push(ChatMessage::tool(output));
            }
        }

        // Descending order after the call, over the aggregated reply.
        for advisor in self.advisors.iter().rev() {
            reply = advisor.after(reply);
        }
        self.memory.record(chat_id, message, &reply);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatChunk, Role};
    use crate::testutil::ScriptedModel;
    use crate::tools::{string_arg, Tool};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex as StdMutex;

    fn content_chunk(text: &str) -> ChatChunk {
        ChatChunk {
            content: text.to_string(),
            tool_calls: Vec::new(),
            done: false,
        }
    }

    fn tool_chunk(name: &str, arguments: Value) -> ChatChunk {
        ChatChunk {
            content: String::new(),
            tool_calls: vec![ToolCall {
                function: crate::llm::ToolCallFunction {
                    name: name.to_string(),
                    arguments,
                },
            }],
            done: false,
        }
    }

    struct MarkerAdvisor {
        marker: &'static str,
        order: i32,
        log: Arc<StdMutex<Vec<String>>>,
    }

    #[async_trait]
    impl Advisor for MarkerAdvisor {
        fn name(&self) -> &'static str {
            "MarkerAdvisor"
        }

        fn order(&self) -> i32 {
            self.order
        }

        async fn before(&self, mut request: ChatRequest) -> ChatRequest {
            self.log
                .lock()
                .unwrap()
                .push(format!("before:{}", self.marker));
            request.system_text.push_str(self.marker);
            request
        }

        fn after(&self, response: String) -> String {
            self.log
                .lock()
                .unwrap()
                .push(format!("after:{}", self.marker));
            response
        }
    }

    struct StackTool;

    #[async_trait]
    impl Tool for StackTool {
        fn descriptor(&self) -> crate::llm::ToolDescriptor {
            crate::llm::ToolDescriptor::function(
                "fetch_vacancies",
                "test tool",
                json!({"type":"object"}),
            )
        }

        async fn invoke(&self, arguments: &Value) -> String {
            format!("вакансии для {}", string_arg(arguments, "stack"))
        }
    }

    async fn collect(stream: ReceiverStream<String>) -> String {
        use futures_util::StreamExt;
        stream.collect::<Vec<_>>().await.join("")
    }

    #[test]
    fn test_memory_caps_exchanges_per_chat() {
        let memory = ChatMemory::new(MEMORY_WINDOW);
        for i in 0..8 {
            memory.record("c1", &format!("вопрос {i}"), &format!("ответ {i}"));
        }
        let history = memory.history("c1");
        assert_eq!(history.len(), 5);
        assert_eq!(history[0].0, "вопрос 3");
        assert!(memory.history("c2").is_empty());
    }

    #[tokio::test]
    async fn test_plain_reply_streams_and_is_remembered() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        model.push_stream(vec![content_chunk("Привет"), content_chunk(", мир")]);

        let engine = Arc::new(ChatEngine::new(
            model,
            ToolRegistry::new(),
            vec![],
            "система".to_string(),
        ));
        let reply = collect(engine.respond("c1".into(), "привет".into())).await;
        assert_eq!(reply, "Привет, мир");

        // Wait for the spawned turn to record memory.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(engine.memory.history("c1"), vec![(
            "привет".to_string(),
            "Привет, мир".to_string()
        )]);
    }

    #[tokio::test]
    async fn test_advisors_apply_ascending_then_descending() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let model = Arc::new(ScriptedModel::new(vec![]));
        model.push_stream(vec![content_chunk("ок")]);

        let engine = Arc::new(ChatEngine::new(
            model.clone(),
            ToolRegistry::new(),
            vec![
                Arc::new(MarkerAdvisor {
                    marker: "<B>",
                    order: 1,
                    log: log.clone(),
                }),
                Arc::new(MarkerAdvisor {
                    marker: "<A>",
                    order: 0,
                    log: log.clone(),
                }),
            ],
            "система".to_string(),
        ));
        collect(engine.respond("c1".into(), "привет".into())).await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(
            *log.lock().unwrap(),
            vec!["before:<A>", "before:<B>", "after:<B>", "after:<A>"]
        );

        // The system text the model saw carries the markers in order.
        let calls = model.streamed_messages();
        assert!(calls[0][0].content.ends_with("<A><B>"));
    }

    #[tokio::test]
    async fn test_tool_round_feeds_output_back_and_streams_final_reply() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        model.push_stream(vec![tool_chunk("fetch_vacancies", json!({"stack": "Rust"}))]);
        model.push_stream(vec![content_chunk("Нашёл вакансии по Rust")]);

        let engine = Arc::new(ChatEngine::new(
            model.clone(),
            ToolRegistry::new().register(Arc::new(StackTool)),
            vec![],
            "система".to_string(),
        ));
        let reply = collect(engine.respond("c1".into(), "найди вакансии".into())).await;
        assert_eq!(reply, "Нашёл вакансии по Rust");

        let calls = model.streamed_messages();
        assert_eq!(calls.len(), 2);
        let second = &calls[1];
        let tool_message = second
            .iter()
            .find(|m| m.role == Role::Tool)
            .expect("tool message appended");
        assert_eq!(tool_message.content, "вакансии для Rust");
    }

    #[tokio::test]
    async fn test_tool_rounds_are_capped() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        for _ in 0..MAX_TOOL_ROUNDS + 2 {
            model.push_stream(vec![tool_chunk("fetch_vacancies", json!({"stack": "Go"}))]);
        }

        let engine = Arc::new(ChatEngine::new(
            model.clone(),
            ToolRegistry::new().register(Arc::new(StackTool)),
            vec![],
            "система".to_string(),
        ));
        let reply = collect(engine.respond("c1".into(), "найди".into())).await;
        assert!(reply.is_empty());
        assert_eq!(model.streamed_messages().len(), MAX_TOOL_ROUNDS);
    }
}

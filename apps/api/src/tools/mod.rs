//! Model-invokable tools. Each tool carries a JSON-schema descriptor
//! registered with the chat call and an `invoke` entry point dispatched when
//! the model requests it. Tool output is plain text fed back as a tool-role
//! message; a tool never fails the surrounding chat.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::llm::ToolDescriptor;

pub mod family;
pub mod work;

#[async_trait]
pub trait Tool: Send + Sync {
    fn descriptor(&self) -> ToolDescriptor;
    async fn invoke(&self, arguments: &Value) -> String;
}

/// Registry of the tools exposed to the model.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    /// Dispatches one tool call by name. Unknown names yield a fixed reply
    /// instead of an error so a hallucinated call cannot break the loop.
    pub async fn dispatch(&self, name: &str, arguments: &Value) -> String {
        match self
            .tools
            .iter()
            .find(|t| t.descriptor().function.name == name)
        {
            Some(tool) => tool.invoke(arguments).await,
            None => {
                warn!("model requested unknown tool: {name}");
                format!("Инструмент \"{name}\" не найден.")
            }
        }
    }
}

/// Pulls a string argument out of the tool-call arguments object, falling
/// back to the raw arguments when the model sends a bare string.
pub fn string_arg(arguments: &Value, key: &str) -> String {
    match arguments.get(key).and_then(Value::as_str) {
        Some(s) => s.to_string(),
        None => arguments.as_str().unwrap_or_default().to_string(),
    }
}

use crate::agent::error::ToolFailure;
use crate::traits::{Message, Tool, ToolRequest, ToolResult, ToolSpec};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Read-only catalog of callable tools, built before a run starts.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `tool`, replacing any earlier tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub async fn invoke(
        &self,
        tool: &dyn Tool,
        args: serde_json::Value,
        timeout: Duration,
    ) -> Result<ToolResult, ToolFailure> {
        match tokio::time::timeout(timeout, tool.execute(args)).await {
            Ok(Ok(result)) if result.success => Ok(result),
            Ok(Ok(result)) => Err(ToolFailure::Execution {
                reason: result
                    .error
                    .unwrap_or_else(|| "tool reported failure".to_string()),
            }),
            Ok(Err(e)) => Err(ToolFailure::Execution {
                reason: format!("{e:#}"),
            }),
            Err(_) => Err(ToolFailure::Timeout {
                name: tool.name().to_string(),
                secs: timeout.as_secs_f64(),
            }),
        }
    }

    /// Runs one request and turns the outcome into its tool-result message.
    pub async fn execute(&self, request: &ToolRequest, timeout: Duration) -> Message {
        let outcome = match self.resolve(&request.name) {
            Some(tool) => {
                self.invoke(tool.as_ref(), request.arguments.clone(), timeout)
                    .await
            }
            None => Err(ToolFailure::NotFound {
                name: request.name.clone(),
            }),
        };

        match outcome {
            Ok(result) => {
                debug!(tool = %request.name, id = %request.id, "tool succeeded");
                Message::tool_result(&request.id, result.output)
            }
            Err(failure) => {
                warn!(tool = %request.name, id = %request.id, %failure, "tool failed");
                Message::tool_failure(&request.id, failure.to_string())
            }
        }
    }
}

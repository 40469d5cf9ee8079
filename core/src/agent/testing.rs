//! Fakes for driving the loop without a network backend.

use crate::traits::{ChatRequest, ChatResponse, Message, Provider, Tool, ToolRequest, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub enum Reply {
    Respond(ChatResponse),
    Fail(String),
    Hang,
}

/// Answers advisory calls (no tool catalog) with a fixed text and model
/// calls (tool catalog present) from a queue. An empty queue answers "done".
pub struct ScriptedProvider {
    model_replies: Mutex<VecDeque<Reply>>,
    calls: AtomicUsize,
    advisory_calls: AtomicUsize,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    pub fn new(model_replies: Vec<Reply>) -> Self {
        Self {
            model_replies: Mutex::new(model_replies.into()),
            calls: AtomicUsize::new(0),
            advisory_calls: AtomicUsize::new(0),
            seen: Mutex::new(vec![]),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn advisory_calls(&self) -> usize {
        self.advisory_calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<Vec<Message>> {
        self.seen.lock().unwrap().clone()
    }
}

pub fn answer(text: &str) -> Reply {
    Reply::Respond(ChatResponse::text(text))
}

pub fn call(id: &str, name: &str, arguments: serde_json::Value) -> Reply {
    calls(vec![ToolRequest::new(id, name, arguments)])
}

pub fn calls(requests: Vec<ToolRequest>) -> Reply {
    Reply::Respond(ChatResponse {
        text: None,
        tool_calls: requests,
    })
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn chat(&self, request: ChatRequest<'_>) -> anyhow::Result<ChatResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.messages.to_vec());

        if request.tools.is_none() {
            let n = self.advisory_calls.fetch_add(1, Ordering::SeqCst);
            return Ok(ChatResponse::text(format!("advisory {n}")));
        }

        let reply = self.model_replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(message)) => Err(anyhow::anyhow!(message)),
            Some(Reply::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            None => Ok(ChatResponse::text("done")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Returns its arguments as output.
pub struct EchoTool {
    name: String,
    invocations: AtomicUsize,
}

impl EchoTool {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            invocations: AtomicUsize::new(0),
        }
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Echo the arguments back"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({"type": "object"})
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(ToolResult::success(args.to_string()))
    }
}

pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "failing"
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({"type": "object"})
    }

    async fn execute(&self, _args: serde_json::Value) -> anyhow::Result<ToolResult> {
        anyhow::bail!("backing store unavailable")
    }
}

pub struct SlowTool {
    delay: Duration,
}

impl SlowTool {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        "slow"
    }

    fn description(&self) -> &str {
        "Sleeps before answering"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({"type": "object"})
    }

    async fn execute(&self, _args: serde_json::Value) -> anyhow::Result<ToolResult> {
        tokio::time::sleep(self.delay).await;
        Ok(ToolResult::success("finally"))
    }
}

use crate::agent::phase::AdvisoryPhase;
use crate::traits::Message;
use chrono::{DateTime, SecondsFormat, Utc};

pub const SYSTEM_TIME_PLACEHOLDER: &str = "{system_time}";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.\n\nSystem time: {system_time}";

/// Assembles the message lists sent to the backend by each phase.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    system_prompt: String,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

impl ContextBuilder {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
        }
    }

    pub fn render_system_prompt(&self, now: DateTime<Utc>) -> String {
        self.system_prompt.replace(
            SYSTEM_TIME_PLACEHOLDER,
            &now.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
    }

    /// System prompt, then the whole history.
    pub fn model_call_messages(&self, history: &[Message], now: DateTime<Utc>) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(self.render_system_prompt(now)));
        messages.extend_from_slice(history);
        messages
    }

    /// Persona, the whole history, then the phase instruction. The
    /// instruction is never written back into the conversation.
    pub fn advisory_messages(&self, phase: &AdvisoryPhase, history: &[Message]) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(phase.system_prompt.clone()));
        messages.extend_from_slice(history);
        messages.push(Message::user(phase.instruction.clone()));
        messages
    }
}

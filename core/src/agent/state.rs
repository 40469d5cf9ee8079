use crate::traits::{Message, Role};

/// Append-only history plus the remaining step budget.
///
/// Only the loop driver holds a `ConversationState`; phases and the router
/// work from a [`Snapshot`]. Each append is one phase transition and costs
/// exactly one step, however many messages it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationState {
    messages: Vec<Message>,
    steps_remaining: usize,
}

impl ConversationState {
    pub fn new(user_message: impl Into<String>, step_budget: usize) -> Self {
        Self {
            messages: vec![Message::user(user_message)],
            steps_remaining: step_budget,
        }
    }

    pub fn append(&mut self, message: Message) {
        self.append_all(std::iter::once(message));
    }

    pub fn append_all(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
        self.steps_remaining = self.steps_remaining.saturating_sub(1);
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            messages: &self.messages,
            steps_remaining: self.steps_remaining,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn steps_remaining(&self) -> usize {
        self.steps_remaining
    }

    pub fn is_last_step(&self) -> bool {
        self.steps_remaining == 0
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub messages: &'a [Message],
    pub steps_remaining: usize,
}

impl<'a> Snapshot<'a> {
    pub fn is_last_step(&self) -> bool {
        self.steps_remaining == 0
    }

    /// The phase about to run consumes the last permitted step.
    pub fn is_final_step(&self) -> bool {
        self.steps_remaining <= 1
    }

    pub fn last(&self) -> Option<&'a Message> {
        self.messages.last()
    }

    /// The tail message, if it is an agent message.
    pub fn last_agent(&self) -> Option<&'a Message> {
        self.messages.last().filter(|m| m.role == Role::Agent)
    }
}

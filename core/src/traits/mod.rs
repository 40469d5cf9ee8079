pub mod provider;
pub mod tool;

pub use provider::{ChatRequest, ChatResponse, Message, Provider, Role, ToolRequest};
pub use tool::{Tool, ToolResult, ToolSpec};

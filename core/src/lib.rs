pub mod agent;
pub mod config;
pub mod providers;
pub mod tools;
pub mod traits;

pub use agent::{AgentLoop, LoopError, RunOutcome, Termination, ToolRegistry};
pub use config::*;
pub use providers::*;
pub use traits::*;

pub mod context;
pub mod error;
pub mod loop_;
pub mod phase;
pub mod registry;
pub mod router;
pub mod state;

#[cfg(test)]
mod proptests;
#[cfg(test)]
pub(crate) mod testing;

pub use context::ContextBuilder;
pub use error::{LoopError, ToolFailure};
pub use loop_::{AgentLoop, BUDGET_EXHAUSTED_MESSAGE, RunOutcome};
pub use phase::{AdvisoryPhase, Phase, PhasePlan};
pub use registry::ToolRegistry;
pub use router::{Route, Termination, route};
pub use state::{ConversationState, Snapshot};

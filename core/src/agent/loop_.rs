use crate::agent::context::ContextBuilder;
use crate::agent::error::LoopError;
use crate::agent::phase::{MODEL_CALL, Phase, PhasePlan, TOOL_EXEC};
use crate::agent::registry::ToolRegistry;
use crate::agent::router::{Route, Termination, route};
use crate::agent::state::{ConversationState, Snapshot};
use crate::traits::{ChatRequest, Message, Provider, Role, ToolSpec};
use futures_util::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

pub const DEFAULT_STEP_BUDGET: usize = 25;
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

pub const BUDGET_EXHAUSTED_MESSAGE: &str =
    "Sorry, I could not find an answer to your question in the specified number of steps.";

/// The state a run ended with and why it ended.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub state: ConversationState,
    pub termination: Termination,
}

impl RunOutcome {
    /// Text to show the user. Budget exhaustion always yields the apology,
    /// including when an advisory phase used up the last step.
    pub fn final_text(&self) -> &str {
        match self.termination {
            Termination::BudgetExhausted => BUDGET_EXHAUSTED_MESSAGE,
            Termination::Completed | Termination::Cancelled => self
                .state
                .messages()
                .iter()
                .rev()
                .find(|m| m.role == Role::Agent)
                .map(|m| m.content.as_str())
                .unwrap_or(""),
        }
    }

    pub fn messages(&self) -> &[Message] {
        self.state.messages()
    }
}

fn budget_notice() -> Message {
    let mut message = Message::agent(BUDGET_EXHAUSTED_MESSAGE).with_phase(MODEL_CALL);
    message.budget_notice = true;
    message
}

pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    context_builder: ContextBuilder,
    tool_registry: Arc<ToolRegistry>,
    plan: PhasePlan,
    step_budget: usize,
    tool_timeout: Duration,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        context_builder: ContextBuilder,
        tool_registry: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            provider,
            context_builder,
            tool_registry,
            plan: PhasePlan::default(),
            step_budget: DEFAULT_STEP_BUDGET,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_plan(mut self, plan: PhasePlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn with_step_budget(mut self, step_budget: usize) -> Self {
        self.step_budget = step_budget;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    /// Runs with the configured budget and returns the user-facing answer.
    pub async fn process(&self, message: &str) -> Result<String, LoopError> {
        let outcome = self
            .run(message, self.step_budget, CancellationToken::new())
            .await?;
        Ok(outcome.final_text().to_string())
    }

    pub async fn run(
        &self,
        message: &str,
        step_budget: usize,
        cancel: CancellationToken,
    ) -> Result<RunOutcome, LoopError> {
        if step_budget == 0 {
            return Err(LoopError::InvalidBudget);
        }

        let run_id = uuid::Uuid::new_v4();
        let span = info_span!("run", %run_id, provider = self.provider.name());
        self.drive(message, step_budget, cancel)
            .instrument(span)
            .await
            .inspect_err(|e| error!(kind = e.kind(), error = %e, "run aborted"))
    }

    async fn drive(
        &self,
        message: &str,
        step_budget: usize,
        cancel: CancellationToken,
    ) -> Result<RunOutcome, LoopError> {
        info!(step_budget, tools = self.tool_registry.len(), "run started");

        let catalog = self.tool_registry.specs();
        let mut state = ConversationState::new(message, step_budget);
        let mut phase = self.plan.initial();

        loop {
            let delta = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                delta = self.step(phase, state.snapshot(), &catalog) => Some(delta?),
            };

            // A result that raced past cancellation is discarded.
            let Some(delta) = delta.filter(|_| !cancel.is_cancelled()) else {
                info!(phase = self.plan.name(phase), "run cancelled");
                return Ok(RunOutcome {
                    state,
                    termination: Termination::Cancelled,
                });
            };

            state.append_all(delta);

            match route(&self.plan, phase, &state.snapshot())? {
                Route::Continue(next) => {
                    debug!(
                        from = self.plan.name(phase),
                        to = self.plan.name(next),
                        steps_remaining = state.steps_remaining(),
                        "route"
                    );
                    phase = next;
                }
                Route::Finish(termination) => {
                    if termination == Termination::BudgetExhausted {
                        warn!(phase = self.plan.name(phase), "step budget exhausted");
                    }
                    info!(
                        ?termination,
                        messages = state.messages().len(),
                        "run finished"
                    );
                    return Ok(RunOutcome { state, termination });
                }
            }
        }
    }

    async fn step(
        &self,
        phase: Phase,
        snapshot: Snapshot<'_>,
        catalog: &[ToolSpec],
    ) -> Result<Vec<Message>, LoopError> {
        debug!(
            phase = self.plan.name(phase),
            steps_remaining = snapshot.steps_remaining,
            "phase started"
        );

        match phase {
            Phase::ModelCall => Ok(vec![self.model_call(snapshot, catalog).await?]),
            Phase::ToolExec => self.execute_tools(snapshot).await,
            advisory => {
                let spec = self
                    .plan
                    .advisory(advisory)
                    .ok_or_else(|| LoopError::UnknownPhase {
                        phase: advisory.to_string(),
                    })?;
                let messages = self.context_builder.advisory_messages(spec, snapshot.messages);
                let response = self
                    .provider
                    .chat(ChatRequest {
                        messages: &messages,
                        tools: None,
                    })
                    .await
                    .map_err(|source| LoopError::BackendUnavailable {
                        phase: spec.name.clone(),
                        source,
                    })?;

                if response.has_tool_calls() {
                    debug!(phase = %spec.name, "dropping tool requests from advisory reply");
                }
                Ok(vec![
                    Message::agent(response.text.unwrap_or_default()).with_phase(&spec.name),
                ])
            }
        }
    }

    async fn model_call(
        &self,
        snapshot: Snapshot<'_>,
        catalog: &[ToolSpec],
    ) -> Result<Message, LoopError> {
        let messages = self
            .context_builder
            .model_call_messages(snapshot.messages, chrono::Utc::now());
        let response = self
            .provider
            .chat(ChatRequest {
                messages: &messages,
                tools: Some(catalog),
            })
            .await
            .map_err(|source| LoopError::BackendUnavailable {
                phase: MODEL_CALL.to_string(),
                source,
            })?;

        if snapshot.is_final_step() && response.has_tool_calls() {
            return Ok(budget_notice());
        }

        let mut seen = HashSet::new();
        if let Some(dup) = response.tool_calls.iter().find(|r| !seen.insert(r.id.as_str())) {
            return Err(LoopError::DuplicateToolRequest { id: dup.id.clone() });
        }

        Ok(
            Message::agent_with_tool_requests(response.text.unwrap_or_default(), response.tool_calls)
                .with_phase(MODEL_CALL),
        )
    }

    /// Every request of the tail agent message runs concurrently; results
    /// come back in request order.
    async fn execute_tools(&self, snapshot: Snapshot<'_>) -> Result<Vec<Message>, LoopError> {
        let agent = snapshot
            .last_agent()
            .ok_or_else(|| LoopError::MalformedRouterInput {
                phase: TOOL_EXEC.to_string(),
                expected: Role::Agent,
                found: snapshot
                    .last()
                    .map_or_else(|| "empty history".to_string(), |m| m.role.to_string()),
            })?;

        let pending = agent
            .tool_requests
            .iter()
            .map(|request| self.tool_registry.execute(request, self.tool_timeout));
        Ok(join_all(pending).await)
    }
}

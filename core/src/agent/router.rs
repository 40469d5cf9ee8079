use crate::agent::error::LoopError;
use crate::agent::phase::{Phase, PhasePlan};
use crate::agent::state::Snapshot;
use crate::traits::{Message, Role};

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The model answered without requesting tools.
    Completed,
    BudgetExhausted,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Continue(Phase),
    Finish(Termination),
}

/// Picks the step after `phase` has appended its output.
///
/// Pure: the result depends only on the arguments. Budget exhaustion is
/// checked before the one content-driven edge (model call to tools).
pub fn route(plan: &PhasePlan, phase: Phase, snapshot: &Snapshot<'_>) -> Result<Route, LoopError> {
    match phase {
        Phase::BeforeAction(i) => Ok(budget_gate(snapshot, || {
            if i + 1 < plan.before_action.len() {
                Phase::BeforeAction(i + 1)
            } else {
                Phase::ModelCall
            }
        })),
        Phase::ModelCall => {
            let last = expect_role(plan, phase, snapshot, Role::Agent)?;
            if last.budget_notice {
                return Ok(Route::Finish(Termination::BudgetExhausted));
            }
            if !last.has_tool_requests() {
                return Ok(Route::Finish(Termination::Completed));
            }
            Ok(budget_gate(snapshot, || Phase::ToolExec))
        }
        Phase::ToolExec => {
            expect_role(plan, phase, snapshot, Role::ToolResult)?;
            Ok(budget_gate(snapshot, || {
                if plan.after_tools.is_empty() {
                    plan.initial()
                } else {
                    Phase::AfterTools(0)
                }
            }))
        }
        Phase::AfterTools(i) => Ok(budget_gate(snapshot, || {
            if i + 1 < plan.after_tools.len() {
                Phase::AfterTools(i + 1)
            } else {
                plan.initial()
            }
        })),
    }
}

fn budget_gate(snapshot: &Snapshot<'_>, next: impl FnOnce() -> Phase) -> Route {
    if snapshot.is_last_step() {
        Route::Finish(Termination::BudgetExhausted)
    } else {
        Route::Continue(next())
    }
}

fn expect_role<'a>(
    plan: &PhasePlan,
    phase: Phase,
    snapshot: &Snapshot<'a>,
    expected: Role,
) -> Result<&'a Message, LoopError> {
    match snapshot.last() {
        Some(message) if message.role == expected => Ok(message),
        other => Err(LoopError::MalformedRouterInput {
            phase: plan.name(phase).to_string(),
            expected,
            found: other.map_or_else(|| "empty history".to_string(), |m| m.role.to_string()),
        }),
    }
}

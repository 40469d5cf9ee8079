//! Property-based tests for the router and loop driver
//!
//! Whatever the backend says, the loop must halt within its budget and keep
//! the tool-result bookkeeping straight.

use super::loop_::AgentLoop;
use super::phase::{AdvisoryPhase, Phase, PhasePlan};
use super::registry::ToolRegistry;
use super::router::{Termination, route};
use super::state::ConversationState;
use super::testing::{EchoTool, Reply, ScriptedProvider, answer, calls};
use super::ContextBuilder;
use crate::traits::{Message, Role, ToolRequest};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Generators
// ============================================================================

fn arb_plan() -> impl Strategy<Value = PhasePlan> {
    (0usize..4, 0usize..3).prop_map(|(before, after)| PhasePlan {
        before_action: (0..before)
            .map(|i| AdvisoryPhase::new(format!("before{i}"), "persona", "instruction"))
            .collect(),
        after_tools: (0..after)
            .map(|i| AdvisoryPhase::new(format!("after{i}"), "persona", "instruction"))
            .collect(),
    })
}

fn arb_requests() -> impl Strategy<Value = Vec<ToolRequest>> {
    prop::collection::vec(prop_oneof![Just("lookup"), Just("missing")], 1..4).prop_map(|names| {
        names
            .into_iter()
            .enumerate()
            .map(|(i, name)| ToolRequest::new(format!("call_{i}"), name, json!({"i": i})))
            .collect()
    })
}

#[derive(Debug, Clone)]
enum ArbReply {
    Answer,
    Tools(Vec<ToolRequest>),
}

fn arb_reply() -> impl Strategy<Value = ArbReply> {
    prop_oneof![
        1 => Just(ArbReply::Answer),
        4 => arb_requests().prop_map(ArbReply::Tools),
    ]
}

fn to_reply(reply: ArbReply) -> Reply {
    match reply {
        ArbReply::Answer => answer("final"),
        ArbReply::Tools(requests) => calls(requests),
    }
}

fn arb_message() -> impl Strategy<Value = Message> {
    prop_oneof![
        Just(Message::agent("thought")),
        arb_requests().prop_map(|r| Message::agent_with_tool_requests("", r)),
        Just(Message::tool_result("call_0", "ok")),
        Just(Message::user("again")),
    ]
}

fn arb_phase(plan: &PhasePlan) -> BoxedStrategy<Phase> {
    let mut phases = vec![Phase::ModelCall, Phase::ToolExec];
    phases.extend((0..plan.before_action.len()).map(Phase::BeforeAction));
    phases.extend((0..plan.after_tools.len()).map(Phase::AfterTools));
    prop::sample::select(phases).boxed()
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
        .block_on(future)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn router_is_a_function_of_its_input(
        (plan, phase) in arb_plan().prop_flat_map(|plan| {
            let phases = arb_phase(&plan);
            (Just(plan), phases)
        }),
        budget in 1usize..6,
        messages in prop::collection::vec(arb_message(), 0..6),
    ) {
        let mut state = ConversationState::new("question", budget);
        for message in messages {
            state.append(message);
        }
        let first = route(&plan, phase, &state.snapshot()).map_err(|e| e.to_string());
        let second = route(&plan, phase, &state.snapshot()).map_err(|e| e.to_string());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn exhausted_budget_never_continues(
        plan in arb_plan(),
        messages in prop::collection::vec(arb_message(), 1..6),
    ) {
        let mut state = ConversationState::new("question", 1);
        for message in messages {
            state.append(message);
        }
        prop_assert!(state.is_last_step());
        for phase in [Phase::ModelCall, Phase::ToolExec] {
            if let Ok(next) = route(&plan, phase, &state.snapshot()) {
                prop_assert!(matches!(next, super::router::Route::Finish(_)));
            }
        }
    }

    #[test]
    fn loop_halts_within_budget(
        plan in arb_plan(),
        budget in 1usize..30,
        replies in prop::collection::vec(arb_reply(), 0..12),
    ) {
        let provider = Arc::new(ScriptedProvider::new(replies.into_iter().map(to_reply).collect()));
        let echo = Arc::new(EchoTool::new("lookup"));
        let registry = ToolRegistry::new().with_tool(echo.clone());
        let agent = AgentLoop::new(provider.clone(), ContextBuilder::default(), Arc::new(registry))
            .with_plan(plan);

        let outcome = block_on(agent.run("question", budget, CancellationToken::new())).unwrap();
        let messages = outcome.messages();

        prop_assert!(provider.calls() <= budget);
        prop_assert_ne!(outcome.termination, Termination::Cancelled);

        let last = messages.last().unwrap();
        prop_assert!(!(last.role == Role::Agent && last.has_tool_requests()));
        if outcome.state.is_last_step() && last.budget_notice {
            prop_assert_eq!(outcome.termination, Termination::BudgetExhausted);
        }

        // Every tool result answers one request of the agent message it follows.
        let mut open: Vec<String> = vec![];
        for message in messages {
            match message.role {
                Role::Agent => {
                    open = message.tool_requests.iter().map(|r| r.id.clone()).collect();
                }
                Role::ToolResult => {
                    let id = message.tool_call_id.clone().unwrap();
                    let pos = open.iter().position(|o| *o == id);
                    prop_assert!(pos.is_some(), "orphan or duplicate result {}", id);
                    if let Some(pos) = pos {
                        open.remove(pos);
                    }
                }
                Role::User | Role::System => open.clear(),
            }
        }
    }
}

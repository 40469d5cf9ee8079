use serde::{Deserialize, Serialize};
use std::fmt;

pub const MODEL_CALL: &str = "model_call";
pub const TOOL_EXEC: &str = "tools";

/// A position in the loop. Advisory phases are addressed by their index in
/// the [`PhasePlan`] list they belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    BeforeAction(usize),
    ModelCall,
    ToolExec,
    AfterTools(usize),
}

/// An advisory phase: its reply is recorded but never acted on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdvisoryPhase {
    pub name: String,
    pub system_prompt: String,
    pub instruction: String,
}

impl AdvisoryPhase {
    pub fn new(
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            instruction: instruction.into(),
        }
    }

    pub fn thinking() -> Self {
        Self::new(
            "thinking",
            "You are a thoughtful assistant that helps plan next steps.",
            "Let's think about what we know and what we need to do next. Consider:\n\
             1. What information do we have?\n\
             2. What are we trying to achieve?\n\
             3. What tools might help us?\n\
             4. What are potential challenges?\n",
        )
    }

    pub fn deliberation() -> Self {
        Self::new(
            "deliberation",
            "You are a decisive assistant that helps choose the best next action.",
            "Based on our thinking, let's decide what to do next:\n\
             1. What specific action should we take?\n\
             2. Why is this the best course of action?\n\
             3. What do we expect to learn?\n",
        )
    }

    pub fn observation() -> Self {
        Self::new(
            "observation",
            "You are an observant assistant that helps analyze results.",
            "Let's analyze what we learned from our last action:\n\
             1. What new information did we get?\n\
             2. How does this affect our understanding?\n\
             3. What should we do with this information?\n",
        )
    }
}

/// The advisory phases placed around the action-taking model call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PhasePlan {
    pub before_action: Vec<AdvisoryPhase>,
    pub after_tools: Vec<AdvisoryPhase>,
}

impl Default for PhasePlan {
    fn default() -> Self {
        Self {
            before_action: vec![AdvisoryPhase::thinking(), AdvisoryPhase::deliberation()],
            after_tools: vec![AdvisoryPhase::observation()],
        }
    }
}

impl PhasePlan {
    /// Only the model call and tool execution, no advisory phases.
    pub fn direct() -> Self {
        Self {
            before_action: vec![],
            after_tools: vec![],
        }
    }

    pub fn initial(&self) -> Phase {
        if self.before_action.is_empty() {
            Phase::ModelCall
        } else {
            Phase::BeforeAction(0)
        }
    }

    pub fn advisory(&self, phase: Phase) -> Option<&AdvisoryPhase> {
        match phase {
            Phase::BeforeAction(i) => self.before_action.get(i),
            Phase::AfterTools(i) => self.after_tools.get(i),
            Phase::ModelCall | Phase::ToolExec => None,
        }
    }

    pub fn name(&self, phase: Phase) -> &str {
        match phase {
            Phase::ModelCall => MODEL_CALL,
            Phase::ToolExec => TOOL_EXEC,
            advisory => self
                .advisory(advisory)
                .map(|p| p.name.as_str())
                .unwrap_or("unknown"),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeforeAction(i) => write!(f, "before_action[{i}]"),
            Self::ModelCall => write!(f, "{MODEL_CALL}"),
            Self::ToolExec => write!(f, "{TOOL_EXEC}"),
            Self::AfterTools(i) => write!(f, "after_tools[{i}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plan_names() {
        let plan = PhasePlan::default();
        assert_eq!(plan.initial(), Phase::BeforeAction(0));
        assert_eq!(plan.name(Phase::BeforeAction(0)), "thinking");
        assert_eq!(plan.name(Phase::BeforeAction(1)), "deliberation");
        assert_eq!(plan.name(Phase::AfterTools(0)), "observation");
        assert_eq!(plan.name(Phase::ModelCall), "model_call");
        assert!(plan.advisory(Phase::BeforeAction(2)).is_none());
    }

    #[test]
    fn direct_plan_starts_at_model_call() {
        assert_eq!(PhasePlan::direct().initial(), Phase::ModelCall);
    }

    #[test]
    fn plan_parses_from_toml() {
        let plan: PhasePlan = toml::from_str(
            r#"
            [[before_action]]
            name = "plan"
            system_prompt = "You plan."
            instruction = "Make a plan."
            "#,
        )
        .unwrap();
        assert_eq!(plan.before_action.len(), 1);
        assert_eq!(plan.before_action[0].name, "plan");
        assert_eq!(plan.after_tools, vec![AdvisoryPhase::observation()]);
    }
}

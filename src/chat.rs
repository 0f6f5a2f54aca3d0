//! The "LLM chat framework" external contract: a chat-message
//! abstraction with role tags, and a planner that emits either a terminal
//! finish or a tool action. Consumed by the form-aware executor; this
//! crate does not implement the planner or the model client, only the
//! message shape and a minimal test double used by the integration tests.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Role tags: `human/user`, `ai/assistant`, `system`, `function`, `tool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Human,
    User,
    Ai,
    Assistant,
    System,
    Function,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Human => "human",
            Role::User => "user",
            Role::Ai => "ai",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Function => "function",
            Role::Tool => "tool",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// A planned tool invocation, as emitted by the agent's planner before a
/// step is taken.
#[derive(Debug, Clone)]
pub struct ToolAction {
    pub tool: String,
    pub tool_input: JsonValue,
    pub log: String,
}

/// What the planner emits on a single `plan -> takeNextStep` turn: either
/// a terminal finish with return values, or one more tool action.
#[derive(Debug, Clone)]
pub enum PlannerStep {
    Finish(JsonValue),
    Action(ToolAction),
}

/// Minimal planner contract used by the executor's tests. A real
/// integration wires this to the actual agent framework's planner; this
/// crate only needs "the next planned step", nothing about how it is
/// produced.
pub trait ChatPlanner {
    fn next_step(&mut self, messages: &[ChatMessage]) -> PlannerStep;
}

/// A scripted planner returning a fixed sequence of steps, for tests.
pub struct StaticPlanner {
    steps: std::collections::VecDeque<PlannerStep>,
}

impl StaticPlanner {
    pub fn new(steps: Vec<PlannerStep>) -> Self {
        Self {
            steps: steps.into(),
        }
    }
}

impl ChatPlanner for StaticPlanner {
    fn next_step(&mut self, _messages: &[ChatMessage]) -> PlannerStep {
        self.steps
            .pop_front()
            .unwrap_or_else(|| PlannerStep::Finish(JsonValue::Null))
    }
}

//! Routing loop state management
//!
//! Tracks the phase of the bounded tool-calling loop and the last text the
//! model produced, which becomes the answer if the step budget runs out.

/// Phase of the routing loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// Waiting for the model's next answer
    AwaitingModel,
    /// Running the tool calls of the last answer
    ExecutingTools,
    /// A final answer has been produced
    Done,
}

/// State of the routing loop for one user message
#[derive(Debug, Clone)]
pub struct RoutingLoopState {
    /// Model calls made so far
    pub step: usize,
    /// Maximum allowed model calls
    pub max_steps: usize,
    /// Current phase
    pub phase: LoopPhase,
    /// Final answer once `phase` is `Done`
    pub final_answer: Option<String>,
    /// Text of the most recent model answer
    pub last_text: String,
}

impl RoutingLoopState {
    /// Create a new loop state with the given step budget
    pub fn new(max_steps: usize) -> Self {
        Self {
            step: 0,
            max_steps,
            phase: LoopPhase::AwaitingModel,
            final_answer: None,
            last_text: String::new(),
        }
    }

    /// Check if another model call is allowed
    pub fn should_continue(&self) -> bool {
        self.phase != LoopPhase::Done && self.step < self.max_steps
    }

    /// Record a model answer and move to the next phase
    pub fn record_model_answer(&mut self, text: &str, has_tool_calls: bool) {
        self.step += 1;
        self.last_text = text.to_string();
        if has_tool_calls {
            self.phase = LoopPhase::ExecutingTools;
        } else {
            self.finish(text.to_string());
        }
    }

    /// Tool results are in; wait for the model again
    pub fn tools_done(&mut self) {
        if self.phase == LoopPhase::ExecutingTools {
            self.phase = LoopPhase::AwaitingModel;
        }
    }

    /// Finish with `answer`
    pub fn finish(&mut self, answer: String) {
        self.final_answer = Some(answer);
        self.phase = LoopPhase::Done;
    }

    /// Consume the state, returning the final answer or the last partial text
    /// when the budget ran out
    pub fn into_answer(self) -> String {
        self.final_answer.unwrap_or(self.last_text)
    }

    /// Whether the loop stopped because the budget ran out
    pub fn exhausted(&self) -> bool {
        self.phase != LoopPhase::Done && self.step >= self.max_steps
    }
}

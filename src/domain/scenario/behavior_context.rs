use crate::domain::utils::id::ActionId;
use crate::error::ConfigurationError;

/// Loop count of a loop context that was never configured.
pub const UNSET_LOOP_COUNT: i64 = -1;

/// Position of a context inside its [`ScenarioContextStack`](super::context_stack::ScenarioContextStack).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameIndex(pub usize);

/// Control-flow position of a simulated user, one frame per entered behavior.
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioBehaviorContext {
    Sequential(SequentialScenarioBehaviorContext),
    Loop(LoopScenarioBehaviorContext),
    Branch(BranchScenarioBehaviorContext),
}

impl ScenarioBehaviorContext {
    /// Returns the action to execute first. Starting a loop context commits one iteration.
    pub fn start_scenario(&mut self) -> ActionId {
        match self {
            ScenarioBehaviorContext::Sequential(context) => context.start_scenario(),
            ScenarioBehaviorContext::Loop(context) => context.start_scenario(),
            ScenarioBehaviorContext::Branch(context) => context.start_scenario(),
        }
    }

    /// Whether the behavior has to run once more before control returns to the parent.
    pub fn must_repeat_scenario(&self) -> bool {
        match self {
            ScenarioBehaviorContext::Loop(context) => context.must_repeat_scenario(),
            ScenarioBehaviorContext::Sequential(_) | ScenarioBehaviorContext::Branch(_) => false,
        }
    }

    pub fn next_action(&self) -> Option<&ActionId> {
        match self {
            ScenarioBehaviorContext::Sequential(context) => context.next_action.as_ref(),
            ScenarioBehaviorContext::Loop(context) => Some(&context.next_action),
            ScenarioBehaviorContext::Branch(context) => Some(&context.next_action),
        }
    }

    pub fn parent(&self) -> Option<FrameIndex> {
        match self {
            ScenarioBehaviorContext::Sequential(context) => context.parent,
            ScenarioBehaviorContext::Loop(context) => context.parent,
            ScenarioBehaviorContext::Branch(context) => context.parent,
        }
    }

    pub fn entry(&self) -> &ActionId {
        match self {
            ScenarioBehaviorContext::Sequential(context) => &context.entry,
            ScenarioBehaviorContext::Loop(context) => &context.entry,
            ScenarioBehaviorContext::Branch(context) => &context.entry,
        }
    }
}

/// Runs a behavior exactly once. The root behavior of a scenario has neither parent nor next action.
#[derive(Debug, Clone, PartialEq)]
pub struct SequentialScenarioBehaviorContext {
    entry: ActionId,
    next_action: Option<ActionId>,
    parent: Option<FrameIndex>,
}

impl SequentialScenarioBehaviorContext {
    pub fn new(entry: ActionId, next_action: Option<ActionId>, parent: Option<FrameIndex>) -> Self {
        Self { entry, next_action, parent }
    }

    pub fn root(entry: ActionId) -> Self {
        Self::new(entry, None, None)
    }

    pub fn start_scenario(&mut self) -> ActionId {
        self.entry.clone()
    }
}

/// Bounded repetition of a behavior.
///
/// `progression` counts started iterations. The context is exhausted once
/// `progression == maximal_loop_count` and stays exhausted; re-entering the loop needs
/// a fresh context.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopScenarioBehaviorContext {
    entry: ActionId,
    maximal_loop_count: i64,
    progression: i64,
    next_action: ActionId,
    parent: Option<FrameIndex>,
}

impl LoopScenarioBehaviorContext {
    /// Requires `0 <= initial_progression < maximal_loop_count` and a next action to resume at.
    pub fn new(
        entry: ActionId,
        maximal_loop_count: i64,
        initial_progression: i64,
        next_action: Option<ActionId>,
        parent: Option<FrameIndex>,
    ) -> Result<Self, ConfigurationError> {
        let Some(next_action) = next_action else {
            return Err(ConfigurationError::MissingNextAction { entry: entry.to_string() });
        };

        if maximal_loop_count == UNSET_LOOP_COUNT || initial_progression < 0 || initial_progression >= maximal_loop_count {
            return Err(ConfigurationError::InvalidLoopBounds { maximal_loop_count, initial_progression });
        }

        Ok(Self { entry, maximal_loop_count, progression: initial_progression, next_action, parent })
    }

    pub fn start_scenario(&mut self) -> ActionId {
        if self.progression < self.maximal_loop_count {
            self.progression += 1;
        } else {
            log::warn!("Loop entering '{}' started after it was exhausted ({} iterations).", self.entry, self.maximal_loop_count);
        }
        self.entry.clone()
    }

    pub fn must_repeat_scenario(&self) -> bool {
        self.progression < self.maximal_loop_count
    }

    pub fn progression(&self) -> i64 {
        self.progression
    }

    pub fn maximal_loop_count(&self) -> i64 {
        self.maximal_loop_count
    }

    pub fn is_exhausted(&self) -> bool {
        self.progression == self.maximal_loop_count
    }
}

/// Executes the one sub-behavior that was chosen when the branch was entered.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchScenarioBehaviorContext {
    entry: ActionId,
    next_action: ActionId,
    parent: Option<FrameIndex>,
}

impl BranchScenarioBehaviorContext {
    pub fn new(entry: ActionId, next_action: ActionId, parent: Option<FrameIndex>) -> Self {
        Self { entry, next_action, parent }
    }

    pub fn start_scenario(&mut self) -> ActionId {
        self.entry.clone()
    }
}

use crate::domain::scenario::behavior_context::{
    BranchScenarioBehaviorContext, FrameIndex, LoopScenarioBehaviorContext, ScenarioBehaviorContext, SequentialScenarioBehaviorContext,
};
use crate::domain::utils::id::ActionId;
use crate::error::ConfigurationError;

/// Where a session continues after the current behavior reached its stop action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resume {
    /// The same behavior runs again (next loop iteration) starting at this action.
    Repeat(ActionId),

    /// Control went back to the enclosing behavior at this action.
    Continue(ActionId),

    /// The root behavior completed; the session is done.
    Finished,
}

/// Stack of behavior contexts of one session. The frame below a context is its parent.
#[derive(Debug, Clone, Default)]
pub struct ScenarioContextStack {
    frames: Vec<ScenarioBehaviorContext>,
}

impl ScenarioContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes the root behavior and returns its entry action.
    pub fn enter_root(&mut self, entry: ActionId) -> ActionId {
        self.frames.clear();
        self.push(ScenarioBehaviorContext::Sequential(SequentialScenarioBehaviorContext::root(entry)))
    }

    /// Enters a loop body and commits its first iteration.
    pub fn enter_loop(&mut self, entry: ActionId, iterations: i64, next_action: ActionId) -> Result<ActionId, ConfigurationError> {
        let context = LoopScenarioBehaviorContext::new(entry, iterations, 0, Some(next_action), self.top_index())?;
        Ok(self.push(ScenarioBehaviorContext::Loop(context)))
    }

    /// Enters the chosen branch behavior.
    pub fn enter_branch(&mut self, entry: ActionId, next_action: ActionId) -> ActionId {
        let context = BranchScenarioBehaviorContext::new(entry, next_action, self.top_index());
        self.push(ScenarioBehaviorContext::Branch(context))
    }

    /// Enters a behavior that runs once and then resumes at `next_action`.
    pub fn enter_sequential(&mut self, entry: ActionId, next_action: ActionId) -> ActionId {
        let context = SequentialScenarioBehaviorContext::new(entry, Some(next_action), self.top_index());
        self.push(ScenarioBehaviorContext::Sequential(context))
    }

    fn push(&mut self, mut context: ScenarioBehaviorContext) -> ActionId {
        let entry = context.start_scenario();
        self.frames.push(context);
        entry
    }

    /// Called when the current behavior reached its stop action.
    pub fn finish_behavior(&mut self) -> Resume {
        loop {
            let Some(top) = self.frames.last_mut() else {
                return Resume::Finished;
            };

            if top.must_repeat_scenario() {
                return Resume::Repeat(top.start_scenario());
            }

            let finished = self.frames.pop();
            match finished.as_ref().and_then(|context| context.next_action()) {
                Some(next_action) => return Resume::Continue(next_action.clone()),
                None if self.frames.is_empty() => return Resume::Finished,
                // A nested behavior without a next action completes its parent as well.
                None => continue,
            }
        }
    }

    pub fn current(&self) -> Option<&ScenarioBehaviorContext> {
        self.frames.last()
    }

    pub fn top_index(&self) -> Option<FrameIndex> {
        self.frames.len().checked_sub(1).map(FrameIndex)
    }

    pub fn get(&self, index: FrameIndex) -> Option<&ScenarioBehaviorContext> {
        self.frames.get(index.0)
    }

    /// The enclosing context of the frame at `index`.
    pub fn parent_of(&self, index: FrameIndex) -> Option<&ScenarioBehaviorContext> {
        self.get(index)?.parent().and_then(|parent| self.get(parent))
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

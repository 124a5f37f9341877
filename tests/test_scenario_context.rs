use perf_sim_core::domain::scenario::behavior_context::{FrameIndex, LoopScenarioBehaviorContext, ScenarioBehaviorContext};
use perf_sim_core::domain::scenario::context_stack::{Resume, ScenarioContextStack};
use perf_sim_core::domain::utils::id::ActionId;
use perf_sim_core::error::ConfigurationError;

fn action(id: &str) -> ActionId {
    ActionId::new(id)
}

#[test]
fn test_loop_runs_exactly_its_iterations() {
    let mut context = LoopScenarioBehaviorContext::new(action("body-start"), 3, 0, Some(action("after-loop")), None).unwrap();

    let mut started = 0;
    while context.must_repeat_scenario() {
        assert_eq!(context.start_scenario(), action("body-start"));
        started += 1;
    }

    assert_eq!(started, 3);
    assert!(context.is_exhausted());

    // Starting an exhausted loop hands out the entry again without counting it.
    context.start_scenario();
    assert_eq!(context.progression(), 3);
}

#[test]
fn test_loop_bounds_are_validated() {
    let zero = LoopScenarioBehaviorContext::new(action("a"), 0, 0, Some(action("b")), None);
    assert_eq!(zero, Err(ConfigurationError::InvalidLoopBounds { maximal_loop_count: 0, initial_progression: 0 }));

    let past_end = LoopScenarioBehaviorContext::new(action("a"), 2, 2, Some(action("b")), None);
    assert!(matches!(past_end, Err(ConfigurationError::InvalidLoopBounds { .. })));

    let negative = LoopScenarioBehaviorContext::new(action("a"), 2, -1, Some(action("b")), None);
    assert!(matches!(negative, Err(ConfigurationError::InvalidLoopBounds { .. })));

    let no_next = LoopScenarioBehaviorContext::new(action("a"), 2, 0, None, None);
    assert_eq!(no_next, Err(ConfigurationError::MissingNextAction { entry: "a".to_string() }));
}

#[test]
fn test_resumed_loop_counts_from_its_initial_progression() {
    let mut context = LoopScenarioBehaviorContext::new(action("a"), 4, 3, Some(action("b")), Some(FrameIndex(0))).unwrap();

    assert!(context.must_repeat_scenario());
    context.start_scenario();
    assert!(!context.must_repeat_scenario());
    assert_eq!(context.maximal_loop_count(), 4);
}

/// root -> loop(2) { branch { leaf } } -> after-loop -> stop
#[test]
fn test_nested_behaviors_unwind_in_order() {
    let mut stack = ScenarioContextStack::new();

    assert_eq!(stack.enter_root(action("root-start")), action("root-start"));
    assert_eq!(stack.enter_loop(action("loop-start"), 2, action("after-loop")).unwrap(), action("loop-start"));
    assert_eq!(stack.enter_branch(action("leaf-start"), action("after-branch")), action("leaf-start"));
    assert_eq!(stack.depth(), 3);

    let top = stack.top_index().unwrap();
    assert_eq!(stack.parent_of(top).map(ScenarioBehaviorContext::entry), Some(&action("loop-start")));

    // Leaf done: back in the loop body, after the branch action.
    assert_eq!(stack.finish_behavior(), Resume::Continue(action("after-branch")));
    // Loop body done once: second iteration.
    assert_eq!(stack.finish_behavior(), Resume::Repeat(action("loop-start")));

    assert_eq!(stack.enter_branch(action("leaf-start"), action("after-branch")), action("leaf-start"));
    assert_eq!(stack.finish_behavior(), Resume::Continue(action("after-branch")));
    assert_eq!(stack.finish_behavior(), Resume::Continue(action("after-loop")));
    assert_eq!(stack.depth(), 1);

    assert_eq!(stack.finish_behavior(), Resume::Finished);
    assert!(stack.is_empty());
    assert_eq!(stack.finish_behavior(), Resume::Finished);
}

#[test]
fn test_failed_loop_entry_leaves_stack_untouched() {
    let mut stack = ScenarioContextStack::new();
    stack.enter_root(action("root-start"));

    let result = stack.enter_loop(action("loop-start"), -3, action("after-loop"));
    assert!(matches!(result, Err(ConfigurationError::InvalidLoopBounds { .. })));
    assert_eq!(stack.depth(), 1);
    assert!(matches!(stack.current(), Some(ScenarioBehaviorContext::Sequential(_))));
}

#[test]
fn test_enter_root_resets_previous_frames() {
    let mut stack = ScenarioContextStack::new();
    stack.enter_root(action("a"));
    stack.enter_sequential(action("b"), action("c"));

    stack.enter_root(action("z"));
    assert_eq!(stack.depth(), 1);
    assert_eq!(stack.current().map(ScenarioBehaviorContext::entry), Some(&action("z")));
}

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::Arc;
use uir_guard::{CallOutcome, ToolInvocationGuard, ToolLimits};

#[test]
fn test_unlisted_tool_never_cancelled() {
    let guard = ToolInvocationGuard::new(ToolLimits::new().with_limit("plan_generator", 1));
    for _ in 0..500 {
        assert!(!guard.before_call("ground_action").is_cancelled());
    }
    assert_eq!(guard.count("ground_action"), 500);
}

#[test]
fn test_reset_clears_everything() {
    let guard = ToolInvocationGuard::new(ToolLimits::new().with_limit("a", 1));
    guard.before_call("a");
    guard.before_call("a");
    guard.before_call("b");

    guard.on_invocation_start();

    assert!(guard.snapshot().is_empty());
    assert!(!guard.before_call("a").is_cancelled());
}

#[test]
fn test_double_validation_failure_after_single_count() {
    let guard = ToolInvocationGuard::unlimited();
    guard.before_call("step_executor");
    guard.after_call("step_executor", CallOutcome::ValidationFailure);
    guard.after_call("step_executor", CallOutcome::ValidationFailure);
    assert_eq!(guard.count("step_executor"), 0);
}

#[test]
fn test_rolled_back_call_frees_ceiling() {
    let guard = ToolInvocationGuard::new(ToolLimits::new().with_limit("t", 1));
    guard.before_call("t");
    guard.after_call("t", CallOutcome::ArgumentTypeFailure);
    assert!(!guard.before_call("t").is_cancelled());
}

#[test]
fn test_concurrent_calls_are_all_counted() {
    let guard = Arc::new(ToolInvocationGuard::unlimited());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let guard = Arc::clone(&guard);
            std::thread::spawn(move || {
                for _ in 0..250 {
                    guard.before_call("shared");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(guard.count("shared"), 2000);
}

#[tokio::test]
async fn test_concurrent_tasks_share_one_guard() {
    let guard = Arc::new(ToolInvocationGuard::new(ToolLimits::new().with_limit("t", 10)));
    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let guard = Arc::clone(&guard);
            tokio::spawn(async move { guard.before_call("t").is_cancelled() })
        })
        .collect();

    let mut cancelled = 0;
    for task in tasks {
        if task.await.unwrap() {
            cancelled += 1;
        }
    }
    assert_eq!(cancelled, 10);
    assert_eq!(guard.count("t"), 20);
}

#[test]
fn test_independent_guards_do_not_share_counts() {
    let first = ToolInvocationGuard::unlimited();
    let second = ToolInvocationGuard::unlimited();
    first.before_call("t");
    assert_eq!(second.count("t"), 0);
}

fn outcome() -> impl Strategy<Value = CallOutcome> {
    prop_oneof![
        Just(CallOutcome::Success),
        Just(CallOutcome::ValidationFailure),
        Just(CallOutcome::ArgumentTypeFailure),
        Just(CallOutcome::Failure),
    ]
}

proptest! {
    #[test]
    fn prop_calls_within_ceiling_pass_and_beyond_are_cancelled(limit in 1_u64..20, extra in 1_u64..20) {
        let guard = ToolInvocationGuard::new(ToolLimits::new().with_limit("t", limit));
        for n in 1..=limit {
            let permit = guard.before_call("t");
            prop_assert!(!permit.is_cancelled());
            prop_assert_eq!(permit.count(), n);
        }
        for n in 1..=extra {
            let permit = guard.before_call("t");
            prop_assert!(permit.is_cancelled());
            prop_assert!(permit.cancellation().unwrap().contains("invoked too many"));
            prop_assert_eq!(permit.count(), limit + n);
        }
    }

    #[test]
    fn prop_count_matches_model(ops in proptest::collection::vec(proptest::option::of(outcome()), 0..64)) {
        // None = before_call, Some(outcome) = after_call
        let guard = ToolInvocationGuard::unlimited();
        let mut model: u64 = 0;
        let mut seen = false;
        for op in ops {
            match op {
                None => {
                    guard.before_call("t");
                    model += 1;
                    seen = true;
                }
                Some(outcome) => {
                    guard.after_call("t", outcome);
                    if seen && outcome.is_argument_failure() {
                        model = model.saturating_sub(1);
                    }
                }
            }
            prop_assert_eq!(guard.count("t"), model);
        }
    }

    #[test]
    fn prop_non_argument_failures_never_decrement(calls in 1_u64..30, failures in 0_usize..30) {
        let guard = ToolInvocationGuard::unlimited();
        for _ in 0..calls {
            guard.before_call("t");
        }
        for _ in 0..failures {
            guard.after_call("t", CallOutcome::Failure);
        }
        prop_assert_eq!(guard.count("t"), calls);
    }
}

use pretty_assertions::assert_eq;
use std::time::Duration;
use uir_grounding::{
    ContentPart, GroundingConfig, GroundingLoop, GroundingRequest, GroundingStatus,
    ACTION_SUCCEEDED, CORRECTION_PROMPT, MAX_ACTIONS_EXCEEDED, RETRIES_EXHAUSTED,
};
use uir_test_utils::{
    click_response, finished_response, wait_response, RecordedInput, ScriptedOracle,
    SimulatedDesktop,
};
use uir_vision::VisualVerifier;

fn config() -> GroundingConfig {
    GroundingConfig::new()
        .with_settle_delay(Duration::ZERO)
        .with_wait_duration(Duration::ZERO)
}

async fn run(
    oracle: &ScriptedOracle,
    desktop: &SimulatedDesktop,
    config: &GroundingConfig,
    request: GroundingRequest,
) -> uir_grounding::GroundingOutcome {
    let verifier = VisualVerifier::default();
    GroundingLoop::new(oracle, desktop, desktop, &verifier, config)
        .run(&request)
        .await
}

#[tokio::test]
async fn test_verified_click_stops_single_shot() {
    let oracle = ScriptedOracle::new([click_response(960, 540)]);
    let desktop = SimulatedDesktop::responsive();

    let outcome = run(&oracle, &desktop, &config(), GroundingRequest::single_shot("Click Submit")).await;

    assert_eq!(outcome.status, GroundingStatus::Verified);
    assert_eq!(outcome.message, ACTION_SUCCEEDED);
    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.executed.len(), 1);
    assert!(outcome.executed[0].verified());
    assert_eq!(outcome.thoughts, vec!["click at (960, 540)".to_string()]);

    // 1920x1080 reference rescaled onto the 320x180 desktop
    match &desktop.inputs()[..] {
        [RecordedInput::Click { at, clicks: 1, .. }] => assert_eq!((at.x, at.y), (160, 90)),
        other => panic!("unexpected inputs: {other:?}"),
    }
}

#[tokio::test]
async fn test_unparseable_output_exhausts_retries() {
    let oracle = ScriptedOracle::repeating("I think the button is somewhere on the left");
    let desktop = SimulatedDesktop::responsive();
    let config = config().with_max_ui_action_retries(3);

    let outcome = run(&oracle, &desktop, &config, GroundingRequest::single_shot("Click Submit")).await;

    assert_eq!(outcome.status, GroundingStatus::Exhausted);
    assert_eq!(outcome.message, RETRIES_EXHAUSTED);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(oracle.call_count(), 3);
    assert!(desktop.inputs().is_empty());
}

#[tokio::test]
async fn test_empty_completion_is_retried() {
    let oracle = ScriptedOracle::new([String::new(), click_response(100, 100)]);
    let desktop = SimulatedDesktop::responsive();

    let outcome = run(&oracle, &desktop, &config(), GroundingRequest::single_shot("Click Submit")).await;

    assert_eq!(outcome.status, GroundingStatus::Verified);
    assert_eq!(outcome.attempts, 2);

    let second = &oracle.conversations()[1];
    let correction = second.last_user().unwrap();
    assert_eq!(correction.text(), CORRECTION_PROMPT);
    assert_eq!(correction.image_count(), 1);
}

#[tokio::test]
async fn test_frozen_screen_is_a_mismatch() {
    let oracle = ScriptedOracle::repeating(click_response(500, 500));
    let desktop = SimulatedDesktop::frozen();

    let outcome = run(&oracle, &desktop, &config(), GroundingRequest::single_shot("Click Submit")).await;

    assert_eq!(outcome.status, GroundingStatus::Exhausted);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(desktop.inputs().len(), 3);
    assert!(outcome.executed.iter().all(|executed| !executed.verified()));
}

#[tokio::test]
async fn test_expect_change_override_accepts_static_screen() {
    let oracle = ScriptedOracle::new([click_response(500, 500)]);
    let desktop = SimulatedDesktop::frozen();
    let request = GroundingRequest::single_shot("Focus the field").with_expect_change(false);

    let outcome = run(&oracle, &desktop, &config(), request).await;

    assert_eq!(outcome.status, GroundingStatus::Verified);
}

#[tokio::test]
async fn test_finished_sentinel_performs_no_action() {
    let oracle = ScriptedOracle::new([finished_response("already logged in")]);
    let desktop = SimulatedDesktop::responsive();

    let outcome = run(&oracle, &desktop, &config(), GroundingRequest::iterative("Log in")).await;

    assert_eq!(outcome.status, GroundingStatus::Finished);
    assert_eq!(outcome.message, "already logged in");
    assert!(outcome.executed.is_empty());
    assert!(desktop.inputs().is_empty());
}

#[tokio::test]
async fn test_iterative_ceiling_stops_before_sixth_action() {
    let oracle = ScriptedOracle::repeating(click_response(300, 300));
    let desktop = SimulatedDesktop::responsive();
    let config = config().with_max_actions_allowed(5);

    let outcome = run(&oracle, &desktop, &config, GroundingRequest::iterative("Log in")).await;

    assert_eq!(outcome.status, GroundingStatus::Exhausted);
    assert_eq!(outcome.message, MAX_ACTIONS_EXCEEDED);
    assert_eq!(oracle.call_count(), 5);
    assert_eq!(desktop.inputs().len(), 5);
    assert_eq!(outcome.executed.len(), 5);
}

#[tokio::test]
async fn test_iterative_sends_latest_screen_after_each_action() {
    let oracle = ScriptedOracle::new([click_response(300, 300), finished_response("done")]);
    let desktop = SimulatedDesktop::responsive();

    let outcome = run(&oracle, &desktop, &config(), GroundingRequest::iterative("Log in")).await;

    assert_eq!(outcome.status, GroundingStatus::Finished);
    let conversation = &oracle.conversations()[1];
    let last = conversation.last_user().unwrap();
    assert!(matches!(&last.content[..], [ContentPart::Image(_)]));
}

#[tokio::test]
async fn test_wait_is_not_verified() {
    let oracle = ScriptedOracle::new([wait_response()]);
    let desktop = SimulatedDesktop::frozen();

    let outcome = run(&oracle, &desktop, &config(), GroundingRequest::single_shot("Wait for the page")).await;

    assert_eq!(outcome.status, GroundingStatus::Verified);
    assert!(outcome.executed[0].verification.is_none());
}

#[tokio::test]
async fn test_disconnect_is_fatal() {
    let oracle = ScriptedOracle::repeating(click_response(10, 10));
    let desktop = SimulatedDesktop::disconnected();

    let outcome = run(&oracle, &desktop, &config(), GroundingRequest::single_shot("Click Submit")).await;

    assert_eq!(outcome.status, GroundingStatus::Fatal);
    assert_eq!(outcome.attempts, 1);
    assert!(outcome.message.contains("disconnected"));
}

#[tokio::test]
async fn test_capture_failure_is_fatal() {
    let oracle = ScriptedOracle::repeating(click_response(10, 10));
    let desktop = SimulatedDesktop::responsive();
    desktop.fail_captures();

    let outcome = run(&oracle, &desktop, &config(), GroundingRequest::single_shot("Click Submit")).await;

    assert_eq!(outcome.status, GroundingStatus::Fatal);
    assert_eq!(outcome.attempts, 0);
    assert_eq!(oracle.call_count(), 0);
}

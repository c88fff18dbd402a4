use serde_json::json;
use std::sync::Arc;
use uir_core::{
    ExceptionRouter, ExceptionType, RecoveryModule, RecoveryOrchestrator, RecoveryStatus,
    RobotExceptionRequest, RoutingStatus, StrategyKind,
};
use uir_test_utils::{
    click_response, collaborators, fast_config, finished_response, login_failure_value,
    plan_response, ScriptedOracle, SimulatedDesktop,
};

fn router() -> ExceptionRouter {
    let router = ExceptionRouter::new();
    let orchestrator = RecoveryOrchestrator::new(fast_config().with_strategy(StrategyKind::Planned));
    router.register(RecoveryModule::ui_recovery("ui-recovery"), Arc::new(orchestrator));
    router
}

fn request(exception_type: ExceptionType, payload: serde_json::Value) -> RobotExceptionRequest {
    RobotExceptionRequest {
        code: "UI-001".to_string(),
        exception_type,
        message: "Submit button not clickable".to_string(),
        details: None,
        payload,
    }
}

fn session() -> uir_core::Collaborators {
    collaborators(
        Arc::new(ScriptedOracle::repeating(plan_response(&["Submit the form"]))),
        Arc::new(ScriptedOracle::new([click_response(960, 700), finished_response("done")])),
        Arc::new(SimulatedDesktop::responsive()),
    )
}

#[tokio::test]
async fn test_ui_exception_is_recovered() {
    let response = router()
        .route(&request(ExceptionType::UiException, login_failure_value()), session())
        .await;

    assert_eq!(response.status, RoutingStatus::Accepted);
    assert_eq!(response.module.as_deref(), Some("ui-recovery"));
    assert!(response.solved);
    assert!(response.has_fix);
    let report = response.report.unwrap();
    assert_eq!(report.status, RecoveryStatus::Solved);
    assert_eq!(report.tool_calls["ui_exception_handler"], 1);

    let exception = response.exception.unwrap();
    assert_eq!(exception.steps, vec!["Submit the form"]);
    assert_eq!(exception.result, report.result);
    assert_eq!(exception.reasoning, report.reasoning);
}

#[tokio::test]
async fn test_unhandled_exception_goes_to_human() {
    let response = router()
        .route(&request(ExceptionType::SystemException, login_failure_value()), session())
        .await;

    assert_eq!(response.status, RoutingStatus::RoutedToHuman);
    assert!(response.module.is_none());
    assert!(response.report.is_none());
    assert!(response.exception.is_none());
    assert!(!response.solved);
}

#[tokio::test]
async fn test_disabled_module_is_skipped() {
    let router = router();
    router.set_enabled("ui-recovery", false);

    let response = router
        .route(&request(ExceptionType::UiException, login_failure_value()), session())
        .await;

    assert_eq!(response.status, RoutingStatus::RoutedToHuman);
}

#[tokio::test]
async fn test_malformed_payload_is_an_error() {
    let payload = json!({"task": "log in", "failed_activity": {"name": "click submit"}});
    let response = router()
        .route(&request(ExceptionType::UiException, payload), session())
        .await;

    assert_eq!(response.status, RoutingStatus::Error);
    assert_eq!(
        response.error_message.as_deref(),
        Some("invalid arguments: action_history is required")
    );
    assert!(response.report.is_none());
}

#[test]
fn test_request_wire_format() {
    let request: RobotExceptionRequest = serde_json::from_value(json!({
        "code": "UI-404",
        "exception_type": "ui_exception",
        "message": "element not found",
        "payload": {"task": "t"}
    }))
    .unwrap();
    assert_eq!(request.exception_type, ExceptionType::UiException);
    assert!(request.details.is_none());
}

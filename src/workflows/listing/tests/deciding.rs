use std::sync::Arc;

use super::common::*;
use crate::workflows::listing::catalog::MarketingCatalog;
use crate::workflows::listing::decision::{
    offline_decision, DecisionEngine, DecisionError, DecisionValidationError,
};
use crate::workflows::listing::domain::IntakeMode;
use crate::workflows::listing::gateway::GatewayError;
use crate::workflows::listing::signals;

fn decide(engine: &DecisionEngine) -> Result<crate::workflows::listing::domain::Decision, DecisionError> {
    let catalog = MarketingCatalog::builtin();
    let answers = tight_condo_answers();
    let sigs = signals::compute(&answers);
    engine.decide(&catalog, &answers, &sigs, IntakeMode::Lighting)
}

#[test]
fn offline_engine_serves_the_fixed_sample() {
    let engine = DecisionEngine::new(None);
    assert!(engine.is_offline());
    let decision = decide(&engine).expect("offline decision");
    assert_eq!(decision, offline_decision());
}

#[test]
fn valid_first_response_needs_a_single_call() {
    let gateway = Arc::new(ScriptedGateway::with_responses(vec![Ok(
        valid_decision_payload(),
    )]));
    let engine = DecisionEngine::new(Some(gateway.clone()));

    decide(&engine).expect("decision accepted");
    assert_eq!(gateway.calls(), 1);
}

#[test]
fn invalid_shape_is_retried_once_and_recovers() {
    let gateway = Arc::new(ScriptedGateway::with_responses(vec![
        Ok(invalid_decision_payload()),
        Ok(valid_decision_payload()),
    ]));
    let engine = DecisionEngine::new(Some(gateway.clone()));

    decide(&engine).expect("retry recovers");
    assert_eq!(gateway.calls(), 2);
}

#[test]
fn malformed_payload_counts_as_validation_failure() {
    let gateway = Arc::new(ScriptedGateway::with_responses(vec![
        Err(GatewayError::MalformedPayload("not json".to_string())),
        Ok(valid_decision_payload()),
    ]));
    let engine = DecisionEngine::new(Some(gateway.clone()));

    decide(&engine).expect("retry recovers");
    assert_eq!(gateway.calls(), 2);
}

#[test]
fn second_validation_failure_is_surfaced() {
    let gateway = Arc::new(ScriptedGateway::with_responses(vec![
        Ok(invalid_decision_payload()),
        Ok(invalid_decision_payload()),
    ]));
    let engine = DecisionEngine::new(Some(gateway.clone()));

    let error = decide(&engine).expect_err("retry budget is one");
    assert!(matches!(
        error,
        DecisionError::Validation(DecisionValidationError::StackCount(0))
    ));
    assert_eq!(gateway.calls(), 2);
}

#[test]
fn transport_failure_is_not_retried() {
    let gateway = Arc::new(ScriptedGateway::with_responses(vec![Err(
        GatewayError::Transport("connection refused".to_string()),
    )]));
    let engine = DecisionEngine::new(Some(gateway.clone()));

    let error = decide(&engine).expect_err("upstream failure surfaces");
    assert!(matches!(error, DecisionError::Upstream(_)));
    assert_eq!(gateway.calls(), 1);
}

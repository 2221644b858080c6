use std::sync::Arc;

use super::common::*;
use crate::workflows::listing::domain::{IntakeMode, TierLabel};
use crate::workflows::listing::gateway::GatewayError;
use crate::workflows::listing::guardrails::{FLOOR_PLAN_2D, ZILLOW_3D};
use crate::workflows::listing::ingest::CatalogOrigin;
use crate::workflows::listing::repository::{
    ExportJobRepository, ExportStatus, IntakeId, IntakeRepository,
};
use crate::workflows::listing::service::ListingServiceError;

#[test]
fn intake_pipeline_applies_guardrails_to_every_stack() {
    let (service, _, _) = build_offline_service();

    let record = service
        .submit_intake(IntakeMode::Lighting, tight_condo_answers())
        .expect("intake succeeds");

    assert_eq!(record.signals.complexity, 0.487);
    assert_eq!(record.decision.stacks.len(), 3);
    for stack in &record.decision.stacks {
        let ids: Vec<&str> = stack
            .services
            .iter()
            .map(|item| item.service_id.as_str())
            .collect();
        assert!(ids.contains(&FLOOR_PLAN_2D), "{:?} missing floor plan", stack.tier);
        assert!(ids.contains(&ZILLOW_3D), "{:?} missing 3d tour", stack.tier);
    }

    // The High stack lacked both services, so the enforcer inserted them at
    // the front with the tour ahead of the floor plan.
    let high = record
        .decision
        .stack_for_tier(TierLabel::High)
        .expect("high stack");
    let ids: Vec<&str> = high
        .services
        .iter()
        .map(|item| item.service_id.as_str())
        .collect();
    assert_eq!(ids, vec![ZILLOW_3D, FLOOR_PLAN_2D, "show_stopper", "aerials"]);
}

#[test]
fn stored_record_is_retrievable_by_id() {
    let (service, _, _) = build_offline_service();
    let record = service
        .submit_intake(IntakeMode::DeepDive, family_home_answers())
        .expect("intake succeeds");

    let fetched = service.intake(&record.id).expect("record found");
    assert_eq!(fetched, record);

    let missing = service.intake(&IntakeId("intake-999999".to_string()));
    assert!(matches!(missing, Err(ListingServiceError::IntakeNotFound(_))));
}

#[test]
fn nothing_is_persisted_when_validation_fails_twice() {
    let gateway = Arc::new(ScriptedGateway::with_responses(vec![
        Ok(invalid_decision_payload()),
        Ok(invalid_decision_payload()),
    ]));
    let (service, intakes, _) = build_service(Some(gateway));

    let error = service
        .submit_intake(IntakeMode::Lighting, tight_condo_answers())
        .expect_err("validation failure surfaces");
    assert!(matches!(error, ListingServiceError::Decision(_)));
    assert!(intakes
        .fetch(&IntakeId("intake-000001".to_string()))
        .expect("fetch works")
        .is_none());
}

#[test]
fn upstream_failure_surfaces_without_persisting() {
    let gateway = Arc::new(ScriptedGateway::with_responses(vec![Err(
        GatewayError::Transport("backend down".to_string()),
    )]));
    let (service, _, _) = build_service(Some(gateway.clone()));

    let error = service
        .submit_intake(IntakeMode::Lighting, tight_condo_answers())
        .expect_err("upstream failure surfaces");
    assert!(matches!(error, ListingServiceError::Decision(_)));
    assert_eq!(gateway.calls(), 1);
}

#[test]
fn export_transitions_job_to_done_and_writes_the_document() {
    let (service, _, _) = build_offline_service();
    let record = service
        .submit_intake(IntakeMode::DeepDive, family_home_answers())
        .expect("intake succeeds");

    let job = service
        .export(&record.id, "High", "fluency")
        .expect("export succeeds");
    assert_eq!(job.status, ExportStatus::Done);
    let path = job.file_path.clone().expect("path recorded");
    assert!(path.ends_with(&format!("{}.md", job.id.0)));

    let (fetched, contents) = service.export_document(&job.id).expect("document readable");
    assert_eq!(fetched.status, ExportStatus::Done);
    assert!(contents.contains("# Proposal + Listing Lingo Pack"));
    assert!(contents.contains("## Disclaimers"));

    let _ = std::fs::remove_file(path);
}

#[test]
fn export_with_unknown_tier_fails_as_not_found_and_marks_the_job() {
    let (service, _, exports) = build_offline_service();
    let record = service
        .submit_intake(IntakeMode::DeepDive, family_home_answers())
        .expect("intake succeeds");

    let error = service
        .export(&record.id, "Platinum", "fluency")
        .expect_err("tier should not resolve");
    assert!(matches!(
        error,
        ListingServiceError::Copy(crate::workflows::listing::copywriter::CopyError::TierNotFound(_))
    ));

    let jobs = exports.for_intake(&record.id).expect("jobs listed");
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, ExportStatus::Error);
    assert!(jobs[0].file_path.is_none());
}

#[test]
fn export_for_missing_intake_is_not_found() {
    let (service, _, _) = build_offline_service();
    let error = service
        .export(&IntakeId("intake-424242".to_string()), "High", "fluency")
        .expect_err("missing intake");
    assert!(matches!(error, ListingServiceError::IntakeNotFound(_)));
}

#[test]
fn document_for_errored_job_is_unavailable() {
    let (service, _, exports) = build_offline_service();
    let record = service
        .submit_intake(IntakeMode::Lighting, family_home_answers())
        .expect("intake succeeds");

    service
        .export(&record.id, "Platinum", "fluency")
        .expect_err("tier should not resolve");

    let job = exports
        .for_intake(&record.id)
        .expect("jobs listed")
        .pop()
        .expect("job recorded");
    let error = service
        .export_document(&job.id)
        .expect_err("no document for errored job");
    assert!(matches!(error, ListingServiceError::DocumentUnavailable(_)));
}

#[test]
fn reload_without_source_files_rebuilds_from_builtin() {
    let (service, _, _) = build_offline_service();
    let summary = service.reload_catalog().expect("reload succeeds");
    assert_eq!(summary.origin, CatalogOrigin::Builtin);
    assert_eq!(summary.services, 6);
    assert_eq!(summary.biases, 4);
}

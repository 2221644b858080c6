use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::copywriter::CopyError;
use super::decision::DecisionError;
use super::domain::{AnswerSet, IntakeMode};
use super::repository::{
    ExportJobId, ExportJobRepository, IntakeId, IntakeRepository, RepositoryError,
};
use super::service::{ListingDecisionService, ListingServiceError};

/// Inbound intake payload: the raw questionnaire answers.
#[derive(Debug, Deserialize)]
pub struct IntakePayload {
    pub answers: AnswerSet,
}

/// Inbound export request referencing a stored decision.
#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub intake_id: String,
    pub chosen_tier: String,
    pub chosen_bias_key: String,
}

/// Router builder exposing the listing decision and export endpoints.
pub fn listing_router<I, E>(service: Arc<ListingDecisionService<I, E>>) -> Router
where
    I: IntakeRepository + 'static,
    E: ExportJobRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/listing/intake/lighting",
            post(lighting_intake_handler::<I, E>),
        )
        .route(
            "/api/v1/listing/intake/deep-dive",
            post(deep_dive_intake_handler::<I, E>),
        )
        .route(
            "/api/v1/listing/intakes/:intake_id",
            get(intake_status_handler::<I, E>),
        )
        .route("/api/v1/listing/exports", post(export_handler::<I, E>))
        .route(
            "/api/v1/listing/exports/:job_id",
            get(export_status_handler::<I, E>),
        )
        .route(
            "/api/v1/listing/exports/:job_id/document",
            get(export_document_handler::<I, E>),
        )
        .route(
            "/api/v1/admin/catalog/reload",
            post(catalog_reload_handler::<I, E>),
        )
        .route("/api/v1/schemas", get(schemas_handler))
        .with_state(service)
}

pub(crate) async fn lighting_intake_handler<I, E>(
    State(service): State<Arc<ListingDecisionService<I, E>>>,
    axum::Json(payload): axum::Json<IntakePayload>,
) -> Response
where
    I: IntakeRepository + 'static,
    E: ExportJobRepository + 'static,
{
    run_intake(service, IntakeMode::Lighting, payload).await
}

pub(crate) async fn deep_dive_intake_handler<I, E>(
    State(service): State<Arc<ListingDecisionService<I, E>>>,
    axum::Json(payload): axum::Json<IntakePayload>,
) -> Response
where
    I: IntakeRepository + 'static,
    E: ExportJobRepository + 'static,
{
    run_intake(service, IntakeMode::DeepDive, payload).await
}

async fn run_intake<I, E>(
    service: Arc<ListingDecisionService<I, E>>,
    mode: IntakeMode,
    payload: IntakePayload,
) -> Response
where
    I: IntakeRepository + 'static,
    E: ExportJobRepository + 'static,
{
    // The pipeline blocks on the generative backend, so it runs off the
    // async workers.
    let outcome =
        tokio::task::spawn_blocking(move || service.submit_intake(mode, payload.answers)).await;

    match outcome {
        Ok(Ok(record)) => (StatusCode::OK, axum::Json(record.decision_view())).into_response(),
        Ok(Err(error)) => service_error_response(error),
        Err(join_error) => join_error_response(join_error),
    }
}

pub(crate) async fn intake_status_handler<I, E>(
    State(service): State<Arc<ListingDecisionService<I, E>>>,
    Path(intake_id): Path<String>,
) -> Response
where
    I: IntakeRepository + 'static,
    E: ExportJobRepository + 'static,
{
    match service.intake(&IntakeId(intake_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record.decision_view())).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn export_handler<I, E>(
    State(service): State<Arc<ListingDecisionService<I, E>>>,
    axum::Json(request): axum::Json<ExportRequest>,
) -> Response
where
    I: IntakeRepository + 'static,
    E: ExportJobRepository + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || {
        service.export(
            &IntakeId(request.intake_id),
            &request.chosen_tier,
            &request.chosen_bias_key,
        )
    })
    .await;

    match outcome {
        Ok(Ok(job)) => {
            let payload = json!({
                "jobId": job.id.0,
                "downloadUrl": format!("/api/v1/listing/exports/{}/document", job.id.0),
                "status": job.status.label(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Ok(Err(error)) => service_error_response(error),
        Err(join_error) => join_error_response(join_error),
    }
}

pub(crate) async fn export_status_handler<I, E>(
    State(service): State<Arc<ListingDecisionService<I, E>>>,
    Path(job_id): Path<String>,
) -> Response
where
    I: IntakeRepository + 'static,
    E: ExportJobRepository + 'static,
{
    match service.export_job(&ExportJobId(job_id)) {
        Ok(job) => (StatusCode::OK, axum::Json(job.status_view())).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn export_document_handler<I, E>(
    State(service): State<Arc<ListingDecisionService<I, E>>>,
    Path(job_id): Path<String>,
) -> Response
where
    I: IntakeRepository + 'static,
    E: ExportJobRepository + 'static,
{
    match service.export_document(&ExportJobId(job_id)) {
        Ok((_, contents)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
            contents,
        )
            .into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn catalog_reload_handler<I, E>(
    State(service): State<Arc<ListingDecisionService<I, E>>>,
) -> Response
where
    I: IntakeRepository + 'static,
    E: ExportJobRepository + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || service.reload_catalog()).await;

    match outcome {
        Ok(Ok(summary)) => {
            let payload = json!({
                "status": "reloaded",
                "origin": summary.origin,
                "services": summary.services,
                "biases": summary.biases,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Ok(Err(error)) => service_error_response(error),
        Err(join_error) => join_error_response(join_error),
    }
}

/// Introspection stub describing the request payloads. No business logic.
async fn schemas_handler() -> axum::Json<serde_json::Value> {
    axum::Json(json!({
        "intake": {
            "answers": "object keyed by question id; scalar values feed retrieval"
        },
        "export_request": {
            "intake_id": "string",
            "chosen_tier": "High | Medium | Low",
            "chosen_bias_key": "string (falls back to the first bias plan)"
        },
        "stacks": {
            "tier": "High | Medium | Low",
            "services": [{"service_id": "string", "name": "string", "rationale": "string"}],
            "rationale": "string"
        },
        "bias_plan": {
            "key": "string",
            "name": "string",
            "definition": "string",
            "why": "string",
            "executionBullets": "2-3 strings"
        }
    }))
}

fn service_error_response(error: ListingServiceError) -> Response {
    let status = match &error {
        ListingServiceError::IntakeNotFound(_)
        | ListingServiceError::ExportJobNotFound(_)
        | ListingServiceError::DocumentUnavailable(_)
        | ListingServiceError::Copy(CopyError::TierNotFound(_)) => StatusCode::NOT_FOUND,
        ListingServiceError::Decision(DecisionError::Validation(_))
        | ListingServiceError::Decision(DecisionError::Upstream(_))
        | ListingServiceError::Copy(CopyError::Validation(_))
        | ListingServiceError::Copy(CopyError::Upstream(_)) => StatusCode::BAD_GATEWAY,
        ListingServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        ListingServiceError::Repository(_)
        | ListingServiceError::Catalog(_)
        | ListingServiceError::ExportIo(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

fn join_error_response(error: tokio::task::JoinError) -> Response {
    let payload = json!({
        "error": format!("request task failed: {error}"),
    });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}

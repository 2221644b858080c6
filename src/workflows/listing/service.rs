use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::catalog::CatalogHandle;
use super::copywriter::{ChosenCopy, CopyError, Copywriter};
use super::decision::{DecisionEngine, DecisionError};
use super::domain::{AnswerSet, Decision, IntakeMode, Stack};
use super::export;
use super::gateway::GenerativeGateway;
use super::guardrails;
use super::ingest::{self, CatalogImportError, CatalogOrigin};
use super::repository::{
    ExportJobId, ExportJobRecord, ExportJobRepository, ExportStatus, IntakeId, IntakeRecord,
    IntakeRepository, RepositoryError,
};
use super::signals;

static INTAKE_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static EXPORT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_intake_id() -> IntakeId {
    let id = INTAKE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    IntakeId(format!("intake-{id:06}"))
}

fn next_export_id() -> ExportJobId {
    let id = EXPORT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ExportJobId(format!("export-{id:06}"))
}

/// Error raised by the listing decision service.
#[derive(Debug, thiserror::Error)]
pub enum ListingServiceError {
    #[error("intake record {0} not found")]
    IntakeNotFound(String),
    #[error("export job {0} not found")]
    ExportJobNotFound(String),
    #[error("export document for job {0} is not available")]
    DocumentUnavailable(String),
    #[error(transparent)]
    Decision(#[from] DecisionError),
    #[error(transparent)]
    Copy(#[from] CopyError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Catalog(#[from] CatalogImportError),
    #[error("failed to write export document: {0}")]
    ExportIo(#[from] std::io::Error),
}

/// Counts reported back from an admin catalog rebuild.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogReloadSummary {
    pub origin: CatalogOrigin,
    pub services: usize,
    pub biases: usize,
}

/// Service composing signals, retrieval, the decision engine, guardrails,
/// the copywriter, and the exporter over the configured repositories. The
/// whole pipeline is synchronous; each request runs to completion.
pub struct ListingDecisionService<I, E> {
    catalog: Arc<CatalogHandle>,
    catalog_dir: PathBuf,
    intakes: Arc<I>,
    exports: Arc<E>,
    engine: DecisionEngine,
    copywriter: Copywriter,
    export_dir: PathBuf,
}

impl<I, E> ListingDecisionService<I, E>
where
    I: IntakeRepository + 'static,
    E: ExportJobRepository + 'static,
{
    pub fn new(
        catalog: Arc<CatalogHandle>,
        catalog_dir: PathBuf,
        intakes: Arc<I>,
        exports: Arc<E>,
        gateway: Option<Arc<dyn GenerativeGateway>>,
        export_dir: PathBuf,
    ) -> Self {
        Self {
            catalog,
            catalog_dir,
            intakes,
            exports,
            engine: DecisionEngine::new(gateway.clone()),
            copywriter: Copywriter::new(gateway),
            export_dir,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.engine.is_offline()
    }

    /// Run the full intake pipeline and persist the resulting record.
    ///
    /// Nothing is stored unless the decision passed validation and the
    /// guardrails have been applied to every stack.
    pub fn submit_intake(
        &self,
        mode: IntakeMode,
        answers: AnswerSet,
    ) -> Result<IntakeRecord, ListingServiceError> {
        let signals = signals::compute(&answers);
        let catalog = self.catalog.snapshot();
        let decision = self.engine.decide(&catalog, &answers, &signals, mode)?;
        let decision = enforce_decision(&answers, decision);

        let record = IntakeRecord {
            id: next_intake_id(),
            mode,
            answers,
            signals,
            decision,
            created_at: Utc::now(),
        };
        let stored = self.intakes.insert(record)?;
        info!(intake_id = %stored.id.0, mode = mode.label(), "intake decision recorded");
        Ok(stored)
    }

    pub fn intake(&self, id: &IntakeId) -> Result<IntakeRecord, ListingServiceError> {
        self.intakes
            .fetch(id)?
            .ok_or_else(|| ListingServiceError::IntakeNotFound(id.0.clone()))
    }

    /// Generate the copy pack for a stored decision and render the export
    /// document, tracking the job's single pending → done | error transition.
    pub fn export(
        &self,
        intake_id: &IntakeId,
        chosen_tier: &str,
        chosen_bias_key: &str,
    ) -> Result<ExportJobRecord, ListingServiceError> {
        let intake = self.intake(intake_id)?;

        let mut job = ExportJobRecord {
            id: next_export_id(),
            intake_id: intake.id.clone(),
            chosen_tier: chosen_tier.to_string(),
            chosen_bias_key: chosen_bias_key.to_string(),
            status: ExportStatus::Pending,
            file_path: None,
            created_at: Utc::now(),
        };
        self.exports.insert(job.clone())?;

        match self.run_export(&intake, &job) {
            Ok(path) => {
                job.status = ExportStatus::Done;
                job.file_path = Some(path.to_string_lossy().into_owned());
                self.exports.update(job.clone())?;
                info!(job_id = %job.id.0, "export document rendered");
                Ok(job)
            }
            Err(error) => {
                job.status = ExportStatus::Error;
                if let Err(update_error) = self.exports.update(job.clone()) {
                    warn!(job_id = %job.id.0, %update_error, "failed to mark export job errored");
                }
                Err(error)
            }
        }
    }

    pub fn export_job(&self, id: &ExportJobId) -> Result<ExportJobRecord, ListingServiceError> {
        self.exports
            .fetch(id)?
            .ok_or_else(|| ListingServiceError::ExportJobNotFound(id.0.clone()))
    }

    /// Read back a completed job's rendered document.
    pub fn export_document(
        &self,
        id: &ExportJobId,
    ) -> Result<(ExportJobRecord, String), ListingServiceError> {
        let job = self.export_job(id)?;
        let path = match (&job.status, &job.file_path) {
            (ExportStatus::Done, Some(path)) => path.clone(),
            _ => return Err(ListingServiceError::DocumentUnavailable(id.0.clone())),
        };
        let contents = std::fs::read_to_string(path)?;
        Ok((job, contents))
    }

    /// Rebuild the catalog snapshot from the source sheets (or the builtin
    /// fallback). Readers keep whatever snapshot they already hold.
    pub fn reload_catalog(&self) -> Result<CatalogReloadSummary, ListingServiceError> {
        let (catalog, origin) = ingest::load_catalog(&self.catalog_dir)?;
        let summary = CatalogReloadSummary {
            origin,
            services: catalog.services().len(),
            biases: catalog.biases().len(),
        };
        self.catalog.replace(catalog);
        info!(
            services = summary.services,
            biases = summary.biases,
            "catalog snapshot rebuilt"
        );
        Ok(summary)
    }

    fn run_export(
        &self,
        intake: &IntakeRecord,
        job: &ExportJobRecord,
    ) -> Result<PathBuf, ListingServiceError> {
        let catalog = self.catalog.snapshot();
        let ChosenCopy { stack, bias, pack } = self.copywriter.generate(
            &catalog,
            intake,
            &job.chosen_tier,
            &job.chosen_bias_key,
        )?;
        let document = export::render_document(intake, &stack, &bias, &pack);
        let path = export::write_document(&self.export_dir, &job.id, &document)?;
        Ok(path)
    }
}

fn enforce_decision(answers: &AnswerSet, decision: Decision) -> Decision {
    let Decision { stacks, biases } = decision;
    let stacks = stacks
        .into_iter()
        .map(|stack| {
            let Stack {
                tier,
                services,
                rationale,
            } = stack;
            Stack {
                tier,
                services: guardrails::enforce_rules(answers, services),
                rationale,
            }
        })
        .collect();
    Decision { stacks, biases }
}

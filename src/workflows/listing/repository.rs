use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{AnswerSet, BiasMiniPlan, Decision, IntakeMode, SignalVector, Stack};

/// Identifier wrapper for stored intake decisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntakeId(pub String);

/// Identifier wrapper for export jobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExportJobId(pub String);

/// Immutable record of one intake run: the answers as submitted plus the
/// validated, guardrail-enforced decision. Superseded by a new record on a
/// later request, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeRecord {
    pub id: IntakeId,
    pub mode: IntakeMode,
    pub answers: AnswerSet,
    pub signals: SignalVector,
    pub decision: Decision,
    pub created_at: DateTime<Utc>,
}

impl IntakeRecord {
    pub fn decision_view(&self) -> IntakeDecisionView {
        IntakeDecisionView {
            intake_id: self.id.clone(),
            mode: self.mode.label(),
            signals: self.signals,
            stacks: self.decision.stacks.clone(),
            biases: self.decision.biases.clone(),
        }
    }
}

/// Sanitized intake representation for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct IntakeDecisionView {
    pub intake_id: IntakeId,
    pub mode: &'static str,
    pub signals: SignalVector,
    pub stacks: Vec<Stack>,
    pub biases: Vec<BiasMiniPlan>,
}

/// Lifecycle of an export job. Exactly one transition away from `Pending`
/// happens, when the document render completes or fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportStatus {
    Pending,
    Done,
    Error,
}

impl ExportStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ExportStatus::Pending => "pending",
            ExportStatus::Done => "done",
            ExportStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportJobRecord {
    pub id: ExportJobId,
    pub intake_id: IntakeId,
    pub chosen_tier: String,
    pub chosen_bias_key: String,
    pub status: ExportStatus,
    pub file_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ExportJobRecord {
    pub fn status_view(&self) -> ExportJobStatusView {
        ExportJobStatusView {
            job_id: self.id.clone(),
            intake_id: self.intake_id.clone(),
            chosen_tier: self.chosen_tier.clone(),
            chosen_bias_key: self.chosen_bias_key.clone(),
            status: self.status.label(),
            file_path: self.file_path.clone(),
        }
    }
}

/// Sanitized job representation for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ExportJobStatusView {
    pub job_id: ExportJobId,
    pub intake_id: IntakeId,
    pub chosen_tier: String,
    pub chosen_bias_key: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction for intake records; creation and lookup only.
pub trait IntakeRepository: Send + Sync {
    fn insert(&self, record: IntakeRecord) -> Result<IntakeRecord, RepositoryError>;
    fn fetch(&self, id: &IntakeId) -> Result<Option<IntakeRecord>, RepositoryError>;
}

/// Storage abstraction for export jobs. `update` exists solely for the
/// single pending → done | error transition.
pub trait ExportJobRepository: Send + Sync {
    fn insert(&self, record: ExportJobRecord) -> Result<ExportJobRecord, RepositoryError>;
    fn update(&self, record: ExportJobRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ExportJobId) -> Result<Option<ExportJobRecord>, RepositoryError>;
    fn for_intake(&self, intake_id: &IntakeId) -> Result<Vec<ExportJobRecord>, RepositoryError>;
}

/// Default process-local intake store.
#[derive(Debug, Default)]
pub struct MemoryIntakeRepository {
    records: Mutex<HashMap<IntakeId, IntakeRecord>>,
}

impl IntakeRepository for MemoryIntakeRepository {
    fn insert(&self, record: IntakeRecord) -> Result<IntakeRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("intake mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &IntakeId) -> Result<Option<IntakeRecord>, RepositoryError> {
        let guard = self.records.lock().expect("intake mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

/// Default process-local export job store.
#[derive(Debug, Default)]
pub struct MemoryExportJobRepository {
    records: Mutex<HashMap<ExportJobId, ExportJobRecord>>,
}

impl ExportJobRepository for MemoryExportJobRepository {
    fn insert(&self, record: ExportJobRecord) -> Result<ExportJobRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("export mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: ExportJobRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("export mutex poisoned");
        if !guard.contains_key(&record.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(record.id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &ExportJobId) -> Result<Option<ExportJobRecord>, RepositoryError> {
        let guard = self.records.lock().expect("export mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn for_intake(&self, intake_id: &IntakeId) -> Result<Vec<ExportJobRecord>, RepositoryError> {
        let guard = self.records.lock().expect("export mutex poisoned");
        let mut jobs: Vec<ExportJobRecord> = guard
            .values()
            .filter(|record| &record.intake_id == intake_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(jobs)
    }
}

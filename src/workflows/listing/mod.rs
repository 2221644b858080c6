//! Listing marketing decision workflow: signal scoring, catalog retrieval,
//! generative decision requests with deterministic guardrail overrides, copy
//! pack generation, and document export.

pub mod catalog;
pub mod copywriter;
pub mod decision;
pub mod domain;
pub mod export;
pub mod gateway;
pub mod guardrails;
pub mod ingest;
pub mod repository;
pub mod retrieval;
pub mod router;
pub mod service;
pub mod signals;

#[cfg(test)]
mod tests;

pub use catalog::{BiasEntry, CatalogHandle, MarketingCatalog, ServiceEntry};
pub use copywriter::{ChosenCopy, CopyError, CopyPack, Copywriter};
pub use decision::{DecisionEngine, DecisionError, DecisionValidationError};
pub use domain::{
    AnswerSet, BiasMiniPlan, Decision, IntakeMode, ServiceItem, SignalVector, Stack, TierLabel,
};
pub use gateway::{ChatCompletionsClient, GatewayError, GenerativeGateway};
pub use ingest::{CatalogImportError, CatalogImporter, CatalogOrigin};
pub use repository::{
    ExportJobId, ExportJobRecord, ExportJobRepository, ExportStatus, IntakeDecisionView, IntakeId,
    IntakeRecord, IntakeRepository, MemoryExportJobRepository, MemoryIntakeRepository,
    RepositoryError,
};
pub use router::listing_router;
pub use service::{CatalogReloadSummary, ListingDecisionService, ListingServiceError};

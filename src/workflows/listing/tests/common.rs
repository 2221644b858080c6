use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use crate::workflows::listing::catalog::{CatalogHandle, MarketingCatalog};
use crate::workflows::listing::decision::offline_decision;
use crate::workflows::listing::domain::AnswerSet;
use crate::workflows::listing::gateway::{GatewayError, GenerativeGateway};
use crate::workflows::listing::repository::{MemoryExportJobRepository, MemoryIntakeRepository};
use crate::workflows::listing::service::ListingDecisionService;

pub(super) type TestService =
    ListingDecisionService<MemoryIntakeRepository, MemoryExportJobRepository>;

static EXPORT_DIR_SEQUENCE: AtomicUsize = AtomicUsize::new(0);

pub(super) fn unique_export_dir() -> PathBuf {
    let n = EXPORT_DIR_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("launchpad-ai-tests-{}-{n}", std::process::id()))
}

pub(super) fn tight_condo_answers() -> AnswerSet {
    serde_json::from_value(json!({
        "propertyType": "Condo",
        "beds": 1,
        "baths": 1.0,
        "interiorSizeSqft": 620,
        "conditionBand": "updated",
        "tightRooms": true,
        "naturalLight": "good",
        "occupancy": "occupied",
        "quirkyFlow": false,
        "signatureFeature": "Skyline peek",
        "likelyBuyer": "remote_buyer",
        "locationPerk": "walkable",
        "timelinePressure": "medium",
        "agentOnCamComfort": "medium",
        "showingWindow": "morning"
    }))
    .expect("answer map")
}

pub(super) fn family_home_answers() -> AnswerSet {
    serde_json::from_value(json!({
        "propertyType": "SFR",
        "beds": 3,
        "baths": 2.0,
        "interiorSizeSqft": 1800,
        "conditionBand": "updated",
        "tightRooms": false,
        "naturalLight": "good",
        "occupancy": "occupied",
        "quirkyFlow": false,
        "signatureFeature": "Corner lot",
        "likelyBuyer": "move_up",
        "locationPerk": "parks",
        "timelinePressure": "medium",
        "agentOnCamComfort": "low",
        "showingWindow": "evening"
    }))
    .expect("answer map")
}

pub(super) fn build_offline_service() -> (
    Arc<TestService>,
    Arc<MemoryIntakeRepository>,
    Arc<MemoryExportJobRepository>,
) {
    build_service(None)
}

pub(super) fn build_service(
    gateway: Option<Arc<dyn GenerativeGateway>>,
) -> (
    Arc<TestService>,
    Arc<MemoryIntakeRepository>,
    Arc<MemoryExportJobRepository>,
) {
    let intakes = Arc::new(MemoryIntakeRepository::default());
    let exports = Arc::new(MemoryExportJobRepository::default());
    let service = ListingDecisionService::new(
        Arc::new(CatalogHandle::new(MarketingCatalog::builtin())),
        std::env::temp_dir().join("launchpad-ai-no-catalog-dir"),
        intakes.clone(),
        exports.clone(),
        gateway,
        unique_export_dir(),
    );
    (Arc::new(service), intakes, exports)
}

pub(super) fn valid_decision_payload() -> Value {
    serde_json::to_value(offline_decision()).expect("fixture serializes")
}

pub(super) fn invalid_decision_payload() -> Value {
    json!({"stacks": [], "biases": []})
}

/// Gateway double that replays a scripted sequence of responses and counts
/// how many calls were made.
#[derive(Debug, Default)]
pub(super) struct ScriptedGateway {
    responses: Mutex<VecDeque<Result<Value, GatewayError>>>,
    calls: AtomicUsize,
}

impl ScriptedGateway {
    pub(super) fn with_responses(responses: Vec<Result<Value, GatewayError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl GenerativeGateway for ScriptedGateway {
    fn complete_json(
        &self,
        _system_instruction: &str,
        _payload: &Value,
    ) -> Result<Value, GatewayError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.responses
            .lock()
            .expect("script mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Transport("script exhausted".to_string())))
    }
}

pub(super) async fn read_json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use launchpad_ai::workflows::listing::{
    listing_router, CatalogHandle, ListingDecisionService, MarketingCatalog,
    MemoryExportJobRepository, MemoryIntakeRepository,
};
use serde_json::{json, Value};
use tower::ServiceExt;

static EXPORT_DIR_SEQUENCE: AtomicUsize = AtomicUsize::new(0);

fn build_service() -> Arc<ListingDecisionService<MemoryIntakeRepository, MemoryExportJobRepository>>
{
    let n = EXPORT_DIR_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let export_dir = std::env::temp_dir().join(format!(
        "launchpad-ai-decision-it-{}-{n}",
        std::process::id()
    ));
    Arc::new(ListingDecisionService::new(
        Arc::new(CatalogHandle::new(MarketingCatalog::builtin())),
        std::env::temp_dir().join("launchpad-ai-no-catalog"),
        Arc::new(MemoryIntakeRepository::default()),
        Arc::new(MemoryExportJobRepository::default()),
        None,
        export_dir,
    ))
}

fn tight_condo_payload() -> Value {
    json!({
        "answers": {
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
        }
    })
}

async fn post_json(router: axum::Router, uri: &str, body: &Value) -> (axum::http::StatusCode, Value) {
    let response = router
        .oneshot(
            axum::http::Request::post(uri)
                .header(axum::http::header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from(serde_json::to_vec(body).unwrap()))
                .unwrap(),
        )
        .await
        .expect("route executes");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    let payload = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, payload)
}

#[tokio::test]
async fn lighting_intake_returns_guardrailed_stacks_and_signals() {
    let service = build_service();
    let router = listing_router(service);

    let (status, payload) = post_json(
        router,
        "/api/v1/listing/intake/lighting",
        &tight_condo_payload(),
    )
    .await;

    assert_eq!(status, axum::http::StatusCode::OK);
    assert_eq!(payload["signals"]["complexity"], json!(0.487));

    let stacks = payload["stacks"].as_array().expect("stacks array");
    assert_eq!(stacks.len(), 3);

    let tiers: HashSet<&str> = stacks
        .iter()
        .map(|stack| stack["tier"].as_str().expect("tier"))
        .collect();
    assert_eq!(tiers, HashSet::from(["High", "Medium", "Low"]));

    for stack in stacks {
        let ids: Vec<&str> = stack["services"]
            .as_array()
            .expect("services")
            .iter()
            .map(|service| service["service_id"].as_str().expect("service_id"))
            .collect();
        assert!(ids.contains(&"2d_floor_plan"), "missing floor plan: {ids:?}");
        assert!(ids.contains(&"zillow_3d"), "missing 3d tour: {ids:?}");
        assert!(
            !ids.contains(&"virtual_staging"),
            "staging must be pruned on occupied property"
        );
    }

    let biases = payload["biases"].as_array().expect("biases array");
    assert_eq!(biases.len(), 3);
    for bias in biases {
        let bullets = bias["executionBullets"].as_array().expect("bullets");
        assert!(
            (2..=3).contains(&bullets.len()),
            "bias {} carries {} bullets",
            bias["key"],
            bullets.len()
        );
    }
}

#[tokio::test]
async fn offline_mode_is_deterministic_across_requests() {
    let service = build_service();

    let first = post_json(
        listing_router(service.clone()),
        "/api/v1/listing/intake/lighting",
        &tight_condo_payload(),
    )
    .await
    .1;
    let second = post_json(
        listing_router(service),
        "/api/v1/listing/intake/lighting",
        &tight_condo_payload(),
    )
    .await
    .1;

    assert_eq!(first["stacks"], second["stacks"]);
    assert_eq!(first["biases"], second["biases"]);
    assert_eq!(first["signals"], second["signals"]);
    assert_ne!(first["intake_id"], second["intake_id"]);
}

#[tokio::test]
async fn stored_intakes_are_retrievable_and_missing_ids_are_not_found() {
    let service = build_service();
    let router = listing_router(service);

    let (_, created) = post_json(
        router.clone(),
        "/api/v1/listing/intake/deep-dive",
        &tight_condo_payload(),
    )
    .await;
    let intake_id = created["intake_id"].as_str().expect("intake id");

    let response = router
        .clone()
        .oneshot(
            axum::http::Request::get(format!("/api/v1/listing/intakes/{intake_id}"))
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let missing = router
        .oneshot(
            axum::http::Request::get("/api/v1/listing/intakes/intake-424242")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(missing.status(), axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_answer_sets_still_produce_a_valid_decision() {
    let service = build_service();
    let router = listing_router(service);

    let (status, payload) = post_json(
        router,
        "/api/v1/listing/intake/lighting",
        &json!({"answers": {}}),
    )
    .await;

    assert_eq!(status, axum::http::StatusCode::OK);
    assert_eq!(payload["stacks"].as_array().expect("stacks").len(), 3);
    for component in ["complexity", "clarityNeed", "momentumPressure", "brandLift", "locationEfficiency"] {
        let value = payload["signals"][component].as_f64().expect("signal value");
        assert!((0.0..=1.0).contains(&value), "{component} out of range");
    }
}

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// One marketable production service offered to listing agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub service_id: String,
    pub name: String,
    pub deliverables: Vec<String>,
    pub constraints: Vec<String>,
    pub compatible_biases: Vec<String>,
    pub price_band: String,
}

/// A named cognitive principle with ready-made copy and cadence patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiasEntry {
    pub key: String,
    pub name: String,
    pub definition: String,
    pub copy_patterns: Vec<String>,
    pub cadence_patterns: Vec<String>,
    pub compatible_services: Vec<String>,
}

/// The full retrieval corpus: services and biases in catalog order.
///
/// Immutable after construction. Request paths hold an `Arc` snapshot, so an
/// admin rebuild never disturbs in-flight retrievals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketingCatalog {
    services: Vec<ServiceEntry>,
    biases: Vec<BiasEntry>,
}

impl MarketingCatalog {
    pub fn new(services: Vec<ServiceEntry>, biases: Vec<BiasEntry>) -> Self {
        Self { services, biases }
    }

    pub fn services(&self) -> &[ServiceEntry] {
        &self.services
    }

    pub fn biases(&self) -> &[BiasEntry] {
        &self.biases
    }

    /// Default catalog used when no source files are present, so demos and
    /// tests run without any data directory.
    pub fn builtin() -> Self {
        fn strings(values: &[&str]) -> Vec<String> {
            values.iter().map(|value| value.to_string()).collect()
        }

        fn service(
            service_id: &str,
            name: &str,
            deliverables: &[&str],
            constraints: &[&str],
            compatible_biases: &[&str],
            price_band: &str,
        ) -> ServiceEntry {
            ServiceEntry {
                service_id: service_id.to_string(),
                name: name.to_string(),
                deliverables: strings(deliverables),
                constraints: strings(constraints),
                compatible_biases: strings(compatible_biases),
                price_band: price_band.to_string(),
            }
        }

        fn bias(
            key: &str,
            name: &str,
            definition: &str,
            copy_patterns: &[&str],
            cadence_patterns: &[&str],
            compatible_services: &[&str],
        ) -> BiasEntry {
            BiasEntry {
                key: key.to_string(),
                name: name.to_string(),
                definition: definition.to_string(),
                copy_patterns: strings(copy_patterns),
                cadence_patterns: strings(cadence_patterns),
                compatible_services: strings(compatible_services),
            }
        }

        Self::new(
            vec![
                service(
                    "show_stopper",
                    "Show Stopper",
                    &["Hero set"],
                    &[],
                    &["anchoring", "novelty"],
                    "high",
                ),
                service(
                    "aerials",
                    "Aerials",
                    &["Drone stills"],
                    &[],
                    &["authority", "social_proof"],
                    "medium",
                ),
                service(
                    "2d_floor_plan",
                    "2D Floor Plan",
                    &["Schematic plan"],
                    &[],
                    &["fluency"],
                    "low",
                ),
                service(
                    "zillow_3d",
                    "Zillow 3D",
                    &["Tour"],
                    &[],
                    &["fluency", "mere_exposure"],
                    "medium",
                ),
                service(
                    "virtual_staging",
                    "Virtual Staging",
                    &["Staged photos"],
                    &["vacant_only"],
                    &["anchoring"],
                    "low",
                ),
                service(
                    "quick_snaps",
                    "Quick Snaps",
                    &["Fast-turn images"],
                    &[],
                    &["mere_exposure", "loss_aversion"],
                    "low",
                ),
            ],
            vec![
                bias(
                    "fluency",
                    "Fluency / Cognitive Ease",
                    "Reduce cognitive load.",
                    &["Clear, short lines", "Chunk specs"],
                    &["Morning", "Evening"],
                    &["2d_floor_plan", "zillow_3d"],
                ),
                bias(
                    "anchoring",
                    "Anchoring",
                    "Lead with signature value.",
                    &["Start with the best"],
                    &["Lunch"],
                    &["show_stopper", "luxe"],
                ),
                bias(
                    "mere_exposure",
                    "Mere Exposure",
                    "Repeat to build familiarity.",
                    &["Series posts"],
                    &["Evening"],
                    &["quick_snaps", "zillow_3d"],
                ),
                bias(
                    "loss_aversion",
                    "Loss Aversion",
                    "Highlight what buyers miss.",
                    &["Don't miss..."],
                    &["Morning"],
                    &["quick_snaps"],
                ),
            ],
        )
    }
}

/// Shared handle over the current catalog snapshot.
#[derive(Debug)]
pub struct CatalogHandle {
    current: RwLock<Arc<MarketingCatalog>>,
}

impl CatalogHandle {
    pub fn new(catalog: MarketingCatalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    pub fn snapshot(&self) -> Arc<MarketingCatalog> {
        self.current.read().expect("catalog lock poisoned").clone()
    }

    pub fn replace(&self, catalog: MarketingCatalog) {
        *self.current.write().expect("catalog lock poisoned") = Arc::new(catalog);
    }
}

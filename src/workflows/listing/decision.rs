use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use super::catalog::MarketingCatalog;
use super::domain::{
    AnswerSet, BiasMiniPlan, Decision, IntakeMode, ServiceItem, SignalVector, Stack, TierLabel,
};
use super::gateway::GenerativeGateway;
use super::retrieval::{self, RetrievedContext};

const CONTEXT_K: usize = 8;
const MIN_EXECUTION_BULLETS: usize = 2;
const MAX_EXECUTION_BULLETS: usize = 3;

const PLANNER_SYSTEM_INSTRUCTION: &str = "You are a marketing-production planner for \
residential listings. Compliance: schools/safety language must be factual; post-production \
limited to non-material removals + sky/grass. Return structured JSON only.";

/// Reasons a backend payload is rejected as a decision.
#[derive(Debug, thiserror::Error)]
pub enum DecisionValidationError {
    #[error("decision payload did not match the expected shape: {0}")]
    Malformed(String),
    #[error("expected exactly 3 stacks, found {0}")]
    StackCount(usize),
    #[error("unrecognized stack tier '{0}'")]
    UnknownTier(String),
    #[error("stack tiers must cover High, Medium, and Low exactly once")]
    TierCoverage,
    #[error("expected exactly 3 bias mini-plans, found {0}")]
    BiasCount(usize),
    #[error("bias plan '{key}' must carry 2-3 execution bullets, found {count}")]
    ExecutionBullets { key: String, count: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    #[error(transparent)]
    Validation(#[from] DecisionValidationError),
    #[error("generative backend unreachable: {0}")]
    Upstream(String),
}

/// Requests a tiered decision from the generative backend, or serves the
/// fixed offline sample when no backend is configured.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    gateway: Option<Arc<dyn GenerativeGateway>>,
}

impl DecisionEngine {
    pub fn new(gateway: Option<Arc<dyn GenerativeGateway>>) -> Self {
        Self { gateway }
    }

    pub fn is_offline(&self) -> bool {
        self.gateway.is_none()
    }

    pub fn decide(
        &self,
        catalog: &MarketingCatalog,
        answers: &AnswerSet,
        signals: &SignalVector,
        mode: IntakeMode,
    ) -> Result<Decision, DecisionError> {
        let context = retrieval::retrieve_context(catalog, answers, CONTEXT_K);

        let Some(gateway) = &self.gateway else {
            return Ok(offline_decision());
        };

        let payload = decision_prompt(answers, signals, &context, mode);
        match self.request_validated(gateway.as_ref(), &payload) {
            Err(DecisionError::Validation(first_failure)) => {
                // Retry budget is exactly one fresh request; a second
                // validation failure is surfaced to the caller.
                warn!(%first_failure, "decision payload failed validation, retrying once");
                self.request_validated(gateway.as_ref(), &payload)
            }
            outcome => outcome,
        }
    }

    fn request_validated(
        &self,
        gateway: &dyn GenerativeGateway,
        payload: &Value,
    ) -> Result<Decision, DecisionError> {
        let raw = gateway
            .complete_json(PLANNER_SYSTEM_INSTRUCTION, payload)
            .map_err(|err| {
                if err.is_malformed() {
                    DecisionError::Validation(DecisionValidationError::Malformed(err.to_string()))
                } else {
                    DecisionError::Upstream(err.to_string())
                }
            })?;
        validate_decision(raw).map_err(DecisionError::Validation)
    }
}

fn decision_prompt(
    answers: &AnswerSet,
    signals: &SignalVector,
    context: &RetrievedContext,
    mode: IntakeMode,
) -> Value {
    json!({
        "mode": mode.label(),
        "intake_facts": answers,
        "signals": signals,
        "catalog_snippets": context,
        "instructions": {
            "always_three_tiers": true,
            "tiers": TierLabel::ALL.map(|tier| tier.label()),
            "bias_count": 3,
        },
    })
}

/// Check an untrusted payload against the decision schema and bounds.
pub fn validate_decision(raw: Value) -> Result<Decision, DecisionValidationError> {
    let raw: RawDecision = serde_json::from_value(raw)
        .map_err(|err| DecisionValidationError::Malformed(err.to_string()))?;

    if raw.stacks.len() != 3 {
        return Err(DecisionValidationError::StackCount(raw.stacks.len()));
    }

    let mut seen_tiers = HashSet::new();
    let mut stacks = Vec::with_capacity(raw.stacks.len());
    for stack in raw.stacks {
        let tier = TierLabel::parse(&stack.tier)
            .ok_or_else(|| DecisionValidationError::UnknownTier(stack.tier.clone()))?;
        if !seen_tiers.insert(tier) {
            return Err(DecisionValidationError::TierCoverage);
        }
        stacks.push(Stack {
            tier,
            services: stack.services,
            rationale: stack.rationale,
        });
    }

    if raw.biases.len() != 3 {
        return Err(DecisionValidationError::BiasCount(raw.biases.len()));
    }
    for bias in &raw.biases {
        let count = bias.execution_bullets.len();
        if !(MIN_EXECUTION_BULLETS..=MAX_EXECUTION_BULLETS).contains(&count) {
            return Err(DecisionValidationError::ExecutionBullets {
                key: bias.key.clone(),
                count,
            });
        }
    }

    Ok(Decision {
        stacks,
        biases: raw.biases,
    })
}

#[derive(Debug, Deserialize)]
struct RawDecision {
    stacks: Vec<RawStack>,
    biases: Vec<BiasMiniPlan>,
}

#[derive(Debug, Deserialize)]
struct RawStack {
    tier: String,
    services: Vec<ServiceItem>,
    rationale: String,
}

/// The fixed sample decision served whenever no backend is configured. This
/// is a deliberate demo-mode simplification: the same content is returned for
/// every request, and guardrails still reshape it downstream.
pub(crate) fn offline_decision() -> Decision {
    fn service(service_id: &str, name: &str, rationale: &str) -> ServiceItem {
        ServiceItem {
            service_id: service_id.to_string(),
            name: name.to_string(),
            rationale: rationale.to_string(),
        }
    }

    fn bias(key: &str, name: &str, definition: &str, why: &str, bullets: &[&str]) -> BiasMiniPlan {
        BiasMiniPlan {
            key: key.to_string(),
            name: name.to_string(),
            definition: definition.to_string(),
            why: why.to_string(),
            execution_bullets: bullets.iter().map(|b| b.to_string()).collect(),
        }
    }

    Decision {
        stacks: vec![
            Stack {
                tier: TierLabel::High,
                services: vec![
                    service("show_stopper", "Show Stopper", "Flagship visuals."),
                    service("aerials", "Aerials", "Context and scale."),
                ],
                rationale: "Max impact".to_string(),
            },
            Stack {
                tier: TierLabel::Medium,
                services: vec![
                    service("zillow_3d", "Zillow 3D", "Continuity."),
                    service("2d_floor_plan", "2D Floor Plan", "Clarity."),
                ],
                rationale: "Core remote-friendly".to_string(),
            },
            Stack {
                tier: TierLabel::Low,
                services: vec![
                    service("2d_floor_plan", "2D Floor Plan", "Clarity."),
                    service("quick_snaps", "Quick Snaps", "Speed."),
                ],
                rationale: "Lean, fast".to_string(),
            },
        ],
        biases: vec![
            bias(
                "fluency",
                "Fluency",
                "Ease",
                "Tight rooms / remote buyers",
                &["Chunk specs", "Simple headlines"],
            ),
            bias(
                "mere_exposure",
                "Mere Exposure",
                "Familiarity",
                "Build repetition",
                &["Series posts", "Retargeting"],
            ),
            bias(
                "anchoring",
                "Anchoring",
                "Lead with best",
                "Signature feature",
                &["Lead with hero", "Frame comparisons"],
            ),
        ],
    }
}

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use super::catalog::MarketingCatalog;
use super::domain::{BiasMiniPlan, Stack, TierLabel};
use super::gateway::GenerativeGateway;
use super::repository::IntakeRecord;
use super::retrieval::{self, RetrievedContext};

const COPY_CONTEXT_K: usize = 6;

const COPYWRITER_SYSTEM_INSTRUCTION: &str = "You write neutral, factual, bias-aware listing \
content. Compliance: schools/safety factual only. Post-production limited. Return JSON.";

pub const SCHOOLS_SAFETY_KEY: &str = "schools_safety";
pub const POST_PRODUCTION_KEY: &str = "post_production";

const SCHOOLS_SAFETY_DEFAULT: &str =
    "School and safety references must remain factual only—use names, distances, and links.";
const POST_PRODUCTION_DEFAULT: &str =
    "Post-production limited to non-material item removals and sky/grass adjustments.";

/// Structured marketing copy for one chosen stack + bias plan. The section
/// bodies stay schemaless (`Value`) because the backend nests flyers, scripts,
/// and checklists to varying depth; the exporter renders them recursively.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyPack {
    pub core_listing_print: Value,
    pub digital_social: Value,
    pub direct_outreach: Value,
    pub cadence: Value,
    pub ops_checklists: Value,
    pub kpis: Vec<String>,
    pub disclaimers: BTreeMap<String, String>,
}

/// The stack and bias plan a copy pack was generated for.
#[derive(Debug, Clone, PartialEq)]
pub struct ChosenCopy {
    pub stack: Stack,
    pub bias: BiasMiniPlan,
    pub pack: CopyPack,
}

#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    #[error("no stack matches tier '{0}'")]
    TierNotFound(String),
    #[error("copy pack payload failed validation: {0}")]
    Validation(String),
    #[error("generative backend unreachable: {0}")]
    Upstream(String),
}

/// Requests the marketing copy pack for a stored decision, or serves the
/// fixed offline pack when no backend is configured. Disclaimers are always
/// ensured afterwards, whichever path produced the pack.
#[derive(Debug, Clone)]
pub struct Copywriter {
    gateway: Option<Arc<dyn GenerativeGateway>>,
}

impl Copywriter {
    pub fn new(gateway: Option<Arc<dyn GenerativeGateway>>) -> Self {
        Self { gateway }
    }

    pub fn generate(
        &self,
        catalog: &MarketingCatalog,
        record: &IntakeRecord,
        chosen_tier: &str,
        chosen_bias_key: &str,
    ) -> Result<ChosenCopy, CopyError> {
        let stack = TierLabel::parse(chosen_tier)
            .and_then(|tier| record.decision.stack_for_tier(tier))
            .cloned()
            .ok_or_else(|| CopyError::TierNotFound(chosen_tier.to_string()))?;

        let bias = record
            .decision
            .biases
            .iter()
            .find(|plan| plan.key == chosen_bias_key)
            .unwrap_or(&record.decision.biases[0])
            .clone();

        let context = retrieval::retrieve_context(catalog, &record.answers, COPY_CONTEXT_K);

        let mut pack = match &self.gateway {
            None => offline_copy_pack(),
            Some(gateway) => {
                let payload = copy_prompt(record, &stack, &bias, &context);
                match self.request_pack(gateway.as_ref(), &payload) {
                    Err(CopyError::Validation(first_failure)) => {
                        warn!(%first_failure, "copy pack failed validation, retrying once");
                        self.request_pack(gateway.as_ref(), &payload)
                    }
                    outcome => outcome,
                }?
            }
        };

        ensure_disclaimers(&mut pack);
        Ok(ChosenCopy { stack, bias, pack })
    }

    fn request_pack(
        &self,
        gateway: &dyn GenerativeGateway,
        payload: &Value,
    ) -> Result<CopyPack, CopyError> {
        let raw = gateway
            .complete_json(COPYWRITER_SYSTEM_INSTRUCTION, payload)
            .map_err(|err| {
                if err.is_malformed() {
                    CopyError::Validation(err.to_string())
                } else {
                    CopyError::Upstream(err.to_string())
                }
            })?;
        serde_json::from_value(raw).map_err(|err| CopyError::Validation(err.to_string()))
    }
}

fn copy_prompt(
    record: &IntakeRecord,
    stack: &Stack,
    bias: &BiasMiniPlan,
    context: &RetrievedContext,
) -> Value {
    json!({
        "intake": {
            "answers": record.answers,
            "signals": record.signals,
        },
        "chosen_stack": stack,
        "chosen_bias": bias,
        "kb_context": context,
    })
}

/// Insert the compliance disclaimers when absent. Present values are never
/// overwritten.
fn ensure_disclaimers(pack: &mut CopyPack) {
    pack.disclaimers
        .entry(SCHOOLS_SAFETY_KEY.to_string())
        .or_insert_with(|| SCHOOLS_SAFETY_DEFAULT.to_string());
    pack.disclaimers
        .entry(POST_PRODUCTION_KEY.to_string())
        .or_insert_with(|| POST_PRODUCTION_DEFAULT.to_string());
}

/// Fixed sample pack served in offline mode; same content for every request.
pub(crate) fn offline_copy_pack() -> CopyPack {
    let mut disclaimers = BTreeMap::new();
    disclaimers.insert(
        SCHOOLS_SAFETY_KEY.to_string(),
        "School and safety references must remain factual only—use names, distances, links."
            .to_string(),
    );
    disclaimers.insert(
        POST_PRODUCTION_KEY.to_string(),
        POST_PRODUCTION_DEFAULT.to_string(),
    );

    CopyPack {
        core_listing_print: json!({
            "MLS description": "Neutral, factual description...",
            "Flyer/Brochure": {
                "headline": "Crisp Headline",
                "short narrative": "Neutral lines.",
                "bulleted specs": ["3 beds", "2 baths", "1,800 sqft"]
            },
            "Feature Sheet": {
                "Rooms": {"Kitchen": "Quartz, SS", "Living": "View window"},
                "Upgrades/Brands": ["Bosch", "Kohler"]
            }
        }),
        digital_social: json!({
            "Just Listed": ["Post A", "Post B"],
            "Open House": ["Post A", "Post B"],
            "Feature Highlights": ["Highlight 1", "Highlight 2", "Highlight 3"],
            "Under Contract/Sold": ["Wrap post"],
            "Video scripts": {
                "walkthrough_60_120s": "Script...",
                "reels_15_60s": "Short script..."
            },
            "Single-property website copy": "SPW block...",
            "Ads": ["Variant1", "Variant2", "Variant3", "Variant4", "Variant5"]
        }),
        direct_outreach: json!({
            "New Listing email blast": "Email...",
            "Inquiry response templates": {"SMS": "SMS...", "Email": "Email..."},
            "Open House follow-up email": "Follow-up..."
        }),
        cadence: json!({
            "Phase I": ["Morning 9–11a", "Lunch 12–2p", "Evening 5–8p"],
            "Phase II": ["Morning 9–11a", "Lunch 12–2p", "Evening 5–8p"]
        }),
        ops_checklists: json!({
            "Homeowner Prep": ["Declutter", "Lights on"],
            "Run of Show": ["Arrival", "Coverage"],
            "Gallery Order": ["Exteriors first"],
            "3D/Plan Placement": ["Embed in SPW"],
            "Retouch Notes": ["Non-material removals only"]
        }),
        kpis: vec![
            "CTR".to_string(),
            "Video completion".to_string(),
            "Lead replies".to_string(),
        ],
        disclaimers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::listing::decision::offline_decision;
    use crate::workflows::listing::domain::{AnswerSet, IntakeMode};
    use crate::workflows::listing::repository::{IntakeId, IntakeRecord};
    use crate::workflows::listing::signals;
    use chrono::Utc;

    fn record() -> IntakeRecord {
        let answers = AnswerSet::default();
        IntakeRecord {
            id: IntakeId("intake-000001".to_string()),
            mode: IntakeMode::DeepDive,
            signals: signals::compute(&answers),
            answers,
            decision: offline_decision(),
            created_at: Utc::now(),
        }
    }

    fn offline_copywriter() -> Copywriter {
        Copywriter::new(None)
    }

    #[test]
    fn tier_matching_is_case_insensitive() {
        let catalog = MarketingCatalog::builtin();
        let chosen = offline_copywriter()
            .generate(&catalog, &record(), "hIgH", "fluency")
            .expect("copy generates");
        assert_eq!(chosen.stack.tier, TierLabel::High);
    }

    #[test]
    fn unknown_tier_is_not_found() {
        let catalog = MarketingCatalog::builtin();
        let error = offline_copywriter()
            .generate(&catalog, &record(), "Platinum", "fluency")
            .expect_err("tier should not resolve");
        assert!(matches!(error, CopyError::TierNotFound(tier) if tier == "Platinum"));
    }

    #[test]
    fn unknown_bias_key_falls_back_to_first_plan() {
        let catalog = MarketingCatalog::builtin();
        let chosen = offline_copywriter()
            .generate(&catalog, &record(), "Medium", "nonexistent_bias")
            .expect("copy generates");
        assert_eq!(chosen.bias.key, "fluency");
    }

    #[test]
    fn disclaimers_are_inserted_when_absent() {
        let mut pack = CopyPack::default();
        ensure_disclaimers(&mut pack);
        assert_eq!(
            pack.disclaimers.get(SCHOOLS_SAFETY_KEY).map(String::as_str),
            Some(SCHOOLS_SAFETY_DEFAULT)
        );
        assert_eq!(
            pack.disclaimers.get(POST_PRODUCTION_KEY).map(String::as_str),
            Some(POST_PRODUCTION_DEFAULT)
        );
    }

    #[test]
    fn present_disclaimers_are_never_overwritten() {
        let mut pack = CopyPack::default();
        pack.disclaimers.insert(
            SCHOOLS_SAFETY_KEY.to_string(),
            "Custom factual-only wording.".to_string(),
        );
        ensure_disclaimers(&mut pack);
        assert_eq!(
            pack.disclaimers.get(SCHOOLS_SAFETY_KEY).map(String::as_str),
            Some("Custom factual-only wording.")
        );
    }

    #[test]
    fn offline_pack_is_schema_complete() {
        let catalog = MarketingCatalog::builtin();
        let chosen = offline_copywriter()
            .generate(&catalog, &record(), "Low", "anchoring")
            .expect("copy generates");
        assert!(chosen.pack.core_listing_print.is_object());
        assert!(chosen.pack.cadence.is_object());
        assert_eq!(chosen.pack.kpis.len(), 3);
        assert!(chosen.pack.disclaimers.contains_key(SCHOOLS_SAFETY_KEY));
        assert_eq!(chosen.bias.key, "anchoring");
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw questionnaire answers keyed by question name.
///
/// No schema is enforced here: unknown keys are ignored and every reader
/// supplies its own default, so signal computation and guardrails stay total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(pub Map<String, Value>);

impl AnswerSet {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String-typed answer, `None` when absent or differently typed.
    pub fn string(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Numeric answer; numeric strings are accepted, anything else is `None`.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.0.get(key) {
            Some(Value::Number(number)) => number.as_f64(),
            Some(Value::String(raw)) => raw.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Truthiness of an answer, mirroring the loose intake payloads the
    /// questionnaire frontend sends (numbers and strings count when non-empty).
    pub fn flag(&self, key: &str) -> bool {
        match self.0.get(key) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(number)) => number.as_f64().map(|n| n != 0.0).unwrap_or(false),
            Some(Value::String(raw)) => !raw.is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            Some(Value::Null) | None => false,
        }
    }

    /// Scalar answers rendered as text, in map order. Lists and nested
    /// objects are excluded; these feed the retrieval query.
    pub fn scalar_pairs(&self) -> Vec<(&str, String)> {
        self.0
            .iter()
            .filter_map(|(key, value)| match value {
                Value::String(raw) => Some((key.as_str(), raw.clone())),
                Value::Bool(flag) => Some((key.as_str(), flag.to_string())),
                Value::Number(number) => Some((key.as_str(), number.to_string())),
                _ => None,
            })
            .collect()
    }
}

/// Five bounded scores summarizing a listing's marketing needs, each in
/// [0, 1] and rounded to three decimals. Recomputed fresh on every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalVector {
    pub complexity: f64,
    pub clarity_need: f64,
    pub momentum_pressure: f64,
    pub brand_lift: f64,
    pub location_efficiency: f64,
}

/// Canonical stack tiers. Every decision carries exactly one stack per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TierLabel {
    High,
    Medium,
    Low,
}

impl TierLabel {
    pub const ALL: [TierLabel; 3] = [TierLabel::High, TierLabel::Medium, TierLabel::Low];

    pub const fn label(self) -> &'static str {
        match self {
            TierLabel::High => "High",
            TierLabel::Medium => "Medium",
            TierLabel::Low => "Low",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Some(TierLabel::High),
            "medium" => Some(TierLabel::Medium),
            "low" => Some(TierLabel::Low),
            _ => None,
        }
    }
}

/// One recommended service inside a stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceItem {
    pub service_id: String,
    pub name: String,
    pub rationale: String,
}

/// Tier-labeled bundle of services with a stack-level rationale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    pub tier: TierLabel,
    pub services: Vec<ServiceItem>,
    pub rationale: String,
}

/// Psychological framing plan attached to a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasMiniPlan {
    pub key: String,
    pub name: String,
    pub definition: String,
    pub why: String,
    #[serde(rename = "executionBullets")]
    pub execution_bullets: Vec<String>,
}

/// Validated decision payload: three stacks covering {High, Medium, Low}
/// and three bias mini-plans with 2-3 execution bullets each. Instances are
/// only produced by the decision engine's validation path (or its fixed
/// offline fixture), never deserialized straight from backend output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub stacks: Vec<Stack>,
    pub biases: Vec<BiasMiniPlan>,
}

impl Decision {
    pub fn stack_for_tier(&self, tier: TierLabel) -> Option<&Stack> {
        self.stacks.iter().find(|stack| stack.tier == tier)
    }
}

/// Intake depth requested by the caller. Lighting is the short-form
/// questionnaire; deep dive is the full one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeMode {
    Lighting,
    DeepDive,
}

impl IntakeMode {
    pub const fn label(self) -> &'static str {
        match self {
            IntakeMode::Lighting => "lighting",
            IntakeMode::DeepDive => "deep_dive",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "lighting" => Some(IntakeMode::Lighting),
            "deep_dive" | "deep-dive" => Some(IntakeMode::DeepDive),
            _ => None,
        }
    }
}

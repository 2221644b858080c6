use super::domain::{AnswerSet, SignalVector};

const DEFAULT_SIZE_SQFT: f64 = 1500.0;

/// Derive the five marketing signals from raw answers.
///
/// Total over any answer set: unrecognized or missing values fall back to the
/// mid-band defaults, so this never fails and never inspects keys it does not
/// know about.
pub fn compute(answers: &AnswerSet) -> SignalVector {
    let size_sqft = answers
        .number("interiorSizeSqft")
        .unwrap_or(DEFAULT_SIZE_SQFT);
    let condition = condition_score(answers.string("conditionBand"));
    let light = light_score(answers.string("naturalLight"));
    let timeline = timeline_score(
        answers
            .string("timelinePressure")
            .or_else(|| answers.string("priority")),
    );
    let tight = if answers.flag("tightRooms") { 1.0 } else { 0.0 };
    let luxury = if answers.string("propertyType") == Some("Luxury") {
        0.2
    } else {
        0.0
    };

    let complexity =
        0.3 * condition + 0.2 * (1.0 - light) + 0.2 * tight + 0.3 * (size_sqft / 4000.0);
    let clarity_need = 0.6 * condition + 0.4 * tight;
    let momentum_pressure = timeline;
    let brand_lift = 0.2 + size_sqft / 5000.0 + luxury;
    // Placeholder dimension: no formula has been assigned yet.
    let location_efficiency = 0.5;

    SignalVector {
        complexity: round3(clamp01(complexity)),
        clarity_need: round3(clamp01(clarity_need)),
        momentum_pressure: round3(clamp01(momentum_pressure)),
        brand_lift: round3(clamp01(brand_lift)),
        location_efficiency: round3(clamp01(location_efficiency)),
    }
}

fn condition_score(band: Option<&str>) -> f64 {
    match band {
        Some("pristine") => 0.2,
        Some("updated") => 0.4,
        Some("average") => 0.5,
        Some("dated") => 0.7,
        Some("needs_work") => 0.9,
        _ => 0.5,
    }
}

fn light_score(light: Option<&str>) -> f64 {
    match light {
        Some("excellent") => 0.2,
        Some("good") => 0.4,
        Some("mixed") => 0.6,
        Some("poor") => 0.8,
        _ => 0.5,
    }
}

fn timeline_score(timeline: Option<&str>) -> f64 {
    match timeline {
        Some("low") => 0.3,
        Some("medium") => 0.5,
        Some("high") => 0.7,
        Some("urgent") => 0.9,
        Some("speed") => 0.9,
        Some("balance") => 0.6,
        Some("maximize_price") => 0.4,
        _ => 0.5,
    }
}

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

use super::domain::{AnswerSet, ServiceItem};

pub const VIRTUAL_STAGING: &str = "virtual_staging";
pub const EXTERIOR_ONLY: &str = "exterior_only";
pub const FLOOR_PLAN_2D: &str = "2d_floor_plan";
pub const ZILLOW_3D: &str = "zillow_3d";

const FLOOR_PLAN_RATIONALE: &str = "Tight rooms benefit from schematic clarity.";
const ZILLOW_3D_RATIONALE: &str = "Remote buyers need spatial continuity.";

/// Apply the hard business rules to one stack's proposed services.
///
/// These overrides win over whatever the generative backend proposed: staging
/// and exterior-only pruning first, then the floor-plan and 3D-tour inserts,
/// each at the front of the list. The 3D-tour insert runs second, so when both
/// trigger the tour item ends up ahead of the floor plan.
pub fn enforce_rules(answers: &AnswerSet, proposed: Vec<ServiceItem>) -> Vec<ServiceItem> {
    let vacant = answers.string("occupancy") == Some("vacant");
    let staging_opt_in = answers.flag("explicitVirtualStagingOK");
    let busy_street = answers.flag("busy_street_special_case");
    let tight_rooms = answers.flag("tightRooms");
    let remote_buyer = answers.string("likelyBuyer") == Some("remote_buyer");

    let mut services: Vec<ServiceItem> = proposed
        .into_iter()
        .filter(|item| match item.service_id.as_str() {
            VIRTUAL_STAGING => vacant || staging_opt_in,
            EXTERIOR_ONLY => busy_street,
            _ => true,
        })
        .collect();

    if tight_rooms && services.iter().all(|item| item.service_id != FLOOR_PLAN_2D) {
        services.insert(
            0,
            ServiceItem {
                service_id: FLOOR_PLAN_2D.to_string(),
                name: "2D Floor Plan".to_string(),
                rationale: FLOOR_PLAN_RATIONALE.to_string(),
            },
        );
    }

    if remote_buyer && services.iter().all(|item| item.service_id != ZILLOW_3D) {
        services.insert(
            0,
            ServiceItem {
                service_id: ZILLOW_3D.to_string(),
                name: "Zillow 3D Tour".to_string(),
                rationale: ZILLOW_3D_RATIONALE.to_string(),
            },
        );
    }

    services
}

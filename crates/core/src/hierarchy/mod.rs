//! Hierarchy roll-up: reconcile parent references, aggregate leaf activity,
//! then linearize the result into waterfall order.

pub mod findings;
pub mod reconcile;
pub mod rollup;
pub mod waterfall;

pub use findings::{FindingKind, HierarchyFinding};
pub use reconcile::{reconcile, Reconciliation};
pub use rollup::{aggregate, AreaRollup, HierarchyNode, RegionRollup, RollUp, Totals, ZoneRollup};
pub use waterfall::{linearize, RowOrigin, WaterfallRow};

const VACANT: &str = "Vacant";

/// Marker written in place of a manager name that is referenced under the wrong parent.
pub fn vacancy_label(parent: &str) -> String {
    let parent = parent.trim();
    if parent.is_empty() {
        VACANT.to_string()
    } else {
        format!("{VACANT} ({parent})")
    }
}

pub fn is_vacancy_label(name: &str) -> bool {
    name == VACANT || (name.starts_with("Vacant (") && name.ends_with(')'))
}

/// `total / expected * 100` rounded half to even, or 0 when nothing is expected.
pub fn execution_percent(total_camps: f64, expected_camps: f64) -> i64 {
    if expected_camps > 0.0 {
        (total_camps / expected_camps * 100.0).round_ties_even() as i64
    } else {
        0
    }
}

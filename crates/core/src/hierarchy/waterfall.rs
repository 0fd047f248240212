use serde::{Deserialize, Serialize};

use crate::domain::employee::{Designation, EmployeeId};
use crate::domain::policy::OrgPolicy;
use crate::hierarchy::rollup::{AreaRollup, HierarchyNode, RegionRollup, RollUp, Totals, ZoneRollup};
use crate::hierarchy::{is_vacancy_label, vacancy_label};

/// Where a waterfall row came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOrigin {
    Directory,
    /// Summary row standing in for a manager slot marked vacant.
    Vacancy,
    /// Manager referenced by the hierarchy but absent from the directory.
    Placeholder,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaterfallRow {
    pub emp_id: Option<EmployeeId>,
    pub name: String,
    pub designation: Designation,
    pub state: String,
    pub city: String,
    pub hq: String,
    pub sm_name: String,
    pub rbm_name: String,
    pub abm_name: String,
    pub origin: RowOrigin,
    pub total_camps: f64,
    pub expected_camps: f64,
    pub execution_percent: i64,
}

#[derive(Clone, Copy)]
struct Path<'a> {
    sm: &'a str,
    rbm: &'a str,
    abm: &'a str,
}

impl WaterfallRow {
    fn from_node(node: &HierarchyNode, path: Path<'_>) -> Self {
        let employee = &node.employee;
        Self {
            emp_id: Some(employee.id.clone()),
            name: employee.name.clone(),
            designation: employee.designation,
            state: employee.location.state.clone(),
            city: employee.location.city.clone(),
            hq: employee.location.hq.clone(),
            sm_name: path.sm.to_string(),
            rbm_name: path.rbm.to_string(),
            abm_name: path.abm.to_string(),
            origin: RowOrigin::Directory,
            total_camps: node.total_camps,
            expected_camps: node.expected_camps,
            execution_percent: node.execution_percent,
        }
    }

    fn synthesized(name: &str, designation: Designation, totals: Totals, path: Path<'_>) -> Self {
        let origin =
            if is_vacancy_label(name) { RowOrigin::Vacancy } else { RowOrigin::Placeholder };
        Self {
            emp_id: None,
            name: name.to_string(),
            designation,
            state: String::new(),
            city: String::new(),
            hq: String::new(),
            sm_name: path.sm.to_string(),
            rbm_name: path.rbm.to_string(),
            abm_name: path.abm.to_string(),
            origin,
            total_camps: totals.total_camps,
            expected_camps: totals.expected_camps,
            execution_percent: totals.execution_percent(),
        }
    }
}

/// Flattens a roll-up into top-down display order, nesting expressed by row order.
///
/// Per zone, per region: each real area's MRs then the area manager, then
/// leftover MRs and their vacancy row, then the regional manager, and after
/// all regions the zone manager. Managers the directory lacks are
/// synthesized from their block totals unless the slot name is empty.
pub fn linearize(rollup: &RollUp, policy: &OrgPolicy) -> Vec<WaterfallRow> {
    let mut rows = Vec::new();
    for zone in &rollup.zones {
        push_zone(&mut rows, zone, policy);
    }
    rows
}

fn push_zone(rows: &mut Vec<WaterfallRow>, zone: &ZoneRollup, policy: &OrgPolicy) {
    for region in &zone.regions {
        push_region(rows, region, &zone.name, policy);
    }

    let path = Path { sm: &zone.name, rbm: "", abm: "" };
    push_heads(rows, &zone.heads, &zone.name, Designation::Sm, zone.totals, path, policy);
}

fn push_region(rows: &mut Vec<WaterfallRow>, region: &RegionRollup, sm: &str, policy: &OrgPolicy) {
    for area in &region.areas {
        push_area(rows, area, Path { sm, rbm: &region.name, abm: &area.name });
    }

    for node in &region.leftovers {
        let path = Path { sm, rbm: &region.name, abm: &node.employee.chain.abm_name };
        rows.push(WaterfallRow::from_node(node, path));
    }
    if let Some(totals) = region.vacancy {
        let label = vacancy_label(&region.name);
        let path = Path { sm, rbm: &region.name, abm: &label };
        rows.push(WaterfallRow::synthesized(&label, Designation::Abm, totals, path));
    }

    let path = Path { sm, rbm: &region.name, abm: "" };
    push_heads(rows, &region.heads, &region.name, Designation::Rbm, region.totals, path, policy);
}

fn push_area(rows: &mut Vec<WaterfallRow>, area: &AreaRollup, path: Path<'_>) {
    for node in area.members.iter().chain(&area.heads) {
        rows.push(WaterfallRow::from_node(node, path));
    }
}

fn push_heads(
    rows: &mut Vec<WaterfallRow>,
    heads: &[HierarchyNode],
    name: &str,
    level: Designation,
    totals: Totals,
    path: Path<'_>,
    policy: &OrgPolicy,
) {
    if heads.is_empty() {
        if !name.trim().is_empty() && policy.has_level(level) {
            rows.push(WaterfallRow::synthesized(name, level, totals, path));
        }
        return;
    }
    for node in heads {
        rows.push(WaterfallRow::from_node(node, path));
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::{linearize, RowOrigin};
    use crate::domain::activity::{ActivityIndex, ActivityRecord};
    use crate::domain::employee::{Designation, Employee, ReportingChain};
    use crate::domain::policy::OrgPolicy;
    use crate::hierarchy::rollup::aggregate;

    fn policy() -> OrgPolicy {
        OrgPolicy {
            key: "org".to_string(),
            org_id: "A-1".to_string(),
            display_name: "Org".to_string(),
            directory_source: "org.json".to_string(),
            prescription_key: None,
            leaf_role: Designation::Mr,
            expected_camps_per_leaf: 2.0,
            expected_camps_per_area_manager: 0.0,
            levels_present: Designation::ALL.into_iter().collect::<BTreeSet<_>>(),
        }
    }

    fn row(id: &str, name: &str, designation: Designation, chain: (&str, &str, &str)) -> Employee {
        Employee::new(id, name, designation, ReportingChain::new(chain.0, chain.1, chain.2))
    }

    fn names(rows: &[super::WaterfallRow]) -> Vec<&str> {
        rows.iter().map(|row| row.name.as_str()).collect()
    }

    #[test]
    fn emits_members_before_managers_up_to_the_zone() {
        let employees = vec![
            row("S1", "Sara", Designation::Sm, ("", "", "Sara")),
            row("R1", "Ravi", Designation::Rbm, ("", "Ravi", "Sara")),
            row("A1", "Alex", Designation::Abm, ("Alex", "Ravi", "Sara")),
            row("M1", "Mia", Designation::Mr, ("Alex", "Ravi", "Sara")),
            row("M2", "Noor", Designation::Mr, ("", "Ravi", "Sara")),
        ];
        let activity = ActivityIndex::new(&[ActivityRecord::new("M2", 1, 0)]);

        let rows = linearize(&aggregate(&employees, &activity, &policy()), &policy());

        assert_eq!(names(&rows), vec!["Mia", "Alex", "Noor", "Vacant (Ravi)", "Ravi", "Sara"]);
        assert_eq!(rows[3].origin, RowOrigin::Vacancy);
        assert_eq!(rows[3].designation, Designation::Abm);
        assert_eq!(rows[3].total_camps, 1.0);
        assert_eq!(rows[5].expected_camps, 4.0);
    }

    #[test]
    fn missing_managers_are_synthesized_from_their_blocks() {
        let employees = vec![
            row("A1", "Alex", Designation::Abm, ("Alex", "Ravi", "Sara")),
            row("M1", "Mia", Designation::Mr, ("Alex", "Ravi", "Sara")),
            row("A2", "Bina", Designation::Abm, ("Bina", "Ravi", "Sara")),
            row("M2", "Noor", Designation::Mr, ("Bina", "Ravi", "Sara")),
        ];
        let activity =
            ActivityIndex::new(&[ActivityRecord::new("M1", 3, 0), ActivityRecord::new("M2", 4, 0)]);

        let rows = linearize(&aggregate(&employees, &activity, &policy()), &policy());

        assert_eq!(names(&rows), vec!["Mia", "Alex", "Noor", "Bina", "Ravi", "Sara"]);
        let ravi = &rows[4];
        assert_eq!(ravi.origin, RowOrigin::Placeholder);
        assert_eq!(ravi.emp_id, None);
        assert_eq!(ravi.total_camps, 7.0);
        assert_eq!(rows[5].designation, Designation::Sm);
        assert_eq!(rows[5].total_camps, 7.0);
    }

    #[test]
    fn empty_chain_rows_are_emitted_without_placeholders() {
        let employees = vec![row("M1", "Mia", Designation::Mr, ("", "", ""))];
        let activity = ActivityIndex::new(&[ActivityRecord::new("M1", 2, 0)]);

        let rows = linearize(&aggregate(&employees, &activity, &policy()), &policy());

        assert_eq!(names(&rows), vec!["Mia", "Vacant"]);
        assert_eq!(rows[0].rbm_name, "");
        assert_eq!(rows[0].sm_name, "");
    }

    #[test]
    fn placeholders_skip_levels_the_organization_lacks() {
        let mut without_sm = policy();
        without_sm.levels_present.remove(&Designation::Sm);
        let employees = vec![row("M1", "Mia", Designation::Mr, ("Alex", "Ravi", "Sara"))];

        let rows = linearize(
            &aggregate(&employees, &ActivityIndex::default(), &without_sm),
            &without_sm,
        );

        assert_eq!(names(&rows), vec!["Mia", "Vacant (Ravi)", "Ravi"]);
    }
}

use std::collections::{HashMap, HashSet};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::activity::ActivityIndex;
use crate::domain::employee::{Designation, Employee, EmployeeId};
use crate::domain::policy::OrgPolicy;
use crate::hierarchy::findings::{FindingKind, HierarchyFinding};
use crate::hierarchy::{execution_percent, vacancy_label};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub total_camps: f64,
    pub expected_camps: f64,
}

impl Totals {
    pub fn new(total_camps: f64, expected_camps: f64) -> Self {
        Self { total_camps, expected_camps }
    }

    pub fn quota(expected_camps: f64) -> Self {
        Self { total_camps: 0.0, expected_camps }
    }

    pub fn execution_percent(&self) -> i64 {
        execution_percent(self.total_camps, self.expected_camps)
    }
}

impl Add for Totals {
    type Output = Totals;

    fn add(self, other: Totals) -> Totals {
        Totals::new(self.total_camps + other.total_camps, self.expected_camps + other.expected_camps)
    }
}

impl AddAssign for Totals {
    fn add_assign(&mut self, other: Totals) {
        *self = *self + other;
    }
}

impl Sum for Totals {
    fn sum<I: Iterator<Item = Totals>>(iter: I) -> Totals {
        iter.fold(Totals::default(), Add::add)
    }
}

impl<'a> Sum<&'a HierarchyNode> for Totals {
    fn sum<I: Iterator<Item = &'a HierarchyNode>>(iter: I) -> Totals {
        iter.map(HierarchyNode::totals).sum()
    }
}

/// An employee with its rolled-up camp counts.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HierarchyNode {
    pub employee: Employee,
    pub total_camps: f64,
    pub expected_camps: f64,
    pub execution_percent: i64,
}

impl HierarchyNode {
    fn new(employee: Employee, totals: Totals) -> Self {
        Self {
            employee,
            total_camps: totals.total_camps,
            expected_camps: totals.expected_camps,
            execution_percent: totals.execution_percent(),
        }
    }

    pub fn totals(&self) -> Totals {
        Totals::new(self.total_camps, self.expected_camps)
    }
}

/// Area-manager block: the MRs reporting to one area manager name.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AreaRollup {
    pub name: String,
    pub heads: Vec<HierarchyNode>,
    pub members: Vec<HierarchyNode>,
    pub totals: Totals,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RegionRollup {
    pub name: String,
    pub heads: Vec<HierarchyNode>,
    /// Blocks with a real area manager, in encounter order.
    pub areas: Vec<AreaRollup>,
    /// Rows not under any real area manager.
    pub leftovers: Vec<HierarchyNode>,
    /// Summary of the leftovers when they get a vacancy row of their own.
    pub vacancy: Option<Totals>,
    pub totals: Totals,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ZoneRollup {
    pub name: String,
    pub heads: Vec<HierarchyNode>,
    pub regions: Vec<RegionRollup>,
    pub totals: Totals,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RollUp {
    pub zones: Vec<ZoneRollup>,
    pub findings: Vec<HierarchyFinding>,
}

/// Named blocks kept in the order their names were first seen.
struct Slots<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Self { items: Vec::new(), index: HashMap::new() }
    }
}

impl<T> Slots<T> {
    fn entry(&mut self, name: &str, make: impl FnOnce() -> T) -> &mut T {
        let position = match self.index.get(name) {
            Some(position) => *position,
            None => {
                self.items.push(make());
                self.index.insert(name.to_string(), self.items.len() - 1);
                self.items.len() - 1
            }
        };
        &mut self.items[position]
    }
}

#[derive(Default)]
struct AreaDraft {
    name: String,
    heads: Vec<usize>,
    members: Vec<usize>,
}

#[derive(Default)]
struct RegionDraft {
    name: String,
    heads: Vec<usize>,
    areas: Slots<AreaDraft>,
}

#[derive(Default)]
struct ZoneDraft {
    name: String,
    heads: Vec<usize>,
    regions: Slots<RegionDraft>,
}

/// Aggregates leaf activity bottom-up over a reconciled employee table.
///
/// Each row is placed by its designation and its reconciled chain names, so
/// totals follow the reconciled grouping and never the raw directory one.
/// Leaves take their camps from `activity` with the policy's per-leaf quota.
/// Every area-manager row adds the per-area-manager quota. Managers above
/// carry the sum of everything placed beneath them.
pub fn aggregate(employees: &[Employee], activity: &ActivityIndex, policy: &OrgPolicy) -> RollUp {
    let mut zones: Slots<ZoneDraft> = Slots::default();
    for (index, row) in employees.iter().enumerate() {
        let chain = &row.chain;
        let zone = zones.entry(&chain.sm_name, || ZoneDraft {
            name: chain.sm_name.clone(),
            ..ZoneDraft::default()
        });
        if row.designation == Designation::Sm {
            zone.heads.push(index);
            continue;
        }
        let region = zone.regions.entry(&chain.rbm_name, || RegionDraft {
            name: chain.rbm_name.clone(),
            ..RegionDraft::default()
        });
        if row.designation == Designation::Rbm {
            region.heads.push(index);
            continue;
        }
        let area = region.areas.entry(&chain.abm_name, || AreaDraft {
            name: chain.abm_name.clone(),
            ..AreaDraft::default()
        });
        if row.designation == Designation::Abm {
            area.heads.push(index);
        } else {
            area.members.push(index);
        }
    }

    let mut builder = Builder { employees, activity, policy, findings: Vec::new() };
    let zones: Vec<ZoneRollup> = zones.items.into_iter().map(|zone| builder.zone(zone)).collect();

    let known: HashSet<&EmployeeId> = employees.iter().map(|row| &row.id).collect();
    let mut unmatched: Vec<&EmployeeId> = activity.ids().filter(|id| !known.contains(id)).collect();
    unmatched.sort();
    for id in unmatched {
        warn!(
            event_name = "hierarchy.rollup.unmatched_activity",
            employee_id = %id,
            "activity recorded for an employee missing from the directory"
        );
        builder.findings.push(HierarchyFinding {
            kind: FindingKind::UnmatchedActivity,
            level: None,
            name: id.0.clone(),
            parents: Vec::new(),
            rows_affected: 1,
        });
    }

    RollUp { zones, findings: builder.findings }
}

struct Builder<'a> {
    employees: &'a [Employee],
    activity: &'a ActivityIndex,
    policy: &'a OrgPolicy,
    findings: Vec<HierarchyFinding>,
}

impl Builder<'_> {
    fn zone(&mut self, draft: ZoneDraft) -> ZoneRollup {
        let regions: Vec<RegionRollup> =
            draft.regions.items.into_iter().map(|region| self.region(region)).collect();
        let totals: Totals = regions.iter().map(|region| region.totals).sum();
        let heads = self.managers(&draft.heads, Designation::Sm, &draft.name, totals);
        ZoneRollup { name: draft.name, heads, regions, totals }
    }

    fn region(&mut self, draft: RegionDraft) -> RegionRollup {
        let vacancy_name = vacancy_label(&draft.name);
        let mut genuine: Vec<AreaDraft> = Vec::new();
        let mut loose: Vec<usize> = Vec::new();
        for area in draft.areas.items {
            if area.heads.is_empty() {
                loose.extend(area.members);
            } else {
                genuine.push(area);
            }
        }

        // A real area manager already named after the region's vacancy takes the leftovers.
        let mut vacancy_area = None;
        if let Some(position) = genuine.iter().position(|area| area.name == vacancy_name) {
            let mut area = genuine.remove(position);
            area.members.append(&mut loose);
            vacancy_area = Some(area);
        }

        let mut areas: Vec<AreaRollup> = genuine.into_iter().map(|area| self.area(area)).collect();
        if let Some(area) = vacancy_area {
            areas.push(self.area(area));
        }

        let leftovers: Vec<HierarchyNode> = loose.into_iter().map(|index| self.member(index)).collect();
        let leftover_totals: Totals = leftovers.iter().sum();
        let vacancy = (!leftovers.is_empty()
            && self.policy.leaf_role == Designation::Mr
            && self.policy.has_level(Designation::Abm))
        .then(|| leftover_totals + Totals::quota(self.policy.expected_camps_per_area_manager));

        let totals =
            areas.iter().map(|area| area.totals).sum::<Totals>() + vacancy.unwrap_or(leftover_totals);
        let heads = self.managers(&draft.heads, Designation::Rbm, &draft.name, totals);
        RegionRollup { name: draft.name, heads, areas, leftovers, vacancy, totals }
    }

    fn area(&mut self, draft: AreaDraft) -> AreaRollup {
        let members: Vec<HierarchyNode> =
            draft.members.iter().map(|index| self.member(*index)).collect();

        self.note_duplicates(&draft.heads, Designation::Abm, &draft.name);
        if self.policy.is_leaf(Designation::Abm) {
            let heads: Vec<HierarchyNode> = draft
                .heads
                .iter()
                .map(|index| {
                    let employee = &self.employees[*index];
                    HierarchyNode::new(employee.clone(), self.leaf_totals(employee))
                })
                .collect();
            let totals = heads.iter().sum::<Totals>() + members.iter().sum::<Totals>();
            return AreaRollup { name: draft.name, heads, members, totals };
        }

        let quota = if self.policy.has_level(Designation::Abm) {
            Totals::quota(self.policy.expected_camps_per_area_manager)
        } else {
            Totals::default()
        };
        let rolled = members.iter().sum::<Totals>() + quota;
        let heads: Vec<HierarchyNode> = draft
            .heads
            .iter()
            .enumerate()
            .map(|(position, index)| {
                let totals = if position == 0 { rolled } else { quota };
                HierarchyNode::new(self.employees[*index].clone(), totals)
            })
            .collect();
        let totals = heads.iter().sum();
        AreaRollup { name: draft.name, heads, members, totals }
    }

    fn member(&self, index: usize) -> HierarchyNode {
        let employee = &self.employees[index];
        HierarchyNode::new(employee.clone(), self.leaf_totals(employee))
    }

    /// Own activity and quota for leaf rows; zero for anything else.
    fn leaf_totals(&self, employee: &Employee) -> Totals {
        if self.policy.is_leaf(employee.designation) {
            Totals::new(
                self.activity.camps(&employee.id) as f64,
                self.policy.expected_camps_per_leaf,
            )
        } else {
            Totals::default()
        }
    }

    /// First head carries the block totals; duplicates are emitted empty.
    fn managers(
        &mut self,
        heads: &[usize],
        level: Designation,
        name: &str,
        totals: Totals,
    ) -> Vec<HierarchyNode> {
        self.note_duplicates(heads, level, name);
        heads
            .iter()
            .enumerate()
            .map(|(position, index)| {
                let totals = if position == 0 { totals } else { Totals::default() };
                HierarchyNode::new(self.employees[*index].clone(), totals)
            })
            .collect()
    }

    fn note_duplicates(&mut self, heads: &[usize], level: Designation, name: &str) {
        if heads.len() < 2 {
            return;
        }
        warn!(
            event_name = "hierarchy.rollup.duplicate_head",
            hierarchy_level = %level,
            manager = %name,
            rows = heads.len(),
            "several directory rows occupy one manager slot"
        );
        let finding = HierarchyFinding {
            kind: FindingKind::DuplicateManagerName,
            level: Some(level),
            name: name.to_string(),
            parents: Vec::new(),
            rows_affected: heads.len(),
        };
        if !self.findings.contains(&finding) {
            self.findings.push(finding);
        }
    }
}

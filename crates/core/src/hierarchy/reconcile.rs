use std::collections::HashMap;

use tracing::{info, warn};

use crate::domain::employee::{Designation, Employee};
use crate::domain::policy::OrgPolicy;
use crate::hierarchy::findings::{FindingKind, HierarchyFinding};
use crate::hierarchy::vacancy_label;

const MAX_ROUNDS: usize = 8;

/// One child-under-parent relation checked by the reconciler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Link {
    AreaUnderRegion,
    RegionUnderZone,
}

impl Link {
    fn child(self) -> Designation {
        match self {
            Self::AreaUnderRegion => Designation::Abm,
            Self::RegionUnderZone => Designation::Rbm,
        }
    }

    fn parent(self) -> Designation {
        match self {
            Self::AreaUnderRegion => Designation::Rbm,
            Self::RegionUnderZone => Designation::Sm,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Reconciliation {
    pub employees: Vec<Employee>,
    pub findings: Vec<HierarchyFinding>,
    /// Rounds of both passes run before the table stopped changing.
    pub rounds: usize,
}

/// Relabels manager references that contradict the manager's own directory row.
///
/// Runs the area-under-region pass then the region-under-zone pass, each
/// re-reading the table the previous pass left behind. The pair repeats
/// until a round rewrites nothing, so a reconciled table is a fixed point.
pub fn reconcile(employees: &[Employee], policy: &OrgPolicy) -> Reconciliation {
    let mut rows = employees.to_vec();
    for row in &mut rows {
        fill_own_slot(row);
    }

    let links: Vec<Link> = [Link::AreaUnderRegion, Link::RegionUnderZone]
        .into_iter()
        .filter(|link| policy.has_level(link.child()) && policy.has_level(link.parent()))
        .collect();

    let mut findings = Findings::default();
    let mut rounds = 0;
    loop {
        rounds += 1;
        let rewritten: usize =
            links.iter().map(|link| run_pass(&mut rows, *link, &mut findings)).sum();
        if rewritten == 0 {
            break;
        }
        if rounds == MAX_ROUNDS {
            warn!(
                event_name = "hierarchy.reconcile.round_limit",
                org = %policy.key,
                rounds,
                "reconciliation still rewriting rows after round limit"
            );
            break;
        }
    }

    Reconciliation { employees: rows, findings: findings.into_vec(), rounds }
}

/// A manager row with an empty slot for its own level is taken to occupy it.
fn fill_own_slot(row: &mut Employee) {
    let name = row.name.clone();
    if let Some(slot) = row.chain.slot_mut(row.designation) {
        if slot.trim().is_empty() {
            *slot = name;
        }
    }
}

fn slot_value(row: &Employee, level: Designation) -> &str {
    row.chain.slot(level).unwrap_or_default()
}

fn run_pass(rows: &mut [Employee], link: Link, findings: &mut Findings) -> usize {
    let level = link.child();
    let parent_level = link.parent();

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for (index, row) in rows.iter().enumerate() {
        let child = slot_value(row, level);
        if child.is_empty() {
            continue;
        }
        groups
            .entry(child.to_string())
            .or_insert_with(|| {
                order.push(child.to_string());
                Vec::new()
            })
            .push(index);
    }

    let mut rewritten = 0;
    for child in order {
        let Some(members) = groups.get(&child) else {
            continue;
        };

        let mut parents: Vec<String> = Vec::new();
        let mut asserted: Vec<String> = Vec::new();
        let mut asserting_rows = 0;
        for &index in members {
            let row = &rows[index];
            let parent = slot_value(row, parent_level).to_string();
            if row.designation == level && row.name == child {
                asserting_rows += 1;
                if !asserted.contains(&parent) {
                    asserted.push(parent.clone());
                }
            }
            if !parents.contains(&parent) {
                parents.push(parent);
            }
        }

        if asserted.is_empty() {
            if parents.len() > 1 {
                warn!(
                    event_name = "hierarchy.reconcile.ambiguous",
                    hierarchy_level = %level,
                    manager = %child,
                    parents = parents.len(),
                    "manager has no row of its own; references left unmodified"
                );
                findings.push(HierarchyFinding {
                    kind: FindingKind::AmbiguousHierarchy,
                    level: Some(level),
                    name: child.clone(),
                    parents,
                    rows_affected: members.len(),
                });
            }
            continue;
        }

        if asserting_rows > 1 {
            warn!(
                event_name = "hierarchy.reconcile.duplicate_name",
                hierarchy_level = %level,
                manager = %child,
                rows = asserting_rows,
                "several rows assert the same manager name"
            );
            findings.push(HierarchyFinding {
                kind: FindingKind::DuplicateManagerName,
                level: Some(level),
                name: child.clone(),
                parents: asserted.clone(),
                rows_affected: asserting_rows,
            });
        }

        for parent in parents.iter().filter(|parent| !asserted.contains(parent)) {
            let label = vacancy_label(parent);
            let mut affected = 0;
            for &index in members {
                let row = &mut rows[index];
                if slot_value(row, parent_level) != parent.as_str() {
                    continue;
                }
                let renames_self = row.designation == level && row.name != label;
                let Some(slot) = row.chain.slot_mut(level) else {
                    continue;
                };
                if *slot == label && !renames_self {
                    continue;
                }
                *slot = label.clone();
                if row.designation == level {
                    row.name = label.clone();
                }
                affected += 1;
            }
            if affected == 0 {
                continue;
            }

            info!(
                event_name = "hierarchy.reconcile.vacancy",
                hierarchy_level = %level,
                manager = %child,
                referenced_parent = %parent,
                rows = affected,
                "relabelled manager reference as vacant"
            );
            findings.push(HierarchyFinding {
                kind: FindingKind::Vacancy,
                level: Some(level),
                name: child.clone(),
                parents: vec![parent.clone()],
                rows_affected: affected,
            });
            rewritten += affected;
        }
    }

    rewritten
}

/// Findings in first-seen order with repeats from later rounds dropped.
#[derive(Default)]
struct Findings {
    items: Vec<HierarchyFinding>,
}

impl Findings {
    fn push(&mut self, finding: HierarchyFinding) {
        if !self.items.contains(&finding) {
            self.items.push(finding);
        }
    }

    fn into_vec(self) -> Vec<HierarchyFinding> {
        self.items
    }
}

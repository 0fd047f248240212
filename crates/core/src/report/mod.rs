pub mod views;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::activity::{summarize, ActivityIndex, ActivityRecord, DoctorMetric};
use crate::domain::employee::{Designation, Employee};
use crate::domain::policy::OrgPolicy;
use crate::errors::{DomainError, PolicyError};
use crate::hierarchy::{aggregate, linearize, reconcile, HierarchyFinding, WaterfallRow};

pub use views::{BaseRow, BaseTable, ManagerSheet, NonLeafActivity};

/// Inclusive date range a report covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPeriod {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl ReportPeriod {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, DomainError> {
        if from > to {
            return Err(DomainError::InvalidPeriod { from: from.to_string(), to: to.to_string() });
        }
        Ok(Self { from, to })
    }

    /// First day of `today`'s month through `today`.
    pub fn month_to_date(today: NaiveDate) -> Self {
        let from = today.with_day(1).unwrap_or(today);
        Self { from, to: today }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrgReport {
    pub org_key: String,
    pub display_name: String,
    pub waterfall: Vec<WaterfallRow>,
    pub rbm_summary: Vec<WaterfallRow>,
    pub manager_sheets: Vec<ManagerSheet>,
    pub non_leaf_activity: Vec<NonLeafActivity>,
    pub findings: Vec<HierarchyFinding>,
    pub base: BaseTable,
}

impl OrgReport {
    pub fn leaf_camps(&self, leaf_role: Designation) -> f64 {
        self.waterfall
            .iter()
            .filter(|row| row.designation == leaf_role)
            .map(|row| row.total_camps)
            .sum()
    }
}

/// Runs reconcile, aggregate and linearize for one organization.
#[derive(Clone, Debug)]
pub struct ReportEngine {
    policy: OrgPolicy,
}

impl ReportEngine {
    pub fn new(policy: OrgPolicy) -> Result<Self, PolicyError> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &OrgPolicy {
        &self.policy
    }

    pub fn run(&self, employees: &[Employee], activity: &[ActivityRecord]) -> OrgReport {
        self.assemble(employees, activity, &[])
    }

    /// Same as [`ReportEngine::run`], with leaf activity folded from doctor rows
    /// and the doctor columns kept for the base table.
    pub fn run_with_metrics(&self, employees: &[Employee], metrics: &[DoctorMetric]) -> OrgReport {
        let activity = summarize(metrics);
        self.assemble(employees, &activity, metrics)
    }

    fn assemble(
        &self,
        employees: &[Employee],
        activity: &[ActivityRecord],
        metrics: &[DoctorMetric],
    ) -> OrgReport {
        let policy = &self.policy;
        let index = ActivityIndex::new(activity);

        let reconciled = reconcile(employees, policy);
        let rollup = aggregate(&reconciled.employees, &index, policy);
        let waterfall = linearize(&rollup, policy);

        let mut findings = reconciled.findings;
        for finding in rollup.findings {
            let already_reported = findings.iter().any(|existing| {
                existing.kind == finding.kind
                    && existing.level == finding.level
                    && existing.name == finding.name
            });
            if !already_reported {
                findings.push(finding);
            }
        }

        info!(
            event_name = "report.org.completed",
            org = %policy.key,
            employees = employees.len(),
            waterfall_rows = waterfall.len(),
            findings = findings.len(),
            reconcile_rounds = reconciled.rounds,
            "organization report assembled"
        );

        OrgReport {
            org_key: policy.key.clone(),
            display_name: policy.display_name.clone(),
            rbm_summary: views::rows_with_designation(&waterfall, Designation::Rbm),
            manager_sheets: views::manager_sheets(&waterfall),
            non_leaf_activity: views::non_leaf_activity(employees, &index, policy),
            base: BaseTable::build(employees, &index, metrics),
            waterfall,
            findings,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{ReportEngine, ReportPeriod};
    use crate::domain::employee::{Designation, Employee, ReportingChain};
    use crate::domain::policy::OrgPolicyDraft;
    use crate::errors::{DomainError, PolicyError};
    use crate::hierarchy::FindingKind;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn month_to_date_starts_on_the_first() {
        let period = ReportPeriod::month_to_date(date(2026, 3, 17));
        assert_eq!(period.from, date(2026, 3, 1));
        assert_eq!(period.to, date(2026, 3, 17));
    }

    #[test]
    fn reversed_period_is_rejected() {
        let error = ReportPeriod::new(date(2026, 3, 2), date(2026, 3, 1));
        assert!(matches!(error, Err(DomainError::InvalidPeriod { .. })));
    }

    #[test]
    fn engine_rejects_malformed_policy_before_processing() {
        let mut policy = OrgPolicyDraft {
            key: Some("ipca".to_string()),
            org_id: Some("A-9".to_string()),
            leaf_role: Some(Designation::Mr),
            expected_camps_per_leaf: Some(0.0),
            expected_camps_per_area_manager: Some(2.0),
            ..OrgPolicyDraft::default()
        }
        .into_policy()
        .expect("valid policy");
        policy.expected_camps_per_leaf = f64::NAN;

        let error = ReportEngine::new(policy).map(|_| ());
        assert!(matches!(
            error,
            Err(PolicyError::InvalidExpectation { field: "expected_camps_per_leaf", .. })
        ));
    }

    #[test]
    fn duplicate_manager_is_reported_once() {
        let policy = OrgPolicyDraft {
            key: Some("lupin".to_string()),
            org_id: Some("17".to_string()),
            leaf_role: Some(Designation::Mr),
            expected_camps_per_leaf: Some(2.0),
            ..OrgPolicyDraft::default()
        }
        .into_policy()
        .expect("valid policy");
        let chain = || ReportingChain::new("Alex", "R1", "S1");
        let employees = vec![
            Employee::new("A1", "Alex", Designation::Abm, chain()),
            Employee::new("A2", "Alex", Designation::Abm, chain()),
            Employee::new("M1", "Mia", Designation::Mr, chain()),
        ];

        let report = ReportEngine::new(policy).expect("engine").run(&employees, &[]);

        let duplicates: Vec<_> = report
            .findings
            .iter()
            .filter(|finding| finding.kind == FindingKind::DuplicateManagerName)
            .collect();
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].name, "Alex");
        assert_eq!(duplicates[0].level, Some(Designation::Abm));
    }
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::employee::EmployeeId;

/// Leaf activity for one employee over the reporting period.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub employee_id: EmployeeId,
    pub total_camps: u64,
    pub total_tests: u64,
}

impl ActivityRecord {
    pub fn new(employee_id: impl Into<String>, total_camps: u64, total_tests: u64) -> Self {
        Self { employee_id: EmployeeId(employee_id.into()), total_camps, total_tests }
    }
}

/// One (employee, doctor) row of the activity pivot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorMetric {
    pub employee_id: EmployeeId,
    pub doctor_name: String,
    pub doctor_id: String,
    pub doctor_camps: u64,
    pub total_tests: u64,
    pub total_rx: u64,
    pub total_strips: u64,
}

/// Folds doctor rows into one record per employee, in first-seen order.
pub fn summarize(metrics: &[DoctorMetric]) -> Vec<ActivityRecord> {
    let mut order: Vec<EmployeeId> = Vec::new();
    let mut totals: HashMap<EmployeeId, (u64, u64)> = HashMap::new();

    for metric in metrics {
        let entry = totals.entry(metric.employee_id.clone()).or_insert_with(|| {
            order.push(metric.employee_id.clone());
            (0, 0)
        });
        entry.0 += metric.doctor_camps;
        entry.1 += metric.total_tests;
    }

    order
        .into_iter()
        .map(|employee_id| {
            let (total_camps, total_tests) = totals.get(&employee_id).copied().unwrap_or_default();
            ActivityRecord { employee_id, total_camps, total_tests }
        })
        .collect()
}

/// Lookup of activity by employee id. Employees without a record read as zero.
#[derive(Clone, Debug, Default)]
pub struct ActivityIndex {
    records: HashMap<EmployeeId, ActivityRecord>,
}

impl ActivityIndex {
    pub fn new(records: &[ActivityRecord]) -> Self {
        let mut index: HashMap<EmployeeId, ActivityRecord> = HashMap::new();
        for record in records {
            index
                .entry(record.employee_id.clone())
                .and_modify(|existing| {
                    existing.total_camps += record.total_camps;
                    existing.total_tests += record.total_tests;
                })
                .or_insert_with(|| record.clone());
        }
        Self { records: index }
    }

    pub fn camps(&self, id: &EmployeeId) -> u64 {
        self.records.get(id).map(|record| record.total_camps).unwrap_or(0)
    }

    pub fn tests(&self, id: &EmployeeId) -> u64 {
        self.records.get(id).map(|record| record.total_tests).unwrap_or(0)
    }

    pub fn ids(&self) -> impl Iterator<Item = &EmployeeId> {
        self.records.keys()
    }
}

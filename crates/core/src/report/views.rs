use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::activity::{ActivityIndex, DoctorMetric};
use crate::domain::employee::{Designation, Employee, EmployeeId};
use crate::domain::policy::OrgPolicy;
use crate::hierarchy::WaterfallRow;

/// Waterfall rows of a single designation, in waterfall order.
pub fn rows_with_designation(rows: &[WaterfallRow], designation: Designation) -> Vec<WaterfallRow> {
    rows.iter().filter(|row| row.designation == designation).cloned().collect()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManagerSheet {
    pub rbm_name: String,
    pub rows: Vec<WaterfallRow>,
}

/// MR, ABM and RBM rows grouped by the regional manager they sit under.
pub fn manager_sheets(rows: &[WaterfallRow]) -> Vec<ManagerSheet> {
    let mut sheets: Vec<ManagerSheet> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for row in rows.iter().filter(|row| row.designation != Designation::Sm) {
        let position = *positions.entry(row.rbm_name.as_str()).or_insert_with(|| {
            sheets.push(ManagerSheet { rbm_name: row.rbm_name.clone(), rows: Vec::new() });
            sheets.len() - 1
        });
        sheets[position].rows.push(row.clone());
    }

    sheets
}

/// Activity logged by someone above the leaf role; reported, never rolled up.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonLeafActivity {
    pub emp_id: EmployeeId,
    pub name: String,
    pub designation: Designation,
    pub hq: String,
    pub total_tests: u64,
    pub total_camps: u64,
}

pub fn non_leaf_activity(
    employees: &[Employee],
    activity: &ActivityIndex,
    policy: &OrgPolicy,
) -> Vec<NonLeafActivity> {
    employees
        .iter()
        .filter(|employee| !policy.is_leaf(employee.designation))
        .filter_map(|employee| {
            let total_tests = activity.tests(&employee.id);
            let total_camps = activity.camps(&employee.id);
            (total_tests > 0 || total_camps > 0).then(|| NonLeafActivity {
                emp_id: employee.id.clone(),
                name: employee.name.clone(),
                designation: employee.designation,
                hq: employee.location.hq.clone(),
                total_tests,
                total_camps,
            })
        })
        .collect()
}

/// Flat per-employee table with one column group per doctor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaseTable {
    pub rows: Vec<BaseRow>,
    pub doctor_columns: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaseRow {
    pub employee: Employee,
    pub total_camps: u64,
    pub total_tests: u64,
    pub doctors: Vec<DoctorMetric>,
}

const FIXED_HEADERS: [&str; 13] = [
    "empId",
    "name",
    "designation",
    "abm_name",
    "rbm_name",
    "sm_name",
    "state",
    "city",
    "hq",
    "region_list",
    "Total Camps",
    "Total Tests",
    "Doctors",
];

impl BaseTable {
    /// Directory order is kept; doctors keep the order the activity feed returned them in.
    pub fn build(employees: &[Employee], activity: &ActivityIndex, metrics: &[DoctorMetric]) -> Self {
        let mut by_employee: HashMap<&EmployeeId, Vec<DoctorMetric>> = HashMap::new();
        for metric in metrics {
            by_employee.entry(&metric.employee_id).or_default().push(metric.clone());
        }

        let rows: Vec<BaseRow> = employees
            .iter()
            .map(|employee| BaseRow {
                employee: employee.clone(),
                total_camps: activity.camps(&employee.id),
                total_tests: activity.tests(&employee.id),
                doctors: by_employee.remove(&employee.id).unwrap_or_default(),
            })
            .collect();
        let doctor_columns = rows.iter().map(|row| row.doctors.len()).max().unwrap_or(0);

        Self { rows, doctor_columns }
    }

    pub fn headers(&self) -> Vec<String> {
        let mut headers: Vec<String> = FIXED_HEADERS.iter().map(|header| header.to_string()).collect();
        for index in 1..=self.doctor_columns {
            headers.push(format!("Doctor {index}"));
            headers.push(format!("Doctor ID {index}"));
            headers.push(format!("Doc Total Camps {index}"));
            headers.push(format!("Total Tests {index}"));
            headers.push(format!("Total Rx {index}"));
            headers.push(format!("Total Strips {index}"));
        }
        headers
    }

    pub fn records(&self) -> Vec<Vec<String>> {
        self.rows.iter().map(|row| self.record(row)).collect()
    }

    fn record(&self, row: &BaseRow) -> Vec<String> {
        let employee = &row.employee;
        let mut record = vec![
            employee.id.0.clone(),
            employee.name.clone(),
            employee.designation.to_string(),
            employee.chain.abm_name.clone(),
            employee.chain.rbm_name.clone(),
            employee.chain.sm_name.clone(),
            employee.location.state.clone(),
            employee.location.city.clone(),
            employee.location.hq.clone(),
            employee.location.region_list.clone(),
            row.total_camps.to_string(),
            row.total_tests.to_string(),
            row.doctors.len().to_string(),
        ];
        for index in 0..self.doctor_columns {
            match row.doctors.get(index) {
                Some(doctor) => record.extend([
                    doctor.doctor_name.clone(),
                    doctor.doctor_id.clone(),
                    doctor.doctor_camps.to_string(),
                    doctor.total_tests.to_string(),
                    doctor.total_rx.to_string(),
                    doctor.total_strips.to_string(),
                ]),
                None => record.extend(std::iter::repeat(String::new()).take(6)),
            }
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::{manager_sheets, non_leaf_activity, rows_with_designation, BaseTable};
    use crate::domain::activity::{ActivityIndex, ActivityRecord, DoctorMetric};
    use crate::domain::employee::{Designation, Employee, EmployeeId, ReportingChain};
    use crate::domain::policy::OrgPolicy;
    use crate::hierarchy::{RowOrigin, WaterfallRow};

    fn waterfall_row(name: &str, designation: Designation, rbm: &str) -> WaterfallRow {
        WaterfallRow {
            emp_id: None,
            name: name.to_string(),
            designation,
            state: String::new(),
            city: String::new(),
            hq: String::new(),
            sm_name: "Sara".to_string(),
            rbm_name: rbm.to_string(),
            abm_name: String::new(),
            origin: RowOrigin::Directory,
            total_camps: 0.0,
            expected_camps: 0.0,
            execution_percent: 0,
        }
    }

    fn employee(id: &str, designation: Designation) -> Employee {
        Employee::new(id, id, designation, ReportingChain::new("Alex", "Ravi", "Sara"))
    }

    #[test]
    fn manager_sheets_group_by_region_and_skip_zone_rows() {
        let rows = vec![
            waterfall_row("Mia", Designation::Mr, "Ravi"),
            waterfall_row("Ravi", Designation::Rbm, "Ravi"),
            waterfall_row("Noor", Designation::Mr, "Rita"),
            waterfall_row("Rita", Designation::Rbm, "Rita"),
            waterfall_row("Sara", Designation::Sm, ""),
        ];

        let sheets = manager_sheets(&rows);

        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].rbm_name, "Ravi");
        assert_eq!(sheets[0].rows.len(), 2);
        assert_eq!(sheets[1].rows[1].name, "Rita");
        assert_eq!(rows_with_designation(&rows, Designation::Rbm).len(), 2);
    }

    #[test]
    fn non_leaf_activity_lists_managers_with_tests_or_camps() {
        let policy = OrgPolicy {
            key: "org".to_string(),
            org_id: "A-1".to_string(),
            display_name: "Org".to_string(),
            directory_source: "org.json".to_string(),
            prescription_key: None,
            leaf_role: Designation::Mr,
            expected_camps_per_leaf: 2.0,
            expected_camps_per_area_manager: 0.0,
            levels_present: Designation::ALL.into_iter().collect::<BTreeSet<_>>(),
        };
        let employees = vec![
            employee("M1", Designation::Mr),
            employee("A1", Designation::Abm),
            employee("R1", Designation::Rbm),
        ];
        let activity = ActivityIndex::new(&[
            ActivityRecord::new("M1", 4, 20),
            ActivityRecord::new("A1", 0, 3),
        ]);

        let listed = non_leaf_activity(&employees, &activity, &policy);

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].emp_id, EmployeeId("A1".to_string()));
        assert_eq!(listed[0].total_tests, 3);
    }

    #[test]
    fn base_table_pads_doctor_columns_to_the_widest_row() {
        let employees = vec![employee("M1", Designation::Mr), employee("M2", Designation::Mr)];
        let metric = |id: &str, doctor: &str| DoctorMetric {
            employee_id: EmployeeId(id.to_string()),
            doctor_name: doctor.to_string(),
            doctor_id: format!("D-{doctor}"),
            doctor_camps: 1,
            total_tests: 5,
            total_rx: 2,
            total_strips: 1,
        };
        let metrics = vec![metric("M1", "Rao"), metric("M1", "Iyer"), metric("M2", "Shah")];
        let activity = ActivityIndex::new(&crate::domain::activity::summarize(&metrics));

        let table = BaseTable::build(&employees, &activity, &metrics);

        assert_eq!(table.doctor_columns, 2);
        assert_eq!(table.headers().len(), 13 + 12);
        let records = table.records();
        assert_eq!(records[0][10], "2");
        assert_eq!(records[0][19], "Iyer");
        assert_eq!(records[1][19], "");
        assert!(records.iter().all(|record| record.len() == 25));
    }
}

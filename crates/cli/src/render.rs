//! CSV and JSON files for one organization report.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use fieldforce_core::hierarchy::{HierarchyFinding, RowOrigin, WaterfallRow};
use fieldforce_core::report::{NonLeafActivity, OrgReport, ReportPeriod};

const WATERFALL_HEADERS: [&str; 13] = [
    "emp_id",
    "name",
    "designation",
    "state",
    "city",
    "hq",
    "sm_name",
    "rbm_name",
    "abm_name",
    "row_type",
    "total_camps",
    "expected_camps",
    "execution_percent",
];

const NON_LEAF_HEADERS: [&str; 6] =
    ["empId", "name", "designation", "hq", "overall_total_tests", "overall_total_camps"];

const FINDING_HEADERS: [&str; 6] = ["kind", "level", "name", "parents", "rows_affected", "detail"];

#[derive(Serialize)]
struct ReportDocument<'a> {
    run_id: Uuid,
    generated_at: DateTime<Utc>,
    period: ReportPeriod,
    report: &'a OrgReport,
}

/// Writes every view of `report` under `dir` and returns the files written.
pub fn write_report(
    dir: &Path,
    report: &OrgReport,
    period: ReportPeriod,
    run_id: Uuid,
) -> Result<Vec<PathBuf>> {
    let managers_dir = dir.join("managers");
    fs::create_dir_all(&managers_dir)
        .with_context(|| format!("creating {}", managers_dir.display()))?;

    let mut written = Vec::new();

    let path = dir.join("base.csv");
    write_csv(&path, report.base.headers(), report.base.records())?;
    written.push(path);

    let path = dir.join("waterfall.csv");
    write_waterfall(&path, &report.waterfall)?;
    written.push(path);

    let path = dir.join("rbm_summary.csv");
    write_waterfall(&path, &report.rbm_summary)?;
    written.push(path);

    let path = dir.join("non_leaf_activity.csv");
    write_csv(&path, NON_LEAF_HEADERS, report.non_leaf_activity.iter().map(non_leaf_record))?;
    written.push(path);

    let path = dir.join("hierarchy_exceptions.csv");
    write_csv(&path, FINDING_HEADERS, report.findings.iter().map(finding_record))?;
    written.push(path);

    let mut slugs = Vec::new();
    for sheet in &report.manager_sheets {
        let slug = unique_slug(&sheet.rbm_name, &mut slugs);
        let path = managers_dir.join(format!("{slug}.csv"));
        write_waterfall(&path, &sheet.rows)?;
        written.push(path);
    }

    let path = dir.join("report.json");
    let document = ReportDocument { run_id, generated_at: Utc::now(), period, report };
    let json = serde_json::to_string_pretty(&document).context("serializing report.json")?;
    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    written.push(path);

    Ok(written)
}

fn write_csv<H, R, I>(path: &Path, headers: H, records: R) -> Result<()>
where
    H: IntoIterator,
    H::Item: AsRef<[u8]>,
    R: IntoIterator<Item = I>,
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(headers)?;
    for record in records {
        writer.write_record(record)?;
    }
    writer.flush().with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn write_waterfall(path: &Path, rows: &[WaterfallRow]) -> Result<()> {
    write_csv(path, WATERFALL_HEADERS, rows.iter().map(waterfall_record))
}

pub fn waterfall_record(row: &WaterfallRow) -> Vec<String> {
    vec![
        row.emp_id.as_ref().map(|id| id.0.clone()).unwrap_or_default(),
        row.name.clone(),
        row.designation.to_string(),
        row.state.clone(),
        row.city.clone(),
        row.hq.clone(),
        row.sm_name.clone(),
        row.rbm_name.clone(),
        row.abm_name.clone(),
        origin_label(row.origin).to_string(),
        format_count(row.total_camps),
        format_count(row.expected_camps),
        row.execution_percent.to_string(),
    ]
}

fn origin_label(origin: RowOrigin) -> &'static str {
    match origin {
        RowOrigin::Directory => "directory",
        RowOrigin::Vacancy => "vacancy",
        RowOrigin::Placeholder => "placeholder",
    }
}

fn non_leaf_record(row: &NonLeafActivity) -> Vec<String> {
    vec![
        row.emp_id.0.clone(),
        row.name.clone(),
        row.designation.to_string(),
        row.hq.clone(),
        row.total_tests.to_string(),
        row.total_camps.to_string(),
    ]
}

fn finding_record(finding: &HierarchyFinding) -> Vec<String> {
    vec![
        finding.kind.as_str().to_string(),
        finding.level.map(|level| level.to_string()).unwrap_or_default(),
        finding.name.clone(),
        finding.parents.join("; "),
        finding.rows_affected.to_string(),
        finding.describe(),
    ]
}

/// Whole numbers print without a fraction.
fn format_count(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// File-safe name for a manager sheet, unique within one report.
pub fn unique_slug(name: &str, taken: &mut Vec<String>) -> String {
    let mut base: String = name
        .trim()
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch.to_ascii_lowercase() } else { '-' })
        .collect();
    base = base.split('-').filter(|part| !part.is_empty()).collect::<Vec<_>>().join("-");
    if base.is_empty() {
        base = "unassigned".to_string();
    }

    let mut slug = base.clone();
    let mut counter = 1;
    while taken.contains(&slug) {
        slug = format!("{base}_{counter}");
        counter += 1;
    }
    taken.push(slug.clone());
    slug
}

#[cfg(test)]
mod tests {
    use fieldforce_core::domain::employee::{Designation, EmployeeId};
    use fieldforce_core::hierarchy::{RowOrigin, WaterfallRow};

    use super::{format_count, unique_slug, waterfall_record};

    #[test]
    fn slugs_are_file_safe_and_unique() {
        let mut taken = Vec::new();
        assert_eq!(unique_slug("Vacant (R2)", &mut taken), "vacant-r2");
        assert_eq!(unique_slug("  ", &mut taken), "unassigned");
        assert_eq!(unique_slug("", &mut taken), "unassigned_1");
        assert_eq!(unique_slug("VACANT/R2", &mut taken), "vacant-r2_1");
    }

    #[test]
    fn waterfall_record_marks_synthesized_rows() {
        let row = WaterfallRow {
            emp_id: None,
            name: "Vacant (Ravi)".to_string(),
            designation: Designation::Abm,
            state: String::new(),
            city: String::new(),
            hq: String::new(),
            sm_name: "Sara".to_string(),
            rbm_name: "Ravi".to_string(),
            abm_name: "Vacant (Ravi)".to_string(),
            origin: RowOrigin::Vacancy,
            total_camps: 6.0,
            expected_camps: 4.5,
            execution_percent: 133,
        };

        let record = waterfall_record(&row);

        assert_eq!(record[0], "");
        assert_eq!(record[9], "vacancy");
        assert_eq!(record[10], "6");
        assert_eq!(record[11], "4.5");

        let directory_row = WaterfallRow { emp_id: Some(EmployeeId("E1".to_string())), ..row };
        assert_eq!(waterfall_record(&directory_row)[0], "E1");
        assert_eq!(format_count(0.0), "0");
    }
}

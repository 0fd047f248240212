use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use tracing::{info, warn};
use uuid::Uuid;

use crate::commands::CommandResult;
use crate::ReportArgs;
use fieldforce_core::config::{AppConfig, LoadOptions};
use fieldforce_core::domain::policy::OrgPolicy;
use fieldforce_core::errors::{ApplicationError, DomainError};
use fieldforce_core::report::{ReportEngine, ReportPeriod};
use fieldforce_db::connect_with_config;
use fieldforce_db::repositories::{
    directory_from_config, ActivityRepository, DirectoryRepository, SqlActivityRepository,
};

/// What one organization's run produced.
#[derive(Clone, Debug, PartialEq)]
pub struct OrgSummary {
    pub org_key: String,
    pub output_dir: PathBuf,
    pub waterfall_rows: usize,
    pub findings: usize,
    pub files_written: usize,
}

pub fn run(options: LoadOptions, args: &ReportArgs) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "report",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };
    crate::init_logging(&config.logging);

    let today = Local::now().date_naive();
    let plan = resolve_period(args.from, args.to, today)
        .and_then(|period| Ok((period, select_organizations(&config, args)?)));
    let (period, policies) = match plan {
        Ok(plan) => plan,
        Err(error) => return CommandResult::from_error("report", &error),
    };
    let output_dir = args.out.clone().unwrap_or_else(|| config.report.output_dir.clone());

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "report",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let run_id = Uuid::new_v4();
    let result = runtime.block_on(generate(&config, &policies, period, &output_dir, run_id));

    match result {
        Ok(summaries) => CommandResult::success("report", render_message(run_id, period, &summaries)),
        Err(error) => CommandResult::from_error("report", &error),
    }
}

/// Missing bounds default to the first of the month and today.
pub fn resolve_period(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<ReportPeriod, ApplicationError> {
    let to = to.unwrap_or(today);
    let from = from.unwrap_or(ReportPeriod::month_to_date(to).from);
    Ok(ReportPeriod::new(from, to)?)
}

pub fn select_organizations(
    config: &AppConfig,
    args: &ReportArgs,
) -> Result<Vec<OrgPolicy>, ApplicationError> {
    if config.organizations.is_empty() {
        return Err(ApplicationError::Configuration(
            "no [[organizations]] are configured".to_string(),
        ));
    }

    match (args.org.as_deref(), args.all) {
        (Some(_), true) => Err(DomainError::ConflictingOrgSelection.into()),
        (Some(key), false) => {
            config.organization(key).cloned().map(|policy| vec![policy]).ok_or_else(|| {
                ApplicationError::Configuration(format!("unknown organization `{key}`"))
            })
        }
        (None, _) => Ok(config.organizations.clone()),
    }
}

async fn generate(
    config: &AppConfig,
    policies: &[OrgPolicy],
    period: ReportPeriod,
    output_dir: &Path,
    run_id: Uuid,
) -> Result<Vec<OrgSummary>, ApplicationError> {
    let pool = connect_with_config(&config.database)
        .await
        .map_err(|error| ApplicationError::Persistence(error.to_string()))?;
    let activity = SqlActivityRepository::new(pool.clone());
    let directory = directory_from_config(&config.directory, &config.report.exclude_names)?;

    let mut summaries = Vec::with_capacity(policies.len());
    for policy in policies {
        let summary = report_organization(
            directory.as_ref(),
            &activity,
            policy.clone(),
            period,
            output_dir,
            run_id,
        )
        .await;
        match summary {
            Ok(summary) => summaries.push(summary),
            Err(error) => {
                warn!(
                    event_name = "report.org.failed",
                    org = %policy.key,
                    error_class = error.error_class(),
                    error = %error,
                    "organization report failed"
                );
                pool.close().await;
                return Err(error);
            }
        }
    }

    pool.close().await;
    Ok(summaries)
}

/// Loads one organization's inputs, runs the engine and writes its files
/// under `output_dir/<org key>`.
pub async fn report_organization(
    directory: &dyn DirectoryRepository,
    activity: &dyn ActivityRepository,
    policy: OrgPolicy,
    period: ReportPeriod,
    output_dir: &Path,
    run_id: Uuid,
) -> Result<OrgSummary, ApplicationError> {
    let engine = ReportEngine::new(policy)?;
    let policy = engine.policy();

    let employees = directory.load(&policy.directory_source).await?;
    let metrics = activity
        .doctor_metrics(&policy.org_id, policy.prescription_key.as_deref(), period)
        .await?;
    let report = engine.run_with_metrics(&employees, &metrics);

    let org_dir = output_dir.join(&report.org_key);
    let written = crate::render::write_report(&org_dir, &report, period, run_id)
        .map_err(|error| ApplicationError::Output(format!("{error:#}")))?;

    info!(
        event_name = "report.org.written",
        org = %report.org_key,
        run_id = %run_id,
        files = written.len(),
        output_dir = %org_dir.display(),
        "organization report written"
    );

    Ok(OrgSummary {
        org_key: report.org_key.clone(),
        output_dir: org_dir,
        waterfall_rows: report.waterfall.len(),
        findings: report.findings.len(),
        files_written: written.len(),
    })
}

fn render_message(run_id: Uuid, period: ReportPeriod, summaries: &[OrgSummary]) -> String {
    let mut lines = vec![format!(
        "run {run_id}: {} organization report(s) for {}..={}",
        summaries.len(),
        period.from,
        period.to
    )];
    for summary in summaries {
        lines.push(format!(
            "  - {}: {} waterfall rows, {} finding(s), {} file(s) in {}",
            summary.org_key,
            summary.waterfall_rows,
            summary.findings,
            summary.files_written,
            summary.output_dir.display()
        ));
    }
    lines.join("\n")
}

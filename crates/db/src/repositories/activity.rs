use sqlx::Row;
use tracing::info;

use fieldforce_core::domain::activity::DoctorMetric;
use fieldforce_core::domain::employee::EmployeeId;
use fieldforce_core::report::ReportPeriod;

use super::{ActivityRepository, RepositoryError};
use crate::DbPool;

/// Doctor pivot: distinct tests and distinct camp days per (employee, doctor),
/// with `rx|strips` prescription pairs summed per order when a key is given.
const DOCTOR_METRICS_SQL: &str = r#"
WITH test_summary AS (
    SELECT
        u.emp_id,
        u.doc_id,
        u.dr_name,
        u.o_id,
        COUNT(DISTINCT u.test_id) AS total_tests,
        COUNT(DISTINCT date(u.camp_date)) AS doctor_camps,
        MIN(u.rowid) AS first_seen
    FROM user_tests u
    WHERE u.a_id = ?1
      AND u.status_code = 200
      AND u.is_deleted = 0
      AND date(u.camp_date) BETWEEN ?2 AND ?3
    GROUP BY u.emp_id, u.doc_id, u.dr_name, u.o_id
),
rx_values AS (
    SELECT r.o_id, json_extract(r.prescriptions, '$."' || ?4 || '"') AS pair
    FROM rx r
    WHERE ?4 IS NOT NULL
      AND r.a_id = ?1
      AND r.is_deleted = 0
      AND date(r.camp_date) BETWEEN ?2 AND ?3
),
rx_summary AS (
    SELECT
        o_id,
        SUM(CASE WHEN instr(pair, '|') > 0
            THEN CAST(trim(substr(pair, 1, instr(pair, '|') - 1)) AS INTEGER) ELSE 0 END) AS total_rx,
        SUM(CASE WHEN instr(pair, '|') > 0
            THEN CAST(trim(substr(pair, instr(pair, '|') + 1)) AS INTEGER) ELSE 0 END) AS total_strips
    FROM rx_values
    WHERE pair IS NOT NULL
    GROUP BY o_id
)
SELECT
    t.emp_id,
    t.doc_id,
    t.dr_name,
    t.doctor_camps,
    t.total_tests,
    COALESCE(x.total_rx, 0) AS total_rx,
    COALESCE(x.total_strips, 0) AS total_strips
FROM test_summary t
LEFT JOIN rx_summary x ON x.o_id = t.o_id
ORDER BY t.emp_id, t.first_seen
"#;

pub struct SqlActivityRepository {
    pool: DbPool,
}

impl SqlActivityRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_count(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<u64, RepositoryError> {
    let value: i64 = row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))?;
    u64::try_from(value)
        .map_err(|_| RepositoryError::Decode(format!("negative `{column}` count: {value}")))
}

fn row_to_metric(row: &sqlx::sqlite::SqliteRow) -> Result<DoctorMetric, RepositoryError> {
    let employee_id: String =
        row.try_get("emp_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let doctor_id: String =
        row.try_get("doc_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let doctor_name: String =
        row.try_get("dr_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(DoctorMetric {
        employee_id: EmployeeId(employee_id),
        doctor_name,
        doctor_id,
        doctor_camps: decode_count(row, "doctor_camps")?,
        total_tests: decode_count(row, "total_tests")?,
        total_rx: decode_count(row, "total_rx")?,
        total_strips: decode_count(row, "total_strips")?,
    })
}

#[async_trait::async_trait]
impl ActivityRepository for SqlActivityRepository {
    async fn doctor_metrics(
        &self,
        org_id: &str,
        prescription_key: Option<&str>,
        period: ReportPeriod,
    ) -> Result<Vec<DoctorMetric>, RepositoryError> {
        let rows = sqlx::query(DOCTOR_METRICS_SQL)
            .bind(org_id)
            .bind(period.from.format("%Y-%m-%d").to_string())
            .bind(period.to.format("%Y-%m-%d").to_string())
            .bind(prescription_key)
            .fetch_all(&self.pool)
            .await?;

        let metrics = rows.iter().map(row_to_metric).collect::<Result<Vec<_>, _>>()?;
        info!(
            event_name = "db.activity.loaded",
            org_id,
            from = %period.from,
            to = %period.to,
            doctor_rows = metrics.len(),
            "doctor metrics loaded"
        );
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use fieldforce_core::domain::employee::EmployeeId;
    use fieldforce_core::report::ReportPeriod;

    use super::SqlActivityRepository;
    use crate::repositories::ActivityRepository;
    use crate::{connect_with_settings, migrations};

    const ACCOUNT: &str = "acct-lupin";

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    struct TestRow<'a> {
        test_id: &'a str,
        account: &'a str,
        emp_id: &'a str,
        doc_id: &'a str,
        dr_name: &'a str,
        order_id: &'a str,
        status_code: i64,
        is_deleted: i64,
        camp_date: &'a str,
    }

    impl<'a> TestRow<'a> {
        fn new(test_id: &'a str, emp_id: &'a str, doc_id: &'a str, camp_date: &'a str) -> Self {
            Self {
                test_id,
                account: ACCOUNT,
                emp_id,
                doc_id,
                dr_name: doc_id,
                order_id: "O-1",
                status_code: 200,
                is_deleted: 0,
                camp_date,
            }
        }
    }

    async fn insert_test(pool: &sqlx::SqlitePool, row: TestRow<'_>) {
        sqlx::query(
            "INSERT INTO user_tests (test_id, a_id, emp_id, doc_id, dr_name, o_id,
                                     status_code, is_deleted, camp_date)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(row.test_id)
        .bind(row.account)
        .bind(row.emp_id)
        .bind(row.doc_id)
        .bind(row.dr_name)
        .bind(row.order_id)
        .bind(row.status_code)
        .bind(row.is_deleted)
        .bind(row.camp_date)
        .execute(pool)
        .await
        .expect("insert user test");
    }

    async fn insert_rx(pool: &sqlx::SqlitePool, order_id: &str, camp_date: &str, json: &str) {
        sqlx::query(
            "INSERT INTO rx (a_id, o_id, camp_date, prescriptions, is_deleted)
             VALUES (?, ?, ?, ?, 0)",
        )
        .bind(ACCOUNT)
        .bind(order_id)
        .bind(camp_date)
        .bind(json)
        .execute(pool)
        .await
        .expect("insert rx");
    }

    fn march() -> ReportPeriod {
        ReportPeriod::new(
            NaiveDate::from_ymd_opt(2026, 3, 1).expect("date"),
            NaiveDate::from_ymd_opt(2026, 3, 31).expect("date"),
        )
        .expect("period")
    }

    #[tokio::test]
    async fn counts_distinct_tests_and_camp_days_per_doctor() {
        let pool = setup().await;
        insert_test(&pool, TestRow::new("T1", "E1", "D1", "2026-03-02 09:00:00")).await;
        insert_test(&pool, TestRow::new("T2", "E1", "D1", "2026-03-02 11:30:00")).await;
        insert_test(&pool, TestRow::new("T3", "E1", "D1", "2026-03-05")).await;
        insert_test(&pool, TestRow::new("T4", "E1", "D2", "2026-03-06")).await;
        insert_test(&pool, TestRow::new("T5", "E2", "D3", "2026-03-06")).await;

        let repo = SqlActivityRepository::new(pool);
        let metrics = repo.doctor_metrics(ACCOUNT, None, march()).await.expect("metrics");

        assert_eq!(metrics.len(), 3);
        assert_eq!(metrics[0].employee_id, EmployeeId("E1".to_string()));
        assert_eq!(metrics[0].doctor_id, "D1");
        assert_eq!(metrics[0].total_tests, 3);
        assert_eq!(metrics[0].doctor_camps, 2);
        assert_eq!(metrics[1].doctor_id, "D2");
        assert_eq!(metrics[2].employee_id, EmployeeId("E2".to_string()));
        assert!(metrics.iter().all(|metric| metric.total_rx == 0 && metric.total_strips == 0));
    }

    #[tokio::test]
    async fn skips_failed_deleted_foreign_and_out_of_range_tests() {
        let pool = setup().await;
        insert_test(&pool, TestRow::new("T1", "E1", "D1", "2026-03-02")).await;
        insert_test(&pool, TestRow { status_code: 500, ..TestRow::new("T2", "E1", "D1", "2026-03-03") })
            .await;
        insert_test(&pool, TestRow { is_deleted: 1, ..TestRow::new("T3", "E1", "D1", "2026-03-04") })
            .await;
        insert_test(&pool, TestRow { account: "acct-other", ..TestRow::new("T4", "E1", "D1", "2026-03-05") })
            .await;
        insert_test(&pool, TestRow::new("T5", "E1", "D1", "2026-04-01")).await;

        let repo = SqlActivityRepository::new(pool);
        let metrics = repo.doctor_metrics(ACCOUNT, None, march()).await.expect("metrics");

        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].total_tests, 1);
        assert_eq!(metrics[0].doctor_camps, 1);
    }

    #[tokio::test]
    async fn sums_prescription_pairs_under_the_configured_key() {
        let pool = setup().await;
        insert_test(&pool, TestRow::new("T1", "E1", "D1", "2026-03-02")).await;
        insert_rx(&pool, "O-1", "2026-03-02", r#"{"lupiheme": "3|2", "other": "9|9"}"#).await;
        insert_rx(&pool, "O-1", "2026-03-09", r#"{"lupiheme": "4| 1"}"#).await;
        insert_rx(&pool, "O-1", "2026-03-10", r#"{"other": "5|5"}"#).await;

        let repo = SqlActivityRepository::new(pool);
        let with_key =
            repo.doctor_metrics(ACCOUNT, Some("lupiheme"), march()).await.expect("metrics");
        let without_key = repo.doctor_metrics(ACCOUNT, None, march()).await.expect("metrics");

        assert_eq!(with_key[0].total_rx, 7);
        assert_eq!(with_key[0].total_strips, 3);
        assert_eq!(without_key[0].total_rx, 0);
        assert_eq!(without_key[0].total_strips, 0);
    }
}

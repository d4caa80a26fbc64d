use crate::dto::results_dto::ExportFormat;
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::models::account::Role;
use crate::models::test_result::{ResultListing, TestResult, STATUS_PENDING};
use crate::services::attempt_service::RESULT_COLUMNS;
use crate::services::export_service::{ExportRow, ExportService};
use crate::services::test_service::owner_filter;
use sqlx::PgPool;
use uuid::Uuid;

const REVIEWER_ROLES: &[Role] = &[Role::Admin, Role::Teacher];

const LISTING_SQL: &str = r#"
    SELECT
        r.id,
        r.student_id,
        COALESCE(NULLIF(a.full_name, ''), a.username) AS student_name,
        r.test_id,
        t.name AS test_name,
        r.score_achieved,
        r.total_score,
        r.time_taken,
        r.completion_date,
        r.status,
        r.created_at
    FROM results r
    JOIN accounts a ON a.id = r.student_id
    JOIN tests t ON t.id = r.test_id
    WHERE ($1::uuid IS NULL OR t.created_by = $1)
      AND ($2::uuid IS NULL OR r.student_id = $2)
    ORDER BY r.created_at, r.id
"#;

#[derive(Clone)]
pub struct ResultService {
    pool: PgPool,
}

impl ResultService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Administrators see every result, teachers the results of their own tests.
    pub async fn list_results(&self, identity: &Identity) -> Result<Vec<ResultListing>> {
        identity.require(REVIEWER_ROLES)?;
        self.fetch_listings(owner_filter(identity), None).await
    }

    pub async fn student_results(&self, identity: &Identity) -> Result<Vec<ResultListing>> {
        identity.require(&[Role::Student])?;
        self.fetch_listings(None, Some(identity.account_id)).await
    }

    /// Opens a fresh Pending result for the same student and test. Earlier
    /// results are left untouched; if a Pending result is already open it is
    /// returned instead of creating a second one.
    pub async fn initiate_retake(&self, identity: &Identity, result_id: Uuid) -> Result<TestResult> {
        identity.require(&[Role::Admin])?;

        let source = self.get_result(result_id).await?;

        let insert_sql = format!(
            r#"
            INSERT INTO results (student_id, test_id, status)
            VALUES ($1, $2, $3)
            ON CONFLICT (student_id, test_id) WHERE status = 'Pending' DO NOTHING
            RETURNING {}
            "#,
            RESULT_COLUMNS
        );
        let created = sqlx::query_as::<_, TestResult>(&insert_sql)
            .bind(source.student_id)
            .bind(source.test_id)
            .bind(STATUS_PENDING)
            .fetch_optional(&self.pool)
            .await?;

        let pending = match created {
            Some(pending) => {
                tracing::info!(
                    result_id = %pending.id,
                    source = %result_id,
                    student = %pending.student_id,
                    test_id = %pending.test_id,
                    "Retake initiated"
                );
                pending
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM results WHERE student_id = $1 AND test_id = $2 AND status = $3",
                    RESULT_COLUMNS
                );
                let existing = sqlx::query_as::<_, TestResult>(&sql)
                    .bind(source.student_id)
                    .bind(source.test_id)
                    .bind(STATUS_PENDING)
                    .fetch_one(&self.pool)
                    .await?;
                tracing::info!(
                    result_id = %existing.id,
                    "Retake already pending; reusing open result"
                );
                existing
            }
        };
        Ok(pending)
    }

    pub async fn delete_result(&self, identity: &Identity, result_id: Uuid) -> Result<()> {
        identity.require(&[Role::Admin])?;
        let deleted = sqlx::query("DELETE FROM results WHERE id = $1")
            .bind(result_id)
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(Error::NotFound("Result not found".into()));
        }
        tracing::info!(result_id = %result_id, by = %identity.account_id, "Result deleted");
        Ok(())
    }

    pub async fn export_results(&self, identity: &Identity, format: ExportFormat) -> Result<Vec<u8>> {
        identity.require(REVIEWER_ROLES)?;
        let listings = self.fetch_listings(owner_filter(identity), None).await?;
        let rows: Vec<ExportRow> = listings.iter().map(ExportRow::from).collect();
        tracing::info!(rows = rows.len(), ?format, "Exporting results");
        match format {
            ExportFormat::Xlsx => ExportService::results_to_xlsx(&rows),
            ExportFormat::Csv => ExportService::results_to_csv(&rows),
        }
    }

    async fn get_result(&self, result_id: Uuid) -> Result<TestResult> {
        let sql = format!("SELECT {} FROM results WHERE id = $1", RESULT_COLUMNS);
        sqlx::query_as::<_, TestResult>(&sql)
            .bind(result_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Result not found".into()))
    }

    async fn fetch_listings(
        &self,
        test_owner: Option<Uuid>,
        student: Option<Uuid>,
    ) -> Result<Vec<ResultListing>> {
        let rows = sqlx::query_as::<_, ResultListing>(LISTING_SQL)
            .bind(test_owner)
            .bind(student)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

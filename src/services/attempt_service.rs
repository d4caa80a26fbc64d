use crate::dto::attempt_dto::{AttemptSheet, PresentedQuestion, SubmitAttemptResponse};
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::models::account::Role;
use crate::models::test_result::{TestResult, STATUS_COMPLETED, STATUS_PENDING};
use crate::services::grading_service::{
    GradingService, MAX_PRESENTED_QUESTIONS, RESULT_TOTAL_SCORE,
};
use crate::services::test_service::{fetch_published_test, load_question_graph};
use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

pub(crate) const RESULT_COLUMNS: &str =
    "id, student_id, test_id, score_achieved, total_score, time_taken, completion_date, status, created_at";

/// Where a student stands on a test before a new attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptEligibility {
    FirstAttempt,
    Retake,
    AlreadyCompleted,
}

impl AttemptEligibility {
    pub fn from_counts(completed: i64, pending: i64) -> Self {
        if pending > 0 {
            AttemptEligibility::Retake
        } else if completed > 0 {
            AttemptEligibility::AlreadyCompleted
        } else {
            AttemptEligibility::FirstAttempt
        }
    }

    pub fn ensure_allowed(self) -> Result<()> {
        match self {
            AttemptEligibility::AlreadyCompleted => Err(Error::AlreadyCompleted),
            _ => Ok(()),
        }
    }
}

#[derive(Clone)]
pub struct AttemptService {
    pool: PgPool,
}

impl AttemptService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn start_attempt(&self, identity: &Identity, test_id: Uuid) -> Result<AttemptSheet> {
        identity.require(&[Role::Student])?;

        let mut conn = self.pool.acquire().await?;
        let test = fetch_published_test(&mut conn, test_id).await?;
        eligibility(&mut conn, identity.account_id, test_id)
            .await?
            .ensure_allowed()?;
        let questions = load_question_graph(&mut conn, test_id).await?;
        drop(conn);

        let presented = {
            let mut rng = rand::thread_rng();
            GradingService::select_presentation(questions, &mut rng)
        };

        tracing::info!(
            test_id = %test_id,
            student = %identity.account_id,
            presented = presented.len(),
            "Attempt started"
        );

        Ok(AttemptSheet {
            test_id: test.id,
            test_name: test.name,
            duration_minutes: test.duration_minutes,
            total_score: RESULT_TOTAL_SCORE,
            questions: presented.into_iter().map(PresentedQuestion::from).collect(),
        })
    }

    /// Scores a submission and closes the open Pending result, or records a
    /// new Completed result for a first-time taker.
    pub async fn submit_attempt(
        &self,
        identity: &Identity,
        test_id: Uuid,
        answers: &HashMap<Uuid, Uuid>,
        time_taken: i32,
    ) -> Result<SubmitAttemptResponse> {
        identity.require(&[Role::Student])?;

        let mut tx = self.pool.begin().await?;
        fetch_published_test(&mut tx, test_id).await?;
        let questions = load_question_graph(&mut tx, test_id).await?;
        let grade = GradingService::grade(&questions, answers);
        if grade.answered_beyond_presentation() {
            return Err(Error::BadRequest(format!(
                "A submission may answer at most {} questions",
                MAX_PRESENTED_QUESTIONS
            )));
        }
        let now = Utc::now();
        let time_taken = time_taken.max(0);

        let pending_sql = format!(
            "SELECT {} FROM results WHERE student_id = $1 AND test_id = $2 AND status = $3 FOR UPDATE",
            RESULT_COLUMNS
        );
        let pending = sqlx::query_as::<_, TestResult>(&pending_sql)
            .bind(identity.account_id)
            .bind(test_id)
            .bind(STATUS_PENDING)
            .fetch_optional(&mut *tx)
            .await?;

        let result_id = match pending {
            Some(pending) => {
                sqlx::query(
                    r#"
                    UPDATE results
                    SET score_achieved = $1, total_score = $2, time_taken = $3,
                        completion_date = $4, status = $5
                    WHERE id = $6
                    "#,
                )
                .bind(grade.score_achieved)
                .bind(grade.total_score)
                .bind(time_taken)
                .bind(now)
                .bind(STATUS_COMPLETED)
                .bind(pending.id)
                .execute(&mut *tx)
                .await?;
                pending.id
            }
            None => {
                eligibility(&mut tx, identity.account_id, test_id)
                    .await?
                    .ensure_allowed()?;
                sqlx::query_scalar::<_, Uuid>(
                    r#"
                    INSERT INTO results (student_id, test_id, score_achieved, total_score, time_taken, completion_date, status)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    RETURNING id
                    "#,
                )
                .bind(identity.account_id)
                .bind(test_id)
                .bind(grade.score_achieved)
                .bind(grade.total_score)
                .bind(time_taken)
                .bind(now)
                .bind(STATUS_COMPLETED)
                .fetch_one(&mut *tx)
                .await?
            }
        };
        tx.commit().await?;

        tracing::info!(
            result_id = %result_id,
            test_id = %test_id,
            student = %identity.account_id,
            score = grade.score_achieved,
            total = grade.total_score,
            "Attempt submitted"
        );

        Ok(SubmitAttemptResponse {
            result_id,
            score_achieved: grade.score_achieved,
            total_score: grade.total_score,
            message: format!(
                "Test submitted successfully! Your score: {}/{}",
                grade.score_achieved, grade.total_score
            ),
        })
    }
}

async fn eligibility(
    conn: &mut PgConnection,
    student_id: Uuid,
    test_id: Uuid,
) -> Result<AttemptEligibility> {
    let (completed, pending): (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COUNT(*) FILTER (WHERE status = 'Completed'),
            COUNT(*) FILTER (WHERE status = 'Pending')
        FROM results
        WHERE student_id = $1 AND test_id = $2
        "#,
    )
    .bind(student_id)
    .bind(test_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(AttemptEligibility::from_counts(completed, pending))
}

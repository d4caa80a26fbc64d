use crate::dto::authoring_dto::{CreateTestPayload, EditAnswerForm, EditQuestionForm, EditTestPayload};
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::models::account::Role;
use crate::models::answer::Answer;
use crate::models::question::{Question, QuestionType, QuestionWithAnswers};
use crate::models::test::{Test, TestDetail, TestStatus};
use crate::services::reconcile::{reconcile, Reconciled};
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

pub const AUTHOR_ROLES: &[Role] = &[Role::Teacher, Role::Admin];

pub(crate) const TEST_COLUMNS: &str =
    "id, name, subject_id, created_by, duration_minutes, status, created_at, updated_at";

#[derive(Clone)]
pub struct TestService {
    pool: PgPool,
}

impl TestService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_test(
        &self,
        identity: &Identity,
        payload: CreateTestPayload,
    ) -> Result<TestDetail> {
        identity.require(AUTHOR_ROLES)?;

        let mut tx = self.pool.begin().await?;
        ensure_subject_exists(&mut tx, payload.subject_id).await?;
        let test = insert_test(
            &mut tx,
            identity.account_id,
            payload.subject_id,
            payload.name.trim(),
            payload.duration_minutes,
            payload.status,
        )
        .await?;

        let mut position = 0;
        for form in &payload.questions {
            if form.text.trim().is_empty() {
                continue;
            }
            let question_id = insert_question(
                &mut tx,
                test.id,
                form.text.trim(),
                payload.default_points,
                position,
            )
            .await?;
            position += 1;

            let mut answer_position = 0;
            for (idx, text) in form.answers.iter().enumerate() {
                if text.trim().is_empty() {
                    continue;
                }
                let is_correct = form.correct_answers.contains(&idx);
                insert_answer(&mut tx, question_id, text.trim(), is_correct, answer_position)
                    .await?;
                answer_position += 1;
            }
        }
        tx.commit().await?;

        tracing::info!(
            test_id = %test.id,
            owner = %identity.account_id,
            questions = position,
            "Test created"
        );
        self.get_test(identity, test.id).await
    }

    pub async fn get_test(&self, identity: &Identity, test_id: Uuid) -> Result<TestDetail> {
        identity.require(AUTHOR_ROLES)?;
        let mut conn = self.pool.acquire().await?;
        let test = fetch_owned_test(&mut conn, test_id, owner_filter(identity), false).await?;
        let questions = load_question_graph(&mut conn, test_id).await?;
        Ok(TestDetail { test, questions })
    }

    pub async fn list_tests(&self, identity: &Identity) -> Result<Vec<Test>> {
        identity.require(AUTHOR_ROLES)?;
        let sql = format!(
            "SELECT {} FROM tests WHERE ($1::uuid IS NULL OR created_by = $1) ORDER BY created_at DESC",
            TEST_COLUMNS
        );
        let tests = sqlx::query_as::<_, Test>(&sql)
            .bind(owner_filter(identity))
            .fetch_all(&self.pool)
            .await?;
        Ok(tests)
    }

    pub async fn list_published(&self) -> Result<Vec<Test>> {
        let sql = format!(
            "SELECT {} FROM tests WHERE status = $1 ORDER BY created_at DESC",
            TEST_COLUMNS
        );
        let tests = sqlx::query_as::<_, Test>(&sql)
            .bind(TestStatus::Published.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(tests)
    }

    /// Updates the test row and reconciles its question/answer subtree by id.
    /// A blank question text removes the matched question.
    pub async fn edit_test(
        &self,
        identity: &Identity,
        test_id: Uuid,
        payload: EditTestPayload,
    ) -> Result<TestDetail> {
        identity.require(AUTHOR_ROLES)?;

        let mut tx = self.pool.begin().await?;
        let test = fetch_owned_test(&mut tx, test_id, owner_filter(identity), true).await?;

        let subject_id = match payload.subject_id {
            Some(subject_id) => {
                ensure_subject_exists(&mut tx, subject_id).await?;
                subject_id
            }
            None => test.subject_id,
        };
        let status = payload
            .status
            .map(|s| s.as_str().to_string())
            .unwrap_or_else(|| test.status.clone());

        sqlx::query(
            r#"
            UPDATE tests
            SET name = $1, duration_minutes = $2, status = $3, subject_id = $4, updated_at = NOW()
            WHERE id = $5
            "#,
        )
        .bind(payload.name.trim())
        .bind(payload.duration_minutes)
        .bind(status)
        .bind(subject_id)
        .bind(test_id)
        .execute(&mut *tx)
        .await?;

        let existing = load_question_graph(&mut tx, test_id).await?;
        let existing_ids: Vec<Uuid> = existing.iter().map(|q| q.question.id).collect();
        let by_id: HashMap<Uuid, &QuestionWithAnswers> =
            existing.iter().map(|q| (q.question.id, q)).collect();

        let plan = reconcile(
            &existing_ids,
            payload
                .questions
                .into_iter()
                .filter(|q| !q.text.trim().is_empty())
                .map(|q| (q.id, q)),
        );
        let (updated, inserted, deleted) =
            (plan.update_count(), plan.insert_count(), plan.deletes.len());

        for question_id in &plan.deletes {
            sqlx::query("DELETE FROM questions WHERE id = $1")
                .bind(question_id)
                .execute(&mut *tx)
                .await?;
        }

        for (position, entry) in plan.entries.into_iter().enumerate() {
            let position = position as i32;
            match entry {
                Reconciled::Update(question_id, form) => {
                    let Some(current) = by_id.get(&question_id) else {
                        continue;
                    };
                    let points = form.points.unwrap_or(current.question.points);
                    sqlx::query(
                        r#"
                        UPDATE questions
                        SET text = $1, points = $2, position = $3, question_type = $4
                        WHERE id = $5
                        "#,
                    )
                    .bind(form.text.trim())
                    .bind(points)
                    .bind(position)
                    .bind(QuestionType::Mcq.as_str())
                    .bind(question_id)
                    .execute(&mut *tx)
                    .await?;

                    let answer_ids: Vec<Uuid> = current.answers.iter().map(|a| a.id).collect();
                    reconcile_answers(&mut tx, question_id, &answer_ids, form.answers).await?;
                }
                Reconciled::Insert(form) => {
                    insert_question_form(&mut tx, test_id, form, payload.default_points, position)
                        .await?;
                }
            }
        }
        tx.commit().await?;

        tracing::info!(
            test_id = %test_id,
            updated,
            inserted,
            deleted,
            "Test edited"
        );
        self.get_test(identity, test_id).await
    }

    /// Hard delete; questions, answers and results go with the test.
    pub async fn delete_test(&self, identity: &Identity, test_id: Uuid, confirmed: bool) -> Result<()> {
        identity.require(AUTHOR_ROLES)?;
        if !confirmed {
            return Err(Error::BadRequest(
                "Deleting a test must be confirmed (confirm=true)".into(),
            ));
        }

        let result = sqlx::query("DELETE FROM tests WHERE id = $1 AND ($2::uuid IS NULL OR created_by = $2)")
            .bind(test_id)
            .bind(owner_filter(identity))
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Test not found".into()));
        }

        tracing::info!(test_id = %test_id, by = %identity.account_id, "Test deleted");
        Ok(())
    }
}

/// Teachers only see their own tests; administrators see all of them.
pub(crate) fn owner_filter(identity: &Identity) -> Option<Uuid> {
    if identity.is_admin() {
        None
    } else {
        Some(identity.account_id)
    }
}

pub(crate) async fn ensure_subject_exists(conn: &mut PgConnection, subject_id: Uuid) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM subjects WHERE id = $1)")
        .bind(subject_id)
        .fetch_one(&mut *conn)
        .await?;
    if exists {
        Ok(())
    } else {
        Err(Error::SubjectNotFound)
    }
}

pub(crate) async fn insert_test(
    conn: &mut PgConnection,
    owner: Uuid,
    subject_id: Uuid,
    name: &str,
    duration_minutes: i32,
    status: TestStatus,
) -> Result<Test> {
    let sql = format!(
        r#"
        INSERT INTO tests (name, subject_id, created_by, duration_minutes, status)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {}
        "#,
        TEST_COLUMNS
    );
    let test = sqlx::query_as::<_, Test>(&sql)
        .bind(name)
        .bind(subject_id)
        .bind(owner)
        .bind(duration_minutes)
        .bind(status.as_str())
        .fetch_one(&mut *conn)
        .await?;
    Ok(test)
}

pub(crate) async fn fetch_owned_test(
    conn: &mut PgConnection,
    test_id: Uuid,
    owner: Option<Uuid>,
    for_update: bool,
) -> Result<Test> {
    let sql = format!(
        "SELECT {} FROM tests WHERE id = $1 AND ($2::uuid IS NULL OR created_by = $2){}",
        TEST_COLUMNS,
        if for_update { " FOR UPDATE" } else { "" }
    );
    sqlx::query_as::<_, Test>(&sql)
        .bind(test_id)
        .bind(owner)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound("Test not found".into()))
}

pub(crate) async fn fetch_published_test(conn: &mut PgConnection, test_id: Uuid) -> Result<Test> {
    let sql = format!("SELECT {} FROM tests WHERE id = $1 AND status = $2", TEST_COLUMNS);
    sqlx::query_as::<_, Test>(&sql)
        .bind(test_id)
        .bind(TestStatus::Published.as_str())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound("Test does not exist or is not available".into()))
}

/// Questions in position order, each with its answers in position order.
pub(crate) async fn load_question_graph(
    conn: &mut PgConnection,
    test_id: Uuid,
) -> Result<Vec<QuestionWithAnswers>> {
    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, test_id, text, question_type, points, position, created_at
        FROM questions
        WHERE test_id = $1
        ORDER BY position, created_at
        "#,
    )
    .bind(test_id)
    .fetch_all(&mut *conn)
    .await?;

    let question_ids: Vec<Uuid> = questions.iter().map(|q| q.id).collect();
    let answers = sqlx::query_as::<_, Answer>(
        r#"
        SELECT id, question_id, text, is_correct, position, created_at
        FROM answers
        WHERE question_id = ANY($1)
        ORDER BY position, created_at
        "#,
    )
    .bind(&question_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<Answer>> = HashMap::new();
    for answer in answers {
        grouped.entry(answer.question_id).or_default().push(answer);
    }

    Ok(questions
        .into_iter()
        .map(|question| {
            let answers = grouped.remove(&question.id).unwrap_or_default();
            QuestionWithAnswers { question, answers }
        })
        .collect())
}

pub(crate) async fn insert_question(
    conn: &mut PgConnection,
    test_id: Uuid,
    text: &str,
    points: i32,
    position: i32,
) -> Result<Uuid> {
    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO questions (test_id, text, question_type, points, position)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(test_id)
    .bind(text)
    .bind(QuestionType::Mcq.as_str())
    .bind(points)
    .bind(position)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

pub(crate) async fn insert_answer(
    conn: &mut PgConnection,
    question_id: Uuid,
    text: &str,
    is_correct: bool,
    position: i32,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO answers (question_id, text, is_correct, position) VALUES ($1, $2, $3, $4)",
    )
    .bind(question_id)
    .bind(text)
    .bind(is_correct)
    .bind(position)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_question_form(
    conn: &mut PgConnection,
    test_id: Uuid,
    form: EditQuestionForm,
    default_points: i32,
    position: i32,
) -> Result<()> {
    let question_id = insert_question(
        conn,
        test_id,
        form.text.trim(),
        form.points.unwrap_or(default_points),
        position,
    )
    .await?;
    let answers = form.answers.into_iter().filter(|a| !a.text.trim().is_empty());
    for (position, answer) in answers.enumerate() {
        insert_answer(conn, question_id, answer.text.trim(), answer.is_correct, position as i32)
            .await?;
    }
    Ok(())
}

/// Same id-based reconcile as questions, one level down. Blank answer texts
/// are dropped, which deletes a matched existing answer.
async fn reconcile_answers(
    conn: &mut PgConnection,
    question_id: Uuid,
    existing: &[Uuid],
    submitted: Vec<EditAnswerForm>,
) -> Result<()> {
    let plan = reconcile(
        existing,
        submitted
            .into_iter()
            .filter(|a| !a.text.trim().is_empty())
            .map(|a| (a.id, a)),
    );

    for answer_id in &plan.deletes {
        sqlx::query("DELETE FROM answers WHERE id = $1")
            .bind(answer_id)
            .execute(&mut *conn)
            .await?;
    }

    for (position, entry) in plan.entries.into_iter().enumerate() {
        let position = position as i32;
        match entry {
            Reconciled::Update(answer_id, form) => {
                sqlx::query(
                    "UPDATE answers SET text = $1, is_correct = $2, position = $3 WHERE id = $4",
                )
                .bind(form.text.trim())
                .bind(form.is_correct)
                .bind(position)
                .bind(answer_id)
                .execute(&mut *conn)
                .await?;
            }
            Reconciled::Insert(form) => {
                insert_answer(conn, question_id, form.text.trim(), form.is_correct, position)
                    .await?;
            }
        }
    }
    Ok(())
}

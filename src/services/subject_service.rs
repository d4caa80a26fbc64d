use crate::dto::authoring_dto::CreateSubjectPayload;
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::models::subject::Subject;
use crate::services::test_service::{owner_filter, AUTHOR_ROLES};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct SubjectService {
    pool: PgPool,
}

impl SubjectService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_subject(
        &self,
        identity: &Identity,
        payload: CreateSubjectPayload,
    ) -> Result<Subject> {
        identity.require(AUTHOR_ROLES)?;
        let subject = sqlx::query_as::<_, Subject>(
            r#"
            INSERT INTO subjects (name, description, created_by)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, created_by, created_at
            "#,
        )
        .bind(payload.name.trim())
        .bind(payload.description.trim())
        .bind(identity.account_id)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(subject_id = %subject.id, owner = %identity.account_id, "Subject created");
        Ok(subject)
    }

    pub async fn list_subjects(&self, identity: &Identity) -> Result<Vec<Subject>> {
        identity.require(AUTHOR_ROLES)?;
        let subjects = sqlx::query_as::<_, Subject>(
            r#"
            SELECT id, name, description, created_by, created_at
            FROM subjects
            WHERE ($1::uuid IS NULL OR created_by = $1)
            ORDER BY name
            "#,
        )
        .bind(owner_filter(identity))
        .fetch_all(&self.pool)
        .await?;
        Ok(subjects)
    }

    /// Tests in the subject are deleted with it.
    pub async fn delete_subject(&self, identity: &Identity, subject_id: Uuid) -> Result<()> {
        identity.require(AUTHOR_ROLES)?;
        let deleted = sqlx::query(
            "DELETE FROM subjects WHERE id = $1 AND ($2::uuid IS NULL OR created_by = $2)",
        )
        .bind(subject_id)
        .bind(owner_filter(identity))
        .execute(&self.pool)
        .await?;
        if deleted.rows_affected() == 0 {
            return Err(Error::SubjectNotFound);
        }
        tracing::info!(subject_id = %subject_id, by = %identity.account_id, "Subject deleted");
        Ok(())
    }
}

use crate::dto::dashboard_dto::{AdminDashboard, Dashboard, StudentDashboard, TeacherDashboard};
use crate::error::Result;
use crate::identity::Identity;
use crate::models::account::Role;
use crate::services::result_service::ResultService;
use crate::services::subject_service::SubjectService;
use crate::services::test_service::TestService;
use sqlx::PgPool;

#[derive(Clone)]
pub struct DashboardService {
    pool: PgPool,
    tests: TestService,
    subjects: SubjectService,
    results: ResultService,
}

impl DashboardService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            tests: TestService::new(pool.clone()),
            subjects: SubjectService::new(pool.clone()),
            results: ResultService::new(pool.clone()),
            pool,
        }
    }

    /// Picks the dashboard matching the caller's role.
    pub async fn for_identity(&self, identity: &Identity) -> Result<Dashboard> {
        let dashboard = match identity.role {
            Role::Admin => Dashboard::Admin(self.admin(identity).await?),
            Role::Teacher => Dashboard::Teacher(self.teacher(identity).await?),
            Role::Student => Dashboard::Student(self.student(identity).await?),
        };
        Ok(dashboard)
    }

    pub async fn admin(&self, identity: &Identity) -> Result<AdminDashboard> {
        identity.require(&[Role::Admin])?;
        let (total_users, total_tests, total_subjects, total_results): (i64, i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM accounts),
                    (SELECT COUNT(*) FROM tests),
                    (SELECT COUNT(*) FROM subjects),
                    (SELECT COUNT(*) FROM results)
                "#,
            )
            .fetch_one(&self.pool)
            .await?;

        Ok(AdminDashboard {
            total_users,
            total_tests,
            total_subjects,
            total_results,
        })
    }

    pub async fn teacher(&self, identity: &Identity) -> Result<TeacherDashboard> {
        identity.require(&[Role::Teacher])?;
        Ok(TeacherDashboard {
            tests: self.tests.list_tests(identity).await?,
            subjects: self.subjects.list_subjects(identity).await?,
        })
    }

    pub async fn student(&self, identity: &Identity) -> Result<StudentDashboard> {
        identity.require(&[Role::Student])?;
        Ok(StudentDashboard {
            available_tests: self.tests.list_published().await?,
            results: self.results.student_results(identity).await?,
        })
    }
}

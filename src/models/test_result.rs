use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const STATUS_PENDING: &str = "Pending";
pub const STATUS_COMPLETED: &str = "Completed";

/// One attempt cycle of a student on a test. Pending rows are opened by an
/// administrator's retake and closed (Completed) by the next submission.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestResult {
    pub id: Uuid,
    pub student_id: Uuid,
    pub test_id: Uuid,
    pub score_achieved: Option<i32>,
    pub total_score: Option<i32>,
    pub time_taken: Option<i32>,
    pub completion_date: Option<DateTime<Utc>>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TestResult {
    pub fn is_pending(&self) -> bool {
        self.status == STATUS_PENDING
    }
}

/// Result row joined with the student and test names, as listed and exported.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResultListing {
    pub id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
    pub test_id: Uuid,
    pub test_name: String,
    pub score_achieved: Option<i32>,
    pub total_score: Option<i32>,
    pub time_taken: Option<i32>,
    pub completion_date: Option<DateTime<Utc>>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

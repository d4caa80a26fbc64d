use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::test::TestStatus;

fn default_points() -> i32 {
    1
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSubjectPayload {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// One question as submitted by the authoring form. `correct_answers` holds
/// indices into `answers`, counted before blank answers are dropped.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuestionForm {
    pub text: String,
    #[serde(default)]
    pub answers: Vec<String>,
    #[serde(default)]
    pub correct_answers: Vec<usize>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTestPayload {
    pub subject_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(range(min = 1, message = "Duration must be at least 1 minute"))]
    pub duration_minutes: i32,
    #[serde(default)]
    pub status: TestStatus,
    #[serde(default = "default_points")]
    #[validate(range(min = 0))]
    pub default_points: i32,
    #[serde(default)]
    pub questions: Vec<CreateQuestionForm>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditAnswerForm {
    pub id: Option<Uuid>,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditQuestionForm {
    pub id: Option<Uuid>,
    pub text: String,
    pub points: Option<i32>,
    #[serde(default)]
    pub answers: Vec<EditAnswerForm>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EditTestPayload {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(range(min = 1, message = "Duration must be at least 1 minute"))]
    pub duration_minutes: i32,
    pub status: Option<TestStatus>,
    pub subject_id: Option<Uuid>,
    #[serde(default = "default_points")]
    #[validate(range(min = 0))]
    pub default_points: i32,
    #[serde(default)]
    pub questions: Vec<EditQuestionForm>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfirmQuery {
    #[serde(default)]
    pub confirm: bool,
}

/// Form fields that accompany an uploaded test spreadsheet.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ImportTestForm {
    pub subject_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(range(min = 1))]
    pub duration_minutes: i32,
    #[validate(range(min = 0))]
    pub default_points: i32,
    #[serde(default)]
    pub status: TestStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportTestSummary {
    pub test_id: Uuid,
    pub questions_imported: usize,
    pub answers_imported: usize,
    pub warnings: Vec<String>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::question::QuestionWithAnswers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TestStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Draft => "Draft",
            TestStatus::Published => "Published",
            TestStatus::Archived => "Archived",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestStatus {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(TestStatus::Draft),
            "Published" => Ok(TestStatus::Published),
            "Archived" => Ok(TestStatus::Archived),
            other => Err(crate::error::Error::BadRequest(format!(
                "Unknown test status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Test {
    pub id: Uuid,
    pub name: String,
    pub subject_id: Uuid,
    pub created_by: Uuid,
    pub duration_minutes: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A test together with its full question/answer graph, correctness included.
#[derive(Debug, Clone, Serialize)]
pub struct TestDetail {
    #[serde(flatten)]
    pub test: Test,
    pub questions: Vec<QuestionWithAnswers>,
}

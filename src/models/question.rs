use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::answer::Answer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QuestionType {
    #[default]
    #[serde(rename = "MCQ")]
    Mcq,
    TrueFalse,
    Essay,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Mcq => "MCQ",
            QuestionType::TrueFalse => "TrueFalse",
            QuestionType::Essay => "Essay",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: Uuid,
    pub test_id: Uuid,
    pub text: String,
    pub question_type: String,
    pub points: i32,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionWithAnswers {
    #[serde(flatten)]
    pub question: Question,
    pub answers: Vec<Answer>,
}

impl QuestionWithAnswers {
    pub fn answer(&self, answer_id: Uuid) -> Option<&Answer> {
        self.answers.iter().find(|a| a.id == answer_id)
    }
}

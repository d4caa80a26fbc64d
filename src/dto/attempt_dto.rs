use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use crate::models::question::QuestionWithAnswers;

/// Answer option as shown to a student; correctness is withheld.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentedAnswer {
    pub id: Uuid,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentedQuestion {
    pub id: Uuid,
    pub text: String,
    pub question_type: String,
    pub points: i32,
    pub answers: Vec<PresentedAnswer>,
}

impl From<QuestionWithAnswers> for PresentedQuestion {
    fn from(q: QuestionWithAnswers) -> Self {
        Self {
            id: q.question.id,
            text: q.question.text,
            question_type: q.question.question_type,
            points: q.question.points,
            answers: q
                .answers
                .into_iter()
                .map(|a| PresentedAnswer {
                    id: a.id,
                    text: a.text,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptSheet {
    pub test_id: Uuid,
    pub test_name: String,
    pub duration_minutes: i32,
    pub total_score: i32,
    pub questions: Vec<PresentedQuestion>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitAttemptRequest {
    /// Selected answer id keyed by question id.
    #[serde(default)]
    pub answers: HashMap<Uuid, Uuid>,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub time_taken: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAttemptResponse {
    pub result_id: Uuid,
    pub score_achieved: i32,
    pub total_score: i32,
    pub message: String,
}

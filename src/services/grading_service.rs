use crate::models::question::QuestionWithAnswers;
use rand::seq::{index, SliceRandom};
use rand::Rng;
use std::collections::HashMap;
use uuid::Uuid;

/// Larger tests are sampled down to this many questions per attempt.
pub const MAX_PRESENTED_QUESTIONS: usize = 25;

/// Every result is recorded out of this flat total, whatever was presented.
pub const RESULT_TOTAL_SCORE: i32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grade {
    pub score_achieved: i32,
    pub total_score: i32,
    pub correct_answers: usize,
    pub answered: usize,
}

impl Grade {
    /// No single attempt presents more than `MAX_PRESENTED_QUESTIONS`, so a
    /// submission answering more of the test's questions was not built from one.
    pub fn answered_beyond_presentation(&self) -> bool {
        self.answered > MAX_PRESENTED_QUESTIONS
    }
}

pub struct GradingService;

impl GradingService {
    /// Uniform sample without replacement when the test is larger than
    /// `MAX_PRESENTED_QUESTIONS`, then shuffled into presentation order.
    pub fn select_presentation<R>(
        questions: Vec<QuestionWithAnswers>,
        rng: &mut R,
    ) -> Vec<QuestionWithAnswers>
    where
        R: Rng + ?Sized,
    {
        let mut selected = if questions.len() > MAX_PRESENTED_QUESTIONS {
            let picked = index::sample(rng, questions.len(), MAX_PRESENTED_QUESTIONS);
            let mut slots: Vec<Option<QuestionWithAnswers>> =
                questions.into_iter().map(Some).collect();
            picked
                .into_iter()
                .filter_map(|i| slots[i].take())
                .collect()
        } else {
            questions
        };
        selected.shuffle(rng);
        selected
    }

    /// Credits a question's points when the submitted answer belongs to that
    /// question and is marked correct. Missing or foreign answer ids score zero.
    ///
    /// Grading runs over every question of the test because the presented
    /// sample is not stored; callers reject grades where
    /// `answered_beyond_presentation` holds.
    pub fn grade(questions: &[QuestionWithAnswers], submitted: &HashMap<Uuid, Uuid>) -> Grade {
        let mut score_achieved = 0;
        let mut correct_answers = 0;
        let mut answered = 0;

        for q in questions {
            let Some(answer_id) = submitted.get(&q.question.id) else {
                continue;
            };
            answered += 1;
            match q.answer(*answer_id) {
                Some(answer) if answer.is_correct => {
                    score_achieved += q.question.points;
                    correct_answers += 1;
                }
                Some(_) => {}
                None => {
                    tracing::debug!(
                        question_id = %q.question.id,
                        answer_id = %answer_id,
                        "Submitted answer does not belong to question"
                    );
                }
            }
        }

        Grade {
            score_achieved,
            total_score: RESULT_TOTAL_SCORE,
            correct_answers,
            answered,
        }
    }
}

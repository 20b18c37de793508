//! Answer grading and derived reward values.
//!
//! Grading compares the string form of the submitted answer with the string
//! form of the correct answer: exact, case-sensitive, no normalization.

use serde::{Deserialize, Serialize};

use crate::model::{AnswerSet, GradedAnswer, TestDefinition};

/// Rating points per percentage point of score.
pub const RATING_PER_PERCENT: u32 = 2;

/// Rating points per star.
pub const RATING_PER_STAR: u32 = 100;

/// Highest star count reachable (a score of 100 is a rating of 200).
pub const MAX_STARS: u32 = 2;

/// Outcome of grading an answer set against a test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub score: u32,
    pub rating: u32,
    pub stars: u32,
    pub passed: bool,
    pub earned_points: u64,
    pub total_points: u64,
    pub graded: Vec<GradedAnswer>,
}

impl Score {
    /// A score of zero that still lists every question, marking each one
    /// incorrect while keeping whatever was answered.
    pub fn zeroed(test: &TestDefinition, answers: &AnswerSet) -> Self {
        let graded = test
            .questions
            .iter()
            .map(|q| GradedAnswer {
                question_id: q.id.clone(),
                answer: answers.get(&q.id).map(|a| a.to_string()).unwrap_or_default(),
                correct: false,
            })
            .collect();

        Self {
            score: 0,
            rating: 0,
            stars: 0,
            passed: passes(0, test.passing_score_percent),
            earned_points: 0,
            total_points: test.total_points(),
            graded,
        }
    }
}

/// Grade every question against the full answer set.
pub fn score_answers(test: &TestDefinition, answers: &AnswerSet) -> Score {
    grade(test, answers, test.questions.len())
}

/// Grade only the questions up to and including `last_index`. Later
/// questions still count toward the total but never earn points.
pub fn score_through(test: &TestDefinition, answers: &AnswerSet, last_index: usize) -> Score {
    grade(test, answers, last_index.saturating_add(1))
}

fn grade(test: &TestDefinition, answers: &AnswerSet, considered: usize) -> Score {
    let mut earned_points = 0u64;
    let mut total_points = 0u64;

    let graded = test
        .questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let answer = if index < considered {
                answers.get(&question.id).map(|a| a.to_string())
            } else {
                None
            };
            let correct = answer.as_deref() == Some(question.correct_answer.as_str());

            total_points += u64::from(question.points);
            if correct {
                earned_points += u64::from(question.points);
            }

            GradedAnswer {
                question_id: question.id.clone(),
                answer: answer.unwrap_or_default(),
                correct,
            }
        })
        .collect();

    let score = percentage(earned_points, total_points);
    let rating = rating_for(score);

    Score {
        score,
        rating,
        stars: stars_for(rating),
        passed: passes(score, test.passing_score_percent),
        earned_points,
        total_points,
        graded,
    }
}

/// `round(earned / total * 100)` with halves rounded up; zero when nothing
/// is at stake.
pub fn percentage(earned: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    let earned = u128::from(earned.min(total));
    let total = u128::from(total);
    ((earned * 200 + total) / (total * 2)) as u32
}

pub fn rating_for(score: u32) -> u32 {
    score.min(100) * RATING_PER_PERCENT
}

pub fn stars_for(rating: u32) -> u32 {
    (rating / RATING_PER_STAR).min(MAX_STARS)
}

pub fn passes(score: u32, passing_score_percent: u32) -> bool {
    score >= passing_score_percent
}

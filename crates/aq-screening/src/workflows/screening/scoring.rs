use super::domain::{Answer, ScoreBand, ScoringRule, ScreeningError, QUESTION_COUNT};
use super::instrument::Aq10Instrument;
use super::responses::ResponseStore;
use serde::Serialize;

/// Stateless scorer applying each question's rule to a complete response set.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    instrument: Aq10Instrument,
}

impl ScoringEngine {
    pub fn new(instrument: Aq10Instrument) -> Self {
        Self { instrument }
    }

    pub fn score(&self, responses: &ResponseStore) -> Result<ScoreResult, ScreeningError> {
        if !responses.is_complete() {
            return Err(ScreeningError::IncompleteResponses {
                missing: responses.unanswered(),
            });
        }

        let mut components = Vec::with_capacity(QUESTION_COUNT);
        let mut raw_score: u8 = 0;

        for question in self.instrument.questions() {
            let answer = responses
                .answer(question.index)?
                .ok_or(ScreeningError::IncompleteResponses {
                    missing: vec![question.index],
                })?;
            let points = question.rule.points_for(answer);
            raw_score += points;
            components.push(ScoreComponent {
                question: question.index,
                rule: question.rule,
                answer,
                points,
            });
        }

        Ok(ScoreResult {
            raw_score,
            band: ScoreBand::from_score(raw_score),
            components,
        })
    }
}

/// Per-question contribution, kept for audit output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreComponent {
    pub question: usize,
    pub rule: ScoringRule,
    pub answer: Answer,
    pub points: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreResult {
    pub raw_score: u8,
    pub band: ScoreBand,
    pub components: Vec<ScoreComponent>,
}

impl ScoreResult {
    /// Binary A1..A10 feature vector in question order.
    pub fn feature_vector(&self) -> [u8; QUESTION_COUNT] {
        let mut features = [0; QUESTION_COUNT];
        for component in &self.components {
            features[component.question - 1] = component.points;
        }
        features
    }
}

use super::domain::{Answer, ScreeningError, QUESTION_COUNT};
use serde::Serialize;
use std::collections::BTreeMap;

/// Wire form of the responses: `q1..q10` mapped to an answer token or `""`.
pub type ResponseSnapshot = BTreeMap<String, String>;

/// One answer slot per question; slots are never added or removed, only overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResponseStore {
    answers: [Option<Answer>; QUESTION_COUNT],
}

impl ResponseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `answer` for the 1-based `index`, replacing any previous answer.
    pub fn set_answer(&mut self, index: usize, answer: Answer) -> Result<(), ScreeningError> {
        self.answers[slot_for(index)?] = Some(answer);
        Ok(())
    }

    pub fn answer(&self, index: usize) -> Result<Option<Answer>, ScreeningError> {
        Ok(self.answers[slot_for(index)?])
    }

    pub fn is_complete(&self) -> bool {
        self.answers.iter().all(Option::is_some)
    }

    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn unanswered(&self) -> Vec<usize> {
        self.answers
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(offset, _)| offset + 1)
            .collect()
    }

    pub fn reset(&mut self) {
        self.answers = [None; QUESTION_COUNT];
    }

    /// Iterates `(index, answer)` pairs in question order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Option<Answer>)> + '_ {
        self.answers
            .iter()
            .enumerate()
            .map(|(offset, answer)| (offset + 1, *answer))
    }

    pub fn snapshot(&self) -> ResponseSnapshot {
        self.iter()
            .map(|(index, answer)| {
                (
                    format!("q{index}"),
                    answer.map(Answer::token).unwrap_or_default().to_string(),
                )
            })
            .collect()
    }
}

fn slot_for(index: usize) -> Result<usize, ScreeningError> {
    if (1..=QUESTION_COUNT).contains(&index) {
        Ok(index - 1)
    } else {
        Err(ScreeningError::InvalidIndex(index))
    }
}

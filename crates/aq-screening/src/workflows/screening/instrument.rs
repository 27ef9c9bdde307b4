use super::domain::{Question, ScoringRule, ScreeningError, QUESTION_COUNT};

/// The fixed AQ-10 question set, ordered by presentation.
#[derive(Debug, Clone)]
pub struct Aq10Instrument {
    questions: Vec<Question>,
}

impl Aq10Instrument {
    pub fn standard() -> Self {
        Self {
            questions: standard_questions(),
        }
    }

    pub fn question(&self, index: usize) -> Result<&Question, ScreeningError> {
        if !(1..=QUESTION_COUNT).contains(&index) {
            return Err(ScreeningError::InvalidIndex(index));
        }
        Ok(&self.questions[index - 1])
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[cfg(test)]
    pub(crate) fn questions_with_rule(&self, rule: ScoringRule) -> Vec<&Question> {
        self.questions
            .iter()
            .filter(|question| question.rule == rule)
            .collect()
    }
}

impl Default for Aq10Instrument {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_questions() -> Vec<Question> {
    use ScoringRule::{AgreeScores, DisagreeScores};

    [
        ("I often notice small sounds when others do not", AgreeScores),
        (
            "I usually concentrate more on the whole picture, rather than the small details",
            DisagreeScores,
        ),
        ("I find it easy to do more than one thing at once", DisagreeScores),
        (
            "If there is an interruption, I can switch back to what I was doing very quickly",
            DisagreeScores,
        ),
        (
            "I find it easy to 'read between the lines' when someone is talking to me",
            DisagreeScores,
        ),
        (
            "I know how to tell if someone listening to me is getting bored",
            DisagreeScores,
        ),
        (
            "When I'm reading a story I find it difficult to work out the characters' intentions",
            AgreeScores,
        ),
        (
            "I like to collect information about categories of things",
            AgreeScores,
        ),
        (
            "I find it easy to work out what someone is thinking or feeling just by looking at their face",
            DisagreeScores,
        ),
        ("I find it difficult to work out people's intentions", AgreeScores),
    ]
    .into_iter()
    .enumerate()
    .map(|(offset, (text, rule))| Question {
        index: offset + 1,
        text,
        rule,
    })
    .collect()
}

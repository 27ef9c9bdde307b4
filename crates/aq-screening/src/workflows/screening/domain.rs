use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of items in the AQ-10 instrument.
pub const QUESTION_COUNT: usize = 10;

/// Raw scores at or above this value fall in the elevated band.
pub const ELEVATED_THRESHOLD: u8 = 6;

/// The four-point agreement scale shared by every question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Answer {
    DefinitelyAgree,
    SlightlyAgree,
    SlightlyDisagree,
    DefinitelyDisagree,
}

impl Answer {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::DefinitelyAgree,
            Self::SlightlyAgree,
            Self::SlightlyDisagree,
            Self::DefinitelyDisagree,
        ]
    }

    /// Wire token used by the classifier payload and the HTTP API.
    pub const fn token(self) -> &'static str {
        match self {
            Self::DefinitelyAgree => "definitely-agree",
            Self::SlightlyAgree => "slightly-agree",
            Self::SlightlyDisagree => "slightly-disagree",
            Self::DefinitelyDisagree => "definitely-disagree",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::DefinitelyAgree => "Definitely Agree",
            Self::SlightlyAgree => "Slightly Agree",
            Self::SlightlyDisagree => "Slightly Disagree",
            Self::DefinitelyDisagree => "Definitely Disagree",
        }
    }

    pub const fn is_agree(self) -> bool {
        matches!(self, Self::DefinitelyAgree | Self::SlightlyAgree)
    }

    pub const fn is_disagree(self) -> bool {
        !self.is_agree()
    }

    /// Forgiving parse for typed input: case, surrounding whitespace, `_` and spaces are
    /// accepted in place of the kebab-case token.
    pub fn parse_loose(raw: &str) -> Result<Self, ScreeningError> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        Self::from_token(&normalized)
            .ok_or_else(|| ScreeningError::InvalidAnswer(raw.to_string()))
    }

    fn from_token(token: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|answer| answer.token() == token)
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Answer {
    type Err = ScreeningError;

    /// Exact wire tokens only.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::from_token(raw).ok_or_else(|| ScreeningError::InvalidAnswer(raw.to_string()))
    }
}

/// Direction in which a question awards its point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringRule {
    AgreeScores,
    DisagreeScores,
}

impl ScoringRule {
    pub const fn points_for(self, answer: Answer) -> u8 {
        let scores = match self {
            Self::AgreeScores => answer.is_agree(),
            Self::DisagreeScores => answer.is_disagree(),
        };
        if scores {
            1
        } else {
            0
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::AgreeScores => "agree scores",
            Self::DisagreeScores => "disagree scores",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    pub index: usize,
    pub text: &'static str,
    pub rule: ScoringRule,
}

/// Qualitative interpretation of the raw score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreBand {
    Low,
    Elevated,
}

impl ScoreBand {
    pub const fn from_score(raw_score: u8) -> Self {
        if raw_score >= ELEVATED_THRESHOLD {
            Self::Elevated
        } else {
            Self::Low
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low likelihood",
            Self::Elevated => "High likelihood",
        }
    }
}

/// Failures raised by the questionnaire core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScreeningError {
    #[error("question index {0} is outside 1..=10")]
    InvalidIndex(usize),
    #[error("'{0}' is not a recognized answer")]
    InvalidAnswer(String),
    #[error("question {question} must be answered before advancing")]
    NotReady { question: usize },
    #[error("screening already reached results; restart to begin again")]
    AlreadyComplete,
    #[error("responses incomplete; unanswered questions: {missing:?}")]
    IncompleteResponses { missing: Vec<usize> },
}

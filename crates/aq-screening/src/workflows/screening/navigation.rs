use super::domain::{ScreeningError, QUESTION_COUNT};
use super::responses::ResponseStore;
use serde::Serialize;

/// Position in the questionnaire: a 1-based question screen or the terminal results screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "screen", content = "question", rename_all = "snake_case")]
pub enum NavigationState {
    Question(usize),
    Results,
}

impl NavigationState {
    pub const fn question_index(self) -> Option<usize> {
        match self {
            Self::Question(index) => Some(index),
            Self::Results => None,
        }
    }

    pub const fn is_results(self) -> bool {
        matches!(self, Self::Results)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
    pub percent: u8,
}

impl Progress {
    pub fn label(&self) -> String {
        format!("Question {} of {}", self.current, self.total)
    }
}

/// Forward-only state machine over the question screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationController {
    state: NavigationState,
}

impl NavigationController {
    pub fn new() -> Self {
        Self {
            state: NavigationState::Question(1),
        }
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    /// Moves past the current question if it has an answer; otherwise leaves the state untouched.
    pub fn advance(&mut self, responses: &ResponseStore) -> Result<NavigationState, ScreeningError> {
        let index = match self.state {
            NavigationState::Question(index) => index,
            NavigationState::Results => return Err(ScreeningError::AlreadyComplete),
        };

        if responses.answer(index)?.is_none() {
            return Err(ScreeningError::NotReady { question: index });
        }

        self.state = if index < QUESTION_COUNT {
            NavigationState::Question(index + 1)
        } else {
            NavigationState::Results
        };
        Ok(self.state)
    }

    pub fn restart(&mut self) {
        self.state = NavigationState::Question(1);
    }

    pub fn progress(&self) -> Progress {
        let (current, completed) = match self.state {
            NavigationState::Question(index) => (index, index - 1),
            NavigationState::Results => (QUESTION_COUNT, QUESTION_COUNT),
        };
        Progress {
            current,
            total: QUESTION_COUNT,
            percent: (completed * 100 / QUESTION_COUNT) as u8,
        }
    }
}

impl Default for NavigationController {
    fn default() -> Self {
        Self::new()
    }
}

use super::domain::{Answer, ScreeningError};
use super::navigation::{NavigationController, NavigationState, Progress};
use super::responses::ResponseStore;
use super::scoring::{ScoreResult, ScoringEngine};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

impl SessionId {
    pub fn next() -> Self {
        let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!("scr-{id:06}"))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies the session incarnation an async result was issued for.
///
/// A restart bumps the generation, so classifier or notification results that resolve
/// afterwards no longer match and are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTicket {
    pub session_id: SessionId,
    pub generation: u64,
}

/// One respondent's pass through the questionnaire.
#[derive(Debug, Clone)]
pub struct ScreeningSession {
    id: SessionId,
    generation: u64,
    responses: ResponseStore,
    navigation: NavigationController,
}

impl ScreeningSession {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            generation: 0,
            responses: ResponseStore::new(),
            navigation: NavigationController::new(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ticket(&self) -> SessionTicket {
        SessionTicket {
            session_id: self.id.clone(),
            generation: self.generation,
        }
    }

    pub fn accepts(&self, ticket: &SessionTicket) -> bool {
        ticket.session_id == self.id && ticket.generation == self.generation
    }

    pub fn state(&self) -> NavigationState {
        self.navigation.state()
    }

    pub fn progress(&self) -> Progress {
        self.navigation.progress()
    }

    pub fn responses(&self) -> &ResponseStore {
        &self.responses
    }

    /// Answer currently recorded for the question on screen.
    pub fn selected_answer(&self) -> Option<Answer> {
        self.state()
            .question_index()
            .and_then(|index| self.responses.answer(index).ok().flatten())
    }

    /// Records an answer for the question on screen.
    pub fn answer(&mut self, answer: Answer) -> Result<(), ScreeningError> {
        match self.navigation.state() {
            NavigationState::Question(index) => self.responses.set_answer(index, answer),
            NavigationState::Results => Err(ScreeningError::AlreadyComplete),
        }
    }

    pub fn advance(&mut self) -> Result<NavigationState, ScreeningError> {
        self.navigation.advance(&self.responses)
    }

    pub fn restart(&mut self) {
        self.responses.reset();
        self.navigation.restart();
        self.generation += 1;
    }

    pub fn score(&self, engine: &ScoringEngine) -> Result<ScoreResult, ScreeningError> {
        engine.score(&self.responses)
    }
}

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::classifier::ClassifierAugmentation;
use super::notification::NotificationStatus;
use super::session::{ScreeningSession, SessionId, SessionTicket};

/// Async overlays attached to a session once it reaches results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsOverlay {
    pub augmentation: ClassifierAugmentation,
    pub notification: NotificationStatus,
}

impl ResultsOverlay {
    pub fn pending() -> Self {
        Self {
            augmentation: ClassifierAugmentation::Pending,
            notification: NotificationStatus::Pending,
        }
    }
}

/// Repository record: the session plus whatever results have resolved for it.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub session: ScreeningSession,
    pub results: Option<ResultsOverlay>,
    pub last_touched: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(session: ScreeningSession) -> Self {
        Self {
            session,
            results: None,
            last_touched: Utc::now(),
        }
    }

    /// Marks respondent activity; background result writes do not count.
    pub fn touch(&mut self) {
        self.last_touched = Utc::now();
    }

    /// Applies `update` to the overlay only if `ticket` still names this incarnation.
    pub fn apply_if_current<F>(&mut self, ticket: &SessionTicket, update: F) -> bool
    where
        F: FnOnce(&mut ResultsOverlay),
    {
        if !self.session.accepts(ticket) {
            return false;
        }
        match self.results.as_mut() {
            Some(overlay) => {
                update(overlay);
                true
            }
            None => false,
        }
    }
}

/// Storage abstraction so the service module can be exercised in isolation.
///
/// `with_record` runs the closure under the repository's lock, so a read-modify-write on
/// one session is atomic with respect to other callers.
pub trait SessionRepository: Send + Sync {
    fn insert(&self, record: SessionRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError>;
    fn with_record<T>(
        &self,
        id: &SessionId,
        operation: impl FnOnce(&mut SessionRecord) -> T,
    ) -> Result<T, RepositoryError>;
    /// Drops records idle since before `idle_before`, then the least recently touched
    /// until at most `keep` remain. Returns how many were removed.
    fn evict(&self, idle_before: DateTime<Utc>, keep: usize) -> Result<usize, RepositoryError>;
}

/// Shared eviction policy for map-backed repositories.
pub fn evict_stale(
    records: &mut HashMap<SessionId, SessionRecord>,
    idle_before: DateTime<Utc>,
    keep: usize,
) -> usize {
    let before = records.len();
    records.retain(|_, record| record.last_touched >= idle_before);

    if records.len() > keep {
        let mut by_age: Vec<(DateTime<Utc>, SessionId)> = records
            .iter()
            .map(|(id, record)| (record.last_touched, id.clone()))
            .collect();
        by_age.sort_by_key(|(touched, _)| *touched);
        let excess = records.len() - keep;
        for (_, id) in by_age.into_iter().take(excess) {
            records.remove(&id);
        }
    }

    before - records.len()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("session already exists")]
    Conflict,
    #[error("session not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

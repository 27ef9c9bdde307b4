use aq_screening::config::{AppConfig, ConfigError, NotificationStrategy};
use aq_screening::error::AppError;
use aq_screening::workflows::screening::{
    evict_stale, ClassifierGateway, HttpClassifier, RepositoryError, SessionId, SessionRecord,
    SessionRepository,
};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::cli::IntegrationArgs;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local session store; one lock covers every session's responses and navigation.
/// Growth is bounded by the eviction the service runs on every start.
#[derive(Default, Clone)]
pub(crate) struct InMemorySessionRepository {
    records: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
}

impl InMemorySessionRepository {
    fn lock(&self) -> Result<MutexGuard<'_, HashMap<SessionId, SessionRecord>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("session store lock poisoned".to_string()))
    }
}

impl SessionRepository for InMemorySessionRepository {
    fn insert(&self, record: SessionRecord) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        let id = record.session.id().clone();
        if guard.contains_key(&id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(id, record);
        Ok(())
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.get(id).cloned())
    }

    fn with_record<T>(
        &self,
        id: &SessionId,
        operation: impl FnOnce(&mut SessionRecord) -> T,
    ) -> Result<T, RepositoryError> {
        let mut guard = self.lock()?;
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        Ok(operation(record))
    }

    fn evict(&self, idle_before: DateTime<Utc>, keep: usize) -> Result<usize, RepositoryError> {
        let mut guard = self.lock()?;
        Ok(evict_stale(&mut guard, idle_before, keep))
    }
}

/// Applies command-line overrides for the classifier and notification channel.
pub(crate) fn apply_integration_overrides(
    config: &mut AppConfig,
    args: &IntegrationArgs,
) -> Result<(), ConfigError> {
    if let Some(url) = &args.classifier_url {
        let trimmed = url.trim();
        config.classifier.base_url = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }
    if args.no_classifier {
        config.classifier.base_url = None;
    }
    if let Some(strategy) = &args.notify {
        config.notification.strategy = NotificationStrategy::parse(strategy)?;
        config.notification.validate()?;
    }
    Ok(())
}

pub(crate) fn build_classifier(
    config: &AppConfig,
) -> Result<Option<Arc<dyn ClassifierGateway>>, AppError> {
    let classifier = HttpClassifier::from_config(&config.classifier)?;
    Ok(classifier.map(|client| Arc::new(client) as Arc<dyn ClassifierGateway>))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aq_screening::workflows::screening::{ScreeningSession, SessionId};
    use chrono::Duration;

    #[test]
    fn repository_rejects_duplicate_sessions() {
        let repository = InMemorySessionRepository::default();
        let session = ScreeningSession::new(SessionId("scr-dup".to_string()));
        repository
            .insert(SessionRecord::new(session.clone()))
            .expect("first insert");
        assert_eq!(
            repository.insert(SessionRecord::new(session)),
            Err(RepositoryError::Conflict)
        );
    }

    #[test]
    fn with_record_reports_missing_sessions() {
        let repository = InMemorySessionRepository::default();
        let outcome = repository.with_record(&SessionId("scr-none".to_string()), |_| ());
        assert_eq!(outcome, Err(RepositoryError::NotFound));
    }

    #[test]
    fn evict_drops_idle_sessions_and_enforces_capacity() {
        let repository = InMemorySessionRepository::default();
        let now = Utc::now();
        for (id, minutes_ago) in [("scr-stale", 120), ("scr-older", 20), ("scr-recent", 2)] {
            let mut record = SessionRecord::new(ScreeningSession::new(SessionId(id.to_string())));
            record.last_touched = now - Duration::minutes(minutes_ago);
            repository.insert(record).expect("insert");
        }

        let removed = repository
            .evict(now - Duration::minutes(60), 1)
            .expect("evict succeeds");

        assert_eq!(removed, 2);
        assert!(repository
            .fetch(&SessionId("scr-recent".to_string()))
            .expect("fetch")
            .is_some());
        assert!(repository
            .fetch(&SessionId("scr-older".to_string()))
            .expect("fetch")
            .is_none());
    }
}

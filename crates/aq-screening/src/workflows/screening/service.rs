use std::sync::Arc;

use chrono::{DateTime, Local, TimeDelta, Utc};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::classifier::{self, ClassifierAugmentation, ClassifierGateway};
use super::domain::{Answer, ScreeningError, QUESTION_COUNT};
use super::instrument::Aq10Instrument;
use super::navigation::{NavigationState, Progress};
use super::notification::{self, NotificationSink, NotificationStatus, ResultNotification};
use super::report::{ResultComposer, ScreeningReport};
use super::repository::{RepositoryError, ResultsOverlay, SessionRecord, SessionRepository};
use super::responses::ResponseSnapshot;
use super::scoring::{ScoreComponent, ScoringEngine};
use super::session::{ScreeningSession, SessionId, SessionTicket};
use crate::config::{NotificationConfig, SessionStoreConfig};

/// Service composing the session store, scoring engine, classifier, and notification sink.
pub struct ScreeningService<R> {
    instrument: Arc<Aq10Instrument>,
    engine: Arc<ScoringEngine>,
    repository: Arc<R>,
    classifier: Option<Arc<dyn ClassifierGateway>>,
    notifier: Arc<dyn NotificationSink>,
    notification: Arc<NotificationConfig>,
    sessions: SessionStoreConfig,
}

/// Background work spawned when a session reaches results.
pub struct ResultsTasks {
    pub classifier: Option<JoinHandle<()>>,
    pub notification: JoinHandle<()>,
}

impl ResultsTasks {
    pub async fn join(self) {
        if let Some(handle) = self.classifier {
            log_join_failure("classifier", handle.await);
        }
        log_join_failure("notification", self.notification.await);
    }
}

impl<R> ScreeningService<R>
where
    R: SessionRepository + 'static,
{
    pub fn new(
        repository: Arc<R>,
        classifier: Option<Arc<dyn ClassifierGateway>>,
        notifier: Arc<dyn NotificationSink>,
        notification: NotificationConfig,
    ) -> Self {
        let instrument = Arc::new(Aq10Instrument::standard());
        let engine = Arc::new(ScoringEngine::new(instrument.as_ref().clone()));
        Self {
            instrument,
            engine,
            repository,
            classifier,
            notifier,
            notification: Arc::new(notification),
            sessions: SessionStoreConfig::default(),
        }
    }

    pub fn with_session_limits(mut self, sessions: SessionStoreConfig) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn instrument(&self) -> &Aq10Instrument {
        &self.instrument
    }

    pub fn classifier_enabled(&self) -> bool {
        self.classifier.is_some()
    }

    /// Open a new session positioned on the first question, evicting idle sessions first.
    pub fn start(&self) -> Result<SessionView, ScreeningServiceError> {
        let evicted = self
            .repository
            .evict(self.idle_cutoff(Utc::now()), self.sessions.capacity.saturating_sub(1))?;
        if evicted > 0 {
            info!(evicted, "evicted idle screening sessions");
        }

        let session = ScreeningSession::new(SessionId::next());
        let view = self.view_of(&session);
        self.repository.insert(SessionRecord::new(session))?;
        info!(session_id = %view.session_id, "screening session started");
        Ok(view)
    }

    pub fn view(&self, id: &SessionId) -> Result<SessionView, ScreeningServiceError> {
        let record = self.repository.fetch(id)?.ok_or(RepositoryError::NotFound)?;
        Ok(self.view_of(&record.session))
    }

    /// Record an answer for the question currently on screen.
    pub fn answer(
        &self,
        id: &SessionId,
        answer: Answer,
    ) -> Result<SessionView, ScreeningServiceError> {
        self.repository.with_record(id, |record| {
            record.session.answer(answer)?;
            record.touch();
            Ok::<_, ScreeningServiceError>(self.view_of(&record.session))
        })?
    }

    /// Advance past the current question, kicking off results work on the last one.
    pub fn advance(&self, id: &SessionId) -> Result<SessionView, ScreeningServiceError> {
        self.advance_tracked(id).map(|(view, _)| view)
    }

    pub fn advance_tracked(
        &self,
        id: &SessionId,
    ) -> Result<(SessionView, Option<ResultsTasks>), ScreeningServiceError> {
        let (view, completion) = self.repository.with_record(id, |record| {
            let state = record.session.advance()?;
            record.touch();
            let view = self.view_of(&record.session);
            if !state.is_results() {
                return Ok((view, None));
            }

            let score = record.session.score(&self.engine)?;
            let mut overlay = ResultsOverlay::pending();
            if self.classifier.is_none() {
                overlay.augmentation = ClassifierAugmentation::Unavailable;
            }
            let report = ResultComposer::compose(&score, &overlay.augmentation);
            record.results = Some(overlay);

            let notification = ResultNotification::compose(
                &self.notification,
                &report,
                &self.instrument,
                record.session.responses(),
                Local::now(),
            );
            let completion = Completion {
                ticket: record.session.ticket(),
                snapshot: record.session.responses().snapshot(),
                notification,
            };
            Ok::<_, ScreeningServiceError>((view, Some(completion)))
        })??;

        let Some(completion) = completion else {
            return Ok((view, None));
        };
        match Handle::try_current() {
            Ok(runtime) => Ok((view, Some(self.spawn_results_tasks(&runtime, completion)))),
            Err(_) => {
                self.resolve_without_runtime(completion);
                Ok((view, None))
            }
        }
    }

    /// Clear every answer and return to question one; pending async results are discarded.
    pub fn restart(&self, id: &SessionId) -> Result<SessionView, ScreeningServiceError> {
        self.repository.with_record(id, |record| {
            record.session.restart();
            record.results = None;
            record.touch();
            info!(
                session_id = %record.session.id(),
                generation = record.session.generation(),
                "screening session restarted"
            );
            self.view_of(&record.session)
        })
        .map_err(ScreeningServiceError::from)
    }

    /// Compose the results view; the score is recomputed on every call.
    pub fn report(&self, id: &SessionId) -> Result<ResultsView, ScreeningServiceError> {
        let record = self.repository.fetch(id)?.ok_or(RepositoryError::NotFound)?;
        let overlay = match (&record.results, record.session.state()) {
            (Some(overlay), NavigationState::Results) => overlay.clone(),
            _ => return Err(ScreeningServiceError::ResultsNotReady),
        };

        let score = record.session.score(&self.engine)?;
        let report = ResultComposer::compose(&score, &overlay.augmentation);
        Ok(ResultsView {
            session_id: record.session.id().clone(),
            report,
            feature_vector: score.feature_vector(),
            components: score.components,
            notification: overlay.notification,
        })
    }

    fn idle_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        TimeDelta::from_std(self.sessions.idle_ttl)
            .ok()
            .and_then(|ttl| now.checked_sub_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Without a runtime the external work cannot run; settle the overlay so the
    /// session shows the score-only report and the copy-paste fallback.
    fn resolve_without_runtime(&self, completion: Completion) {
        let Completion {
            ticket,
            notification: message,
            ..
        } = completion;
        warn!(
            session_id = %ticket.session_id,
            "no async runtime; classifier and notification skipped"
        );
        let status = NotificationStatus::Failed {
            reason: NO_RUNTIME_REASON.to_string(),
            fallback_text: message.plain_text(),
        };
        store_overlay(self.repository.as_ref(), &ticket, "inline", |overlay| {
            overlay.augmentation = ClassifierAugmentation::Unavailable;
            overlay.notification = status;
        });
    }

    fn spawn_results_tasks(&self, runtime: &Handle, completion: Completion) -> ResultsTasks {
        let Completion {
            ticket,
            snapshot,
            notification: message,
        } = completion;

        let classifier = self.classifier.clone().map(|gateway| {
            let repository = Arc::clone(&self.repository);
            let ticket = ticket.clone();
            runtime.spawn(async move {
                let augmentation = classifier::augment(gateway.as_ref(), &snapshot).await;
                store_overlay(repository.as_ref(), &ticket, "classifier", |overlay| {
                    overlay.augmentation = augmentation;
                });
            })
        });

        let notifier = Arc::clone(&self.notifier);
        let repository = Arc::clone(&self.repository);
        let notification = runtime.spawn(async move {
            let status = notification::dispatch(notifier.as_ref(), &message).await;
            store_overlay(repository.as_ref(), &ticket, "notification", |overlay| {
                overlay.notification = status;
            });
        });

        ResultsTasks {
            classifier,
            notification,
        }
    }

    fn view_of(&self, session: &ScreeningSession) -> SessionView {
        let state = session.state();
        let question = state
            .question_index()
            .and_then(|index| self.instrument.question(index).ok())
            .map(|question| QuestionView {
                index: question.index,
                text: question.text,
            });
        SessionView {
            session_id: session.id().clone(),
            generation: session.generation(),
            state,
            progress: session.progress(),
            question,
            selected_answer: session.selected_answer(),
            answered: session.responses().answered_count(),
        }
    }
}

const NO_RUNTIME_REASON: &str = "no async runtime available to deliver the notification";

fn log_join_failure(source: &'static str, outcome: Result<(), tokio::task::JoinError>) {
    if let Err(err) = outcome {
        warn!(source, error = %err, "results task did not complete");
    }
}

struct Completion {
    ticket: SessionTicket,
    snapshot: ResponseSnapshot,
    notification: ResultNotification,
}

fn store_overlay<R, F>(repository: &R, ticket: &SessionTicket, source: &'static str, update: F)
where
    R: SessionRepository,
    F: FnOnce(&mut ResultsOverlay),
{
    match repository.with_record(&ticket.session_id, |record| {
        record.apply_if_current(ticket, update)
    }) {
        Ok(true) => debug!(session_id = %ticket.session_id, source, "results overlay updated"),
        Ok(false) => debug!(
            session_id = %ticket.session_id,
            generation = ticket.generation,
            source,
            "discarding result for a restarted session"
        ),
        Err(err) => debug!(session_id = %ticket.session_id, source, error = %err, "session gone before result arrived"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub index: usize,
    pub text: &'static str,
}

/// Sanitized representation of a session for API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub generation: u64,
    pub state: NavigationState,
    pub progress: Progress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionView>,
    pub selected_answer: Option<Answer>,
    pub answered: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsView {
    pub session_id: SessionId,
    pub report: ScreeningReport,
    pub feature_vector: [u8; QUESTION_COUNT],
    pub components: Vec<ScoreComponent>,
    pub notification: NotificationStatus,
}

/// Error raised by the screening service.
#[derive(Debug, thiserror::Error)]
pub enum ScreeningServiceError {
    #[error(transparent)]
    Screening(#[from] ScreeningError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("results are only available once every question has been answered")]
    ResultsNotReady,
}

//! AQ-10 questionnaire: response capture, navigation, scoring, and results delivery.
//!
//! The synchronous core (`responses`, `navigation`, `scoring`, `report`) is pure and
//! session-scoped. The classifier and notification sink are the only external seams and
//! both degrade to a score-only result when they fail.

pub mod classifier;
pub mod domain;
pub mod instrument;
pub mod navigation;
pub mod notification;
pub mod report;
pub mod repository;
pub mod responses;
pub mod router;
pub mod scoring;
pub mod service;
pub mod session;

#[cfg(test)]
mod tests;

pub use classifier::{
    ClassifierAugmentation, ClassifierGateway, ClassifierResult, ClassifierUnavailable,
    HttpClassifier, ModelHealth, PredictedLabel,
};
pub use domain::{Answer, Question, ScoreBand, ScoringRule, ScreeningError, QUESTION_COUNT};
pub use instrument::Aq10Instrument;
pub use navigation::{NavigationController, NavigationState, Progress};
pub use notification::{
    build_sink, DeliveryReceipt, DisabledSink, EmailJsSink, MailDraft, MailDraftSink,
    NotificationError, NotificationSink, NotificationStatus, ResultNotification,
};
pub use report::{ModelSection, ResultComposer, ScreeningReport};
pub use repository::{
    evict_stale, RepositoryError, ResultsOverlay, SessionRecord, SessionRepository,
};
pub use responses::{ResponseSnapshot, ResponseStore};
pub use router::screening_router;
pub use scoring::{ScoreComponent, ScoreResult, ScoringEngine};
pub use service::{
    QuestionView, ResultsTasks, ResultsView, ScreeningService, ScreeningServiceError,
    SessionView,
};
pub use session::{ScreeningSession, SessionId, SessionTicket};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::to_bytes;
use chrono::{DateTime, Utc};
use axum::response::Response;
use serde_json::Value;
use tokio::sync::Notify;

use crate::config::{NotificationConfig, NotificationStrategy, SessionStoreConfig};
use crate::workflows::screening::classifier::{
    ClassifierGateway, ClassifierResult, ClassifierUnavailable, ModelHealth, PredictedLabel,
};
use crate::workflows::screening::domain::{Answer, QUESTION_COUNT};
use crate::workflows::screening::notification::{
    DeliveryReceipt, NotificationError, NotificationSink, ResultNotification,
};
use crate::workflows::screening::repository::{
    evict_stale, RepositoryError, SessionRecord, SessionRepository,
};
use crate::workflows::screening::responses::{ResponseSnapshot, ResponseStore};
use crate::workflows::screening::service::{ScreeningService, ResultsTasks};
use crate::workflows::screening::session::SessionId;

pub(super) fn notification_config() -> NotificationConfig {
    NotificationConfig {
        strategy: NotificationStrategy::MailDraft,
        to_name: "Screening Desk".to_string(),
        to_email: "desk@clinic.example".to_string(),
        from_name: "Autism Screening Bot".to_string(),
        from_email: "noreply@autism-screening.demo".to_string(),
        emailjs: None,
    }
}

pub(super) fn store_with(answers: [Answer; QUESTION_COUNT]) -> ResponseStore {
    let mut store = ResponseStore::new();
    for (offset, answer) in answers.into_iter().enumerate() {
        store
            .set_answer(offset + 1, answer)
            .expect("valid index");
    }
    store
}

pub(super) fn uniform_store(answer: Answer) -> ResponseStore {
    store_with([answer; QUESTION_COUNT])
}

pub(super) fn classifier_result(probability: f64) -> ClassifierResult {
    ClassifierResult {
        predicted_label: PredictedLabel::Positive,
        probability,
        confidence_label: "High".to_string(),
        agreement_with_band: "Model agrees with AQ-10 screening".to_string(),
    }
}

pub(super) fn build_service(
    classifier: Option<Arc<dyn ClassifierGateway>>,
    sink: Arc<dyn NotificationSink>,
) -> (ScreeningService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let service = ScreeningService::new(
        repository.clone(),
        classifier,
        sink,
        notification_config(),
    );
    (service, repository)
}

pub(super) fn build_limited_service(
    sessions: SessionStoreConfig,
) -> (ScreeningService<MemoryRepository>, Arc<MemoryRepository>) {
    let (service, repository) = build_service(None, Arc::new(RecordingSink::default()));
    (service.with_session_limits(sessions), repository)
}

/// Answers and advances through every question, returning the spawned results work.
pub(super) fn complete_session(
    service: &ScreeningService<MemoryRepository>,
    id: &SessionId,
    answer: Answer,
) -> ResultsTasks {
    for _ in 1..QUESTION_COUNT {
        service.answer(id, answer).expect("answer accepted");
        service.advance(id).expect("advance succeeds");
    }
    service.answer(id, answer).expect("answer accepted");
    let (view, tasks) = service.advance_tracked(id).expect("final advance succeeds");
    assert!(view.state.is_results());
    tasks.expect("results work spawned")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("valid json body")
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
}

impl SessionRepository for MemoryRepository {
    fn insert(&self, record: SessionRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let id = record.session.id().clone();
        if guard.contains_key(&id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(id, record);
        Ok(())
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn with_record<T>(
        &self,
        id: &SessionId,
        operation: impl FnOnce(&mut SessionRecord) -> T,
    ) -> Result<T, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        Ok(operation(record))
    }

    fn evict(&self, idle_before: DateTime<Utc>, keep: usize) -> Result<usize, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        Ok(evict_stale(&mut guard, idle_before, keep))
    }
}

impl MemoryRepository {
    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("repository mutex poisoned").len()
    }
}

/// Classifier returning a canned outcome once its gate opens.
pub(super) struct FakeClassifier {
    outcome: Result<ClassifierResult, ClassifierUnavailable>,
    gate: Option<Arc<Notify>>,
    pub(super) calls: Mutex<Vec<ResponseSnapshot>>,
}

impl FakeClassifier {
    pub(super) fn returning(result: ClassifierResult) -> Self {
        Self {
            outcome: Ok(result),
            gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn failing(error: ClassifierUnavailable) -> Self {
        Self {
            outcome: Err(error),
            gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn gated(result: ClassifierResult, gate: Arc<Notify>) -> Self {
        Self {
            outcome: Ok(result),
            gate: Some(gate),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ClassifierGateway for FakeClassifier {
    async fn predict(
        &self,
        responses: &ResponseSnapshot,
    ) -> Result<ClassifierResult, ClassifierUnavailable> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push(responses.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.outcome.clone()
    }

    async fn health(&self) -> Result<ModelHealth, ClassifierUnavailable> {
        Ok(ModelHealth { model_loaded: true })
    }
}

#[derive(Default)]
pub(super) struct RecordingSink {
    delivered: Mutex<Vec<ResultNotification>>,
}

impl RecordingSink {
    pub(super) fn delivered(&self) -> Vec<ResultNotification> {
        self.delivered
            .lock()
            .expect("sink mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    fn channel(&self) -> &'static str {
        "recording"
    }

    async fn deliver(
        &self,
        notification: &ResultNotification,
    ) -> Result<DeliveryReceipt, NotificationError> {
        self.delivered
            .lock()
            .expect("sink mutex poisoned")
            .push(notification.clone());
        Ok(DeliveryReceipt::Sent {
            channel: "recording",
            recipient: notification.to_email.clone(),
        })
    }
}

pub(super) struct FailingSink;

#[async_trait]
impl NotificationSink for FailingSink {
    fn channel(&self) -> &'static str {
        "failing"
    }

    async fn deliver(
        &self,
        _notification: &ResultNotification,
    ) -> Result<DeliveryReceipt, NotificationError> {
        Err(NotificationError::Transport("connection refused".to_string()))
    }
}

pub(super) struct PanickingSink;

#[async_trait]
impl NotificationSink for PanickingSink {
    fn channel(&self) -> &'static str {
        "panicking"
    }

    async fn deliver(
        &self,
        _notification: &ResultNotification,
    ) -> Result<DeliveryReceipt, NotificationError> {
        panic!("sink exploded")
    }
}

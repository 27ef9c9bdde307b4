use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

use super::domain::QUESTION_COUNT;
use super::instrument::Aq10Instrument;
use super::report::ScreeningReport;
use super::responses::ResponseStore;
use crate::config::{EmailJsConfig, NotificationConfig, NotificationStrategy};

const TIMESTAMP_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";
const EMAILJS_TIMEOUT: Duration = Duration::from_secs(10);

/// Template parameters sent with every result notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultNotification {
    pub to_name: String,
    pub to_email: String,
    pub from_name: String,
    pub from_email: String,
    pub subject: String,
    pub score: u8,
    pub message: String,
    pub recommendation: String,
    pub responses_summary: String,
    pub timestamp: String,
}

impl ResultNotification {
    pub fn compose(
        config: &NotificationConfig,
        report: &ScreeningReport,
        instrument: &Aq10Instrument,
        responses: &ResponseStore,
        at: DateTime<Local>,
    ) -> Self {
        Self {
            to_name: config.to_name.clone(),
            to_email: config.to_email.clone(),
            from_name: config.from_name.clone(),
            from_email: config.from_email.clone(),
            subject: subject_line(report.raw_score),
            score: report.raw_score,
            message: report.message.clone(),
            recommendation: report.recommendation.to_string(),
            responses_summary: responses_summary(instrument, responses),
            timestamp: at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    /// Body used for mail drafts and for the manual-copy fallback.
    pub fn plain_text(&self) -> String {
        format!(
            "{}\n\n{}\n\n{}\n\nResponses:\n{}Submitted: {}\n",
            self.subject, self.message, self.recommendation, self.responses_summary, self.timestamp
        )
    }
}

pub fn subject_line(raw_score: u8) -> String {
    format!("AQ-10 Autism Screening Results - Score: {raw_score}/{QUESTION_COUNT}")
}

pub fn responses_summary(instrument: &Aq10Instrument, responses: &ResponseStore) -> String {
    instrument
        .questions()
        .iter()
        .zip(responses.iter())
        .map(|(question, (index, answer))| {
            let rendered = answer
                .map(|answer| render_answer(answer.token()))
                .unwrap_or_else(|| "Not answered".to_string());
            format!("Q{index}: {}\nAnswer: {rendered}\n\n", question.text)
        })
        .collect()
}

/// Uppercases a token and turns every dash into a space.
pub fn render_answer(token: &str) -> String {
    token.replace('-', " ").to_uppercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailDraft {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub mailto_url: String,
}

impl MailDraft {
    pub fn from_notification(notification: &ResultNotification) -> Self {
        let body = notification.plain_text();
        let mailto_url = format!(
            "mailto:{}?subject={}&body={}",
            notification.to_email,
            urlencoding::encode(&notification.subject),
            urlencoding::encode(&body)
        );
        Self {
            recipient: notification.to_email.clone(),
            subject: notification.subject.clone(),
            body,
            mailto_url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeliveryReceipt {
    Sent {
        channel: &'static str,
        recipient: String,
    },
    Draft(MailDraft),
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport failed: {0}")]
    Transport(String),
    #[error("notification rejected with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("notification channel misconfigured: {0}")]
    Misconfigured(String),
}

/// Outbound delivery channel for completed screenings.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn channel(&self) -> &'static str;

    async fn deliver(
        &self,
        notification: &ResultNotification,
    ) -> Result<DeliveryReceipt, NotificationError>;
}

/// Produces a pre-filled draft for the respondent's own mail client.
#[derive(Debug, Clone, Copy, Default)]
pub struct MailDraftSink;

#[async_trait]
impl NotificationSink for MailDraftSink {
    fn channel(&self) -> &'static str {
        "mail_draft"
    }

    async fn deliver(
        &self,
        notification: &ResultNotification,
    ) -> Result<DeliveryReceipt, NotificationError> {
        Ok(DeliveryReceipt::Draft(MailDraft::from_notification(
            notification,
        )))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSink;

#[async_trait]
impl NotificationSink for DisabledSink {
    fn channel(&self) -> &'static str {
        "disabled"
    }

    async fn deliver(
        &self,
        _notification: &ResultNotification,
    ) -> Result<DeliveryReceipt, NotificationError> {
        Ok(DeliveryReceipt::Skipped)
    }
}

#[derive(Debug, Serialize)]
struct EmailJsRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: &'a ResultNotification,
}

/// Transactional delivery through the EmailJS REST API.
#[derive(Debug, Clone)]
pub struct EmailJsSink {
    http_client: Client,
    config: EmailJsConfig,
}

impl EmailJsSink {
    pub fn new(config: EmailJsConfig) -> Result<Self, NotificationError> {
        let http_client = Client::builder()
            .timeout(EMAILJS_TIMEOUT)
            .build()
            .map_err(|err| NotificationError::Transport(err.to_string()))?;
        Ok(Self {
            http_client,
            config,
        })
    }
}

#[async_trait]
impl NotificationSink for EmailJsSink {
    fn channel(&self) -> &'static str {
        "emailjs"
    }

    async fn deliver(
        &self,
        notification: &ResultNotification,
    ) -> Result<DeliveryReceipt, NotificationError> {
        let request = EmailJsRequest {
            service_id: &self.config.service_id,
            template_id: &self.config.template_id,
            user_id: &self.config.public_key,
            template_params: notification,
        };

        let response = self
            .http_client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|err| NotificationError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(DeliveryReceipt::Sent {
            channel: self.channel(),
            recipient: notification.to_email.clone(),
        })
    }
}

/// Selects the sink named by configuration.
pub fn build_sink(
    config: &NotificationConfig,
) -> Result<Arc<dyn NotificationSink>, NotificationError> {
    match config.strategy {
        NotificationStrategy::MailDraft => Ok(Arc::new(MailDraftSink)),
        NotificationStrategy::Disabled => Ok(Arc::new(DisabledSink)),
        NotificationStrategy::EmailJs => {
            let emailjs = config.emailjs.clone().ok_or_else(|| {
                NotificationError::Misconfigured("emailjs credentials missing".to_string())
            })?;
            Ok(Arc::new(EmailJsSink::new(emailjs)?))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Delivered { receipt: DeliveryReceipt },
    Failed { reason: String, fallback_text: String },
}

/// Delivers through `sink`, turning failures into a status carrying the copy-paste fallback.
pub async fn dispatch(
    sink: &dyn NotificationSink,
    notification: &ResultNotification,
) -> NotificationStatus {
    match sink.deliver(notification).await {
        Ok(receipt) => {
            info!(channel = sink.channel(), score = notification.score, "result notification delivered");
            NotificationStatus::Delivered { receipt }
        }
        Err(err) => {
            warn!(channel = sink.channel(), error = %err, "result notification failed");
            NotificationStatus::Failed {
                reason: err.to_string(),
                fallback_text: notification.plain_text(),
            }
        }
    }
}

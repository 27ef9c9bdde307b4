use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::responses::ResponseSnapshot;
use crate::config::ClassifierConfig;

/// Remote predictor contacted once a session reaches results.
#[async_trait]
pub trait ClassifierGateway: Send + Sync {
    async fn predict(
        &self,
        responses: &ResponseSnapshot,
    ) -> Result<ClassifierResult, ClassifierUnavailable>;

    async fn health(&self) -> Result<ModelHealth, ClassifierUnavailable>;
}

/// Every way the classifier can fail; callers treat all of them as "no model section".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifierUnavailable {
    #[error("classifier transport failed: {0}")]
    Transport(String),
    #[error("classifier did not answer within {0:?}")]
    Timeout(Duration),
    #[error("classifier responded with status {0}")]
    Status(u16),
    #[error("classifier payload rejected: {0}")]
    Malformed(String),
    #[error("classifier disabled by configuration")]
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PredictedLabel {
    Positive,
    Negative,
}

impl PredictedLabel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Positive => "Positive screening",
            Self::Negative => "Negative screening",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierResult {
    pub predicted_label: PredictedLabel,
    /// Probability of the positive class, always within `[0, 1]`.
    pub probability: f64,
    pub confidence_label: String,
    pub agreement_with_band: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelHealth {
    pub model_loaded: bool,
}

/// Classifier contribution to a session's results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum ClassifierAugmentation {
    Pending,
    Available(ClassifierResult),
    Unavailable,
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    responses: &'a ResponseSnapshot,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    model_prediction: i64,
    model_probabilities: ModelProbabilities,
    interpretation: Interpretation,
}

#[derive(Debug, Deserialize)]
struct ModelProbabilities {
    autism: f64,
}

#[derive(Debug, Deserialize)]
struct Interpretation {
    confidence: String,
    agreement: String,
}

impl TryFrom<PredictResponse> for ClassifierResult {
    type Error = ClassifierUnavailable;

    fn try_from(payload: PredictResponse) -> Result<Self, Self::Error> {
        let predicted_label = match payload.model_prediction {
            1 => PredictedLabel::Positive,
            0 => PredictedLabel::Negative,
            other => {
                return Err(ClassifierUnavailable::Malformed(format!(
                    "model_prediction must be 0 or 1, got {other}"
                )))
            }
        };

        let probability = payload.model_probabilities.autism;
        if !(0.0..=1.0).contains(&probability) {
            return Err(ClassifierUnavailable::Malformed(format!(
                "probability {probability} outside [0, 1]"
            )));
        }

        Ok(Self {
            predicted_label,
            probability,
            confidence_label: payload.interpretation.confidence,
            agreement_with_band: payload.interpretation.agreement,
        })
    }
}

/// JSON-over-HTTP client for the prediction service.
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    http_client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpClassifier {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClassifierUnavailable> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ClassifierUnavailable::Transport(err.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http_client,
            base_url,
            timeout,
        })
    }

    /// Builds a client from configuration; `None` when the classifier is switched off.
    pub fn from_config(config: &ClassifierConfig) -> Result<Option<Self>, ClassifierUnavailable> {
        match &config.base_url {
            Some(base_url) => Self::new(base_url.clone(), config.timeout).map(Some),
            None => Ok(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send_json<T>(&self, request: reqwest::RequestBuilder) -> Result<T, ClassifierUnavailable>
    where
        T: for<'de> Deserialize<'de>,
    {
        let call = async {
            let response = request.send().await.map_err(|err| {
                if err.is_timeout() {
                    ClassifierUnavailable::Timeout(self.timeout)
                } else {
                    ClassifierUnavailable::Transport(err.to_string())
                }
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(ClassifierUnavailable::Status(status.as_u16()));
            }

            response
                .json::<T>()
                .await
                .map_err(|err| ClassifierUnavailable::Malformed(err.to_string()))
        };

        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| ClassifierUnavailable::Timeout(self.timeout))?
    }
}

#[async_trait]
impl ClassifierGateway for HttpClassifier {
    async fn predict(
        &self,
        responses: &ResponseSnapshot,
    ) -> Result<ClassifierResult, ClassifierUnavailable> {
        let url = format!("{}/predict", self.base_url);
        debug!(%url, "requesting classifier prediction");
        let request = self
            .http_client
            .post(&url)
            .json(&PredictRequest { responses });
        let payload: PredictResponse = self.send_json(request).await?;
        ClassifierResult::try_from(payload)
    }

    async fn health(&self) -> Result<ModelHealth, ClassifierUnavailable> {
        let url = format!("{}/health", self.base_url);
        let request = self.http_client.get(&url);
        self.send_json(request).await
    }
}

/// Runs a prediction and folds any failure into [`ClassifierAugmentation::Unavailable`].
pub async fn augment(
    gateway: &dyn ClassifierGateway,
    responses: &ResponseSnapshot,
) -> ClassifierAugmentation {
    match gateway.predict(responses).await {
        Ok(result) => ClassifierAugmentation::Available(result),
        Err(err) => {
            warn!(error = %err, "classifier unavailable; reporting score only");
            ClassifierAugmentation::Unavailable
        }
    }
}

/// Startup probe; the outcome is only logged.
pub async fn check_health(gateway: &dyn ClassifierGateway) -> Option<ModelHealth> {
    match gateway.health().await {
        Ok(health) if health.model_loaded => {
            info!("classifier reachable with model loaded");
            Some(health)
        }
        Ok(health) => {
            warn!("classifier reachable but reports no model loaded");
            Some(health)
        }
        Err(err) => {
            warn!(error = %err, "classifier health check failed");
            None
        }
    }
}

use serde::Serialize;

use super::classifier::{ClassifierAugmentation, ClassifierResult};
use super::domain::{ScoreBand, QUESTION_COUNT};
use super::scoring::ScoreResult;

pub const ELEVATED_RECOMMENDATION: &str = "Based on the AQ-10 scoring guidelines, a score of 6 or above suggests you may benefit from a specialist diagnostic assessment for autism spectrum condition.";
pub const LOW_RECOMMENDATION: &str = "Based on the AQ-10 scoring guidelines, a score below 6 suggests a lower likelihood of autism spectrum traits. However, if you have ongoing concerns, consulting with a healthcare professional can provide clarity.";

pub const MODEL_PROVENANCE: &str =
    "This prediction comes from a machine learning model trained on the UCI Autism Screening dataset.";
pub const MODEL_UNAVAILABLE_NOTICE: &str = "Model inference unavailable";
pub const MODEL_PENDING_NOTICE: &str = "Running model inference...";

/// Everything shown on the results screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreeningReport {
    pub raw_score: u8,
    pub band: ScoreBand,
    pub message: String,
    pub recommendation: &'static str,
    pub model: ModelSection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModelSection {
    Pending {
        notice: &'static str,
    },
    Available {
        prediction: &'static str,
        probability: String,
        confidence: String,
        agreement: String,
        provenance: &'static str,
    },
    Unavailable {
        notice: &'static str,
    },
}

pub fn recommendation_for(band: ScoreBand) -> &'static str {
    match band {
        ScoreBand::Elevated => ELEVATED_RECOMMENDATION,
        ScoreBand::Low => LOW_RECOMMENDATION,
    }
}

pub fn score_message(raw_score: u8) -> String {
    format!("Your AQ-10 score is {raw_score}/{QUESTION_COUNT}.")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResultComposer;

impl ResultComposer {
    pub fn compose(score: &ScoreResult, classifier: &ClassifierAugmentation) -> ScreeningReport {
        let model = match classifier {
            ClassifierAugmentation::Pending => ModelSection::Pending {
                notice: MODEL_PENDING_NOTICE,
            },
            ClassifierAugmentation::Available(result) => ModelSection::from_result(result),
            ClassifierAugmentation::Unavailable => ModelSection::Unavailable {
                notice: MODEL_UNAVAILABLE_NOTICE,
            },
        };

        ScreeningReport {
            raw_score: score.raw_score,
            band: score.band,
            message: score_message(score.raw_score),
            recommendation: recommendation_for(score.band),
            model,
        }
    }
}

impl ModelSection {
    fn from_result(result: &ClassifierResult) -> Self {
        Self::Available {
            prediction: result.predicted_label.label(),
            probability: format!("{:.1}%", result.probability * 100.0),
            confidence: result.confidence_label.clone(),
            agreement: result.agreement_with_band.clone(),
            provenance: MODEL_PROVENANCE,
        }
    }

    pub fn render_text(&self) -> String {
        match self {
            Self::Pending { notice } | Self::Unavailable { notice } => format!("{notice}\n"),
            Self::Available {
                prediction,
                probability,
                confidence,
                agreement,
                provenance,
            } => format!(
                "Model Analysis\n\
                 Model Prediction: {prediction}\n\
                 Autism Probability: {probability}\n\
                 Confidence: {confidence}\n\
                 Agreement: {agreement}\n\
                 {provenance}\n"
            ),
        }
    }
}

impl ScreeningReport {
    pub fn render_text(&self) -> String {
        format!(
            "{}\n{}\n\n{}",
            self.message,
            self.recommendation,
            self.model.render_text()
        )
    }
}

use crate::cli::IntegrationArgs;
use crate::infra::{apply_integration_overrides, build_classifier};
use aq_screening::config::{AppConfig, NotificationConfig};
use aq_screening::error::AppError;
use aq_screening::telemetry;
use aq_screening::workflows::screening::classifier::augment;
use aq_screening::workflows::screening::notification::dispatch;
use aq_screening::workflows::screening::{
    build_sink, Aq10Instrument, Answer, ClassifierAugmentation, ClassifierGateway,
    DeliveryReceipt, NavigationState, NotificationSink, NotificationStatus, ResultComposer,
    ResultNotification, ScoreComponent, ScoringEngine, ScreeningError, ScreeningReport,
    ScreeningSession, SessionId, QUESTION_COUNT,
};
use chrono::Local;
use clap::Args;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct TakeArgs {
    #[command(flatten)]
    pub(crate) integrations: IntegrationArgs,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Ten comma-separated answers, as tokens (slightly-agree) or numbers 1-4
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub(crate) answers: Vec<String>,
    /// Print the results as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
    #[command(flatten)]
    pub(crate) integrations: IntegrationArgs,
}

/// External collaborators used once a questionnaire completes.
pub(crate) struct Integrations {
    pub(crate) notification: NotificationConfig,
    pub(crate) classifier: Option<Arc<dyn ClassifierGateway>>,
    pub(crate) sink: Arc<dyn NotificationSink>,
}

impl Integrations {
    fn load(args: &IntegrationArgs) -> Result<Self, AppError> {
        let mut config = AppConfig::load()?;
        apply_integration_overrides(&mut config, args)?;
        telemetry::init(&config.telemetry)?;

        Ok(Self {
            classifier: build_classifier(&config)?,
            sink: build_sink(&config.notification)?,
            notification: config.notification,
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ScreeningOutcome {
    pub(crate) report: ScreeningReport,
    pub(crate) feature_vector: [u8; QUESTION_COUNT],
    pub(crate) components: Vec<ScoreComponent>,
    pub(crate) notification: NotificationStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionEnd {
    Completed,
    Quit,
}

pub(crate) async fn run_take(args: TakeArgs) -> Result<(), AppError> {
    let integrations = Integrations::load(&args.integrations)?;
    let instrument = Aq10Instrument::standard();
    let mut session = ScreeningSession::new(SessionId::next());

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    loop {
        if run_questionnaire(&mut session, &instrument, &mut input, &mut output)?
            == SessionEnd::Quit
        {
            writeln!(output, "Questionnaire abandoned.")?;
            return Ok(());
        }

        finish_session(&session, &instrument, &integrations, &mut output).await?;

        write!(output, "\nPress Enter to start over or q to quit: ")?;
        output.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 || is_quit(&line) {
            return Ok(());
        }
        session.restart();
    }
}

pub(crate) async fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let session = session_from_answers(&args.answers)?;
    let integrations = Integrations::load(&args.integrations)?;
    let instrument = Aq10Instrument::standard();
    let mut output = io::stdout();

    if args.json {
        let outcome = complete(&session, &instrument, &integrations).await?;
        let rendered = serde_json::to_string_pretty(&outcome).map_err(io::Error::from)?;
        writeln!(output, "{rendered}")?;
    } else {
        finish_session(&session, &instrument, &integrations, &mut output).await?;
    }
    Ok(())
}

/// Accepts an answer token or its 1-based position in the scale.
pub(crate) fn parse_answer_input(raw: &str) -> Result<Answer, ScreeningError> {
    let trimmed = raw.trim();
    match trimmed.parse::<usize>() {
        Ok(position @ 1..=4) => Ok(Answer::ordered()[position - 1]),
        Ok(_) => Err(ScreeningError::InvalidAnswer(trimmed.to_string())),
        Err(_) => Answer::parse_loose(trimmed),
    }
}

pub(crate) fn session_from_answers(raw: &[String]) -> Result<ScreeningSession, AppError> {
    if raw.len() != QUESTION_COUNT {
        let missing = (raw.len() + 1..=QUESTION_COUNT).collect::<Vec<_>>();
        let error = if missing.is_empty() {
            ScreeningError::InvalidIndex(raw.len())
        } else {
            ScreeningError::IncompleteResponses { missing }
        };
        return Err(error.into());
    }

    let mut session = ScreeningSession::new(SessionId::next());
    for value in raw {
        session.answer(parse_answer_input(value)?)?;
        session.advance()?;
    }
    Ok(session)
}

/// Drives the question screens until results are reached or the respondent quits.
pub(crate) fn run_questionnaire<I, O>(
    session: &mut ScreeningSession,
    instrument: &Aq10Instrument,
    input: &mut I,
    output: &mut O,
) -> io::Result<SessionEnd>
where
    I: BufRead,
    O: Write,
{
    while let NavigationState::Question(index) = session.state() {
        let progress = session.progress();
        let question = instrument
            .question(index)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;

        writeln!(output, "\n{} ({}%)", progress.label(), progress.percent)?;
        writeln!(output, "{}", question.text)?;
        for (position, answer) in Answer::ordered().into_iter().enumerate() {
            writeln!(output, "  {}) {}", position + 1, answer.label())?;
        }
        write!(output, "Choose 1-4 (q to quit): ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 || is_quit(&line) {
            return Ok(SessionEnd::Quit);
        }

        if line.trim().is_empty() {
            if let Err(err) = session.advance() {
                writeln!(output, "{err}")?;
            }
            continue;
        }

        match parse_answer_input(&line) {
            Ok(answer) => {
                let step = session.answer(answer).and_then(|()| session.advance());
                if let Err(err) = step {
                    writeln!(output, "{err}")?;
                }
            }
            Err(err) => writeln!(output, "{err}")?,
        }
    }
    Ok(SessionEnd::Completed)
}

/// Scores the session and runs the classifier and notification concurrently.
pub(crate) async fn complete(
    session: &ScreeningSession,
    instrument: &Aq10Instrument,
    integrations: &Integrations,
) -> Result<ScreeningOutcome, AppError> {
    let score = session.score(&ScoringEngine::new(instrument.clone()))?;
    let local = ResultComposer::compose(&score, &ClassifierAugmentation::Pending);
    let notification = ResultNotification::compose(
        &integrations.notification,
        &local,
        instrument,
        session.responses(),
        Local::now(),
    );
    let snapshot = session.responses().snapshot();

    let classify = async {
        match &integrations.classifier {
            Some(gateway) => augment(gateway.as_ref(), &snapshot).await,
            None => ClassifierAugmentation::Unavailable,
        }
    };
    let (augmentation, status) = tokio::join!(
        classify,
        dispatch(integrations.sink.as_ref(), &notification)
    );

    Ok(ScreeningOutcome {
        report: ResultComposer::compose(&score, &augmentation),
        feature_vector: score.feature_vector(),
        components: score.components,
        notification: status,
    })
}

async fn finish_session<O: Write>(
    session: &ScreeningSession,
    instrument: &Aq10Instrument,
    integrations: &Integrations,
    output: &mut O,
) -> Result<(), AppError> {
    let score = session.score(&ScoringEngine::new(instrument.clone()))?;
    let local = ResultComposer::compose(&score, &ClassifierAugmentation::Pending);
    writeln!(output, "\n{}\n{}\n", local.message, local.recommendation)?;
    if integrations.classifier.is_some() {
        writeln!(output, "{}", local.model.render_text().trim_end())?;
    }
    output.flush()?;

    let outcome = complete(session, instrument, integrations).await?;
    writeln!(output, "{}", outcome.report.model.render_text())?;
    write_notification_status(&outcome.notification, output)?;
    Ok(())
}

pub(crate) fn write_notification_status<O: Write>(
    status: &NotificationStatus,
    output: &mut O,
) -> io::Result<()> {
    match status {
        NotificationStatus::Pending => Ok(()),
        NotificationStatus::Delivered {
            receipt: DeliveryReceipt::Sent { channel, recipient },
        } => writeln!(output, "Results sent to {recipient} via {channel}."),
        NotificationStatus::Delivered {
            receipt: DeliveryReceipt::Draft(draft),
        } => writeln!(
            output,
            "Mail draft ready for {}. Open this link to send it:\n{}",
            draft.recipient, draft.mailto_url
        ),
        NotificationStatus::Delivered {
            receipt: DeliveryReceipt::Skipped,
        } => writeln!(output, "Result notification disabled."),
        NotificationStatus::Failed {
            reason,
            fallback_text,
        } => writeln!(
            output,
            "Could not send results ({reason}). Copy the summary below instead:\n\n{fallback_text}"
        ),
    }
}

fn is_quit(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "q" | "quit")
}

use crate::server;
use crate::terminal::{run_score, run_take, ScoreArgs, TakeArgs};
use clap::{Args, Parser, Subcommand};
use aq_screening::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "AQ-10 Screening",
    about = "Serve or take the AQ-10 autism screening questionnaire",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Answer the questionnaire interactively in the terminal
    Take(TakeArgs),
    /// Score ten answers given on the command line
    Score(ScoreArgs),
}

/// Overrides for the external classifier and notification channel.
#[derive(Args, Debug, Default, Clone)]
pub(crate) struct IntegrationArgs {
    /// Base URL of the prediction service (empty disables it)
    #[arg(long)]
    pub(crate) classifier_url: Option<String>,
    /// Skip the classifier entirely and report the score only
    #[arg(long)]
    pub(crate) no_classifier: bool,
    /// Notification strategy: mail_draft, emailjs, or disabled
    #[arg(long)]
    pub(crate) notify: Option<String>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[command(flatten)]
    pub(crate) integrations: IntegrationArgs,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Take(args) => run_take(args).await,
        Command::Score(args) => run_score(args).await,
    }
}

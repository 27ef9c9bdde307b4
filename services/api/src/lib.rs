mod cli;
mod infra;
mod routes;
mod server;
mod terminal;

use aq_screening::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}

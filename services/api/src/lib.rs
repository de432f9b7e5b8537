mod cli;
mod infra;
mod jobs;
mod routes;
mod server;

use groundcheck::error::AppError;

pub use routes::with_service_routes;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}

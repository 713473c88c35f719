mod auth;
mod cli;
mod routes;
mod server;
mod soap;

use krefia::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}

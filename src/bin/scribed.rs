use clap::Parser;
use scribe_auth::config::Config;
use scribe_auth::daemon::{scribed, DaemonError};

#[tokio::main]
async fn main() -> Result<(), DaemonError> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::parse();
    scribed(config).await
}

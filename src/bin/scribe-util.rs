use clap::Parser;

#[tokio::main]
async fn main() -> Result<(), scribe_auth::util::cli::CliError> {
    use scribe_auth::util::cli::*;

    dotenv::dotenv().ok();

    let opts = Options::parse();
    run_cli_action(opts).await?;
    println!("OK!");
    Ok(())
}

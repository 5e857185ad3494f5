use anyhow::Result;
use clap::Parser;
use toa_cli::{Cli, LogFormat};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; real environment variables still apply.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match cli.log_format {
        LogFormat::Text => toa_telemetry::init_telemetry("toa")?,
        LogFormat::Json => toa_telemetry::init_json("toa")?,
    }

    toa_cli::run(cli).await
}

use clap::Parser;
use jobhound_cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    jobhound_cli::run(Cli::parse()).await
}

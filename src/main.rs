use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    drawdown::api::run(drawdown::api::Cli::parse()).await
}

use anyhow::Result;
use medipulse::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}

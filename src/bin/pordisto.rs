use anyhow::Result;
use pordisto::cli;

// Main function
#[tokio::main]
async fn main() -> Result<()> {
    let action = cli::start()?;

    action.execute().await?;

    // Flush any spans still buffered by the batch exporter
    cli::telemetry::shutdown_tracer();

    Ok(())
}

use clap::Parser;
use gold_ledger::cli::{self, Cli};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.apply_output_flags();
    cli::init_tracing(&cli)?;

    if let Err(e) = cli::run(cli).await {
        tracing::error!(error = %e, "run failed");
        return Err(e);
    }
    Ok(())
}

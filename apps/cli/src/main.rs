//! SEO Ranker CLI: research keywords, generate drafts, publish them.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "loaded environment file");
    }
    commands::run(cli).await
}

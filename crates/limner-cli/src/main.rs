use anyhow::Result;
use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use limner_cli::{
    cli::{Cli, Commands},
    commands,
    context::CliContext,
};

fn env_filter(cli: &Cli) -> EnvFilter {
    match (cli.log_level, cli.verbose) {
        (Some(level), _) => EnvFilter::new(LevelFilter::from(level).to_string()),
        (None, true) => EnvFilter::new("debug"),
        (None, false) => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(&cli))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let ctx = CliContext::load(cli.vault.clone(), cli.config.as_deref()).await?;

    match cli.command {
        Commands::Generate { note } => commands::generate::execute(ctx, &note).await?,
        Commands::Undo { note } => commands::undo::execute(ctx, &note).await?,
        Commands::Clear { note, yes } => commands::undo::execute_clear(ctx, &note, yes).await?,
        Commands::Regenerate { note, line } => {
            commands::regenerate::execute(ctx, &note, line).await?
        }
        Commands::Sections { note, heading } => {
            commands::sections::execute(ctx, &note, heading.as_deref()).await?
        }
        Commands::Backup { note, content } => {
            commands::backup::execute(ctx, &note, content).await?
        }
    }

    Ok(())
}

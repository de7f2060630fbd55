//! Command dispatch

pub mod records;
pub mod reports;
pub mod sheets;

use anyhow::Result;

use super::{Cli, Commands};
use crate::config::Config;

/// Load configuration and run one command
pub async fn run(cli: Cli) -> Result<()> {
    if cli.no_color {
        colored::control::set_override(false);
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(path) = cli.local {
        config.local_file = Some(path);
    }
    let format = cli.format;

    match cli.command {
        Commands::Info => return sheets::info(&config, format).await,
        Commands::Health => return sheets::health(&config, format).await,
        _ => {}
    }

    let repos = config.repositories()?;
    match cli.command {
        Commands::Info | Commands::Health => Ok(()),
        Commands::Check { entity } => sheets::check(&repos, entity, format).await,
        Commands::List(args) => records::list(&repos, args, format).await,
        Commands::Get(args) => records::get(&repos, args, format).await,
        Commands::FindAll {
            entity,
            column,
            value,
        } => records::find_all(&repos, entity, &column, &value, format).await,
        Commands::Create(args) => records::create(&repos, args, format).await,
        Commands::Update(args) => records::update(&repos, args, format).await,
        Commands::Adjust(args) => records::adjust(&repos, args, format).await,
        Commands::Confirm { id, unset } => records::confirm(&repos, &id, unset, format).await,
        Commands::Delete(args) => records::delete(&repos, args, format).await,
        Commands::Filter(args) => {
            reports::filter_rows(&repos, args.entity, args.params, format).await
        }
        Commands::LowStock => reports::low_stock(&repos, format).await,
        Commands::Summary { kind } => reports::summary(&repos, kind, format).await,
    }
}

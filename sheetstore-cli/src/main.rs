use clap::Parser;
use colored::*;
use env_logger::Env;

use sheetstore::cli::Cli;
use sheetstore::cli::commands;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(err) = commands::run(cli).await {
        eprintln!("{} {:#}", "Error:".bright_red().bold(), err);
        std::process::exit(1);
    }
}

//! Command-line surface over the entity repositories

pub mod commands;
pub mod output;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::repository::EntityKind;
pub use output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "sheetstore")]
#[command(about = "Retail records kept in a spreadsheet: products, orders, transactions and batches")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to <config dir>/sheetstore/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Read and write a local JSON spreadsheet instead of the Sheets API
    #[arg(long, global = true)]
    pub local: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json, global = true)]
    pub format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the spreadsheet title and its tabs
    Info,
    /// Check that the spreadsheet is reachable, with a hint when it is not
    Health,
    /// Compare configured column order with the live header rows
    Check {
        /// Only check one entity
        entity: Option<EntityKind>,
    },
    /// List rows by page or by explicit range
    List(ListArgs),
    /// Fetch one row by key
    Get(KeyArgs),
    /// Fetch every row where a column equals a value
    FindAll {
        entity: EntityKind,
        column: String,
        value: String,
    },
    /// Append a row from a JSON object
    Create(CreateArgs),
    /// Merge a JSON object into an existing row
    Update(UpdateArgs),
    /// Set or shift a numeric column (stock, quantity)
    Adjust(AdjustArgs),
    /// Mark a transaction confirmed or unconfirmed
    Confirm {
        /// Transaction ID
        id: String,
        /// Mark as unconfirmed instead
        #[arg(long)]
        unset: bool,
    },
    /// Delete one row by key
    Delete(KeyArgs),
    /// Filter a full scan with entity query parameters
    Filter(FilterArgs),
    /// Products whose current stock is at or below their minimum
    LowStock,
    /// Aggregates over batches and transactions
    Summary {
        #[command(subcommand)]
        kind: SummaryCommands,
    },
}

#[derive(Args, Debug)]
pub struct ListArgs {
    pub entity: EntityKind,
    /// Page number (from 1)
    #[arg(long)]
    pub page: Option<u32>,
    /// Rows per page (max 1000)
    #[arg(long)]
    pub limit: Option<u32>,
    /// Explicit cell range such as A1:Z50; its first row is read as the header
    #[arg(long, conflicts_with_all = ["page", "limit"])]
    pub range: Option<String>,
}

#[derive(Args, Debug)]
pub struct KeyArgs {
    pub entity: EntityKind,
    /// Value to look up
    pub key: String,
    /// Column to match instead of the entity's natural key
    #[arg(long)]
    pub column: Option<String>,
}

#[derive(Args, Debug)]
#[command(group(clap::ArgGroup::new("input").required(true).args(["data", "file"])))]
pub struct CreateArgs {
    pub entity: EntityKind,
    /// JSON object of column name to value
    #[arg(long)]
    pub data: Option<String>,
    /// File holding the JSON object
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub target: KeyArgs,
    /// JSON object of columns to change
    #[arg(long)]
    pub data: String,
}

#[derive(Args, Debug)]
#[command(group(clap::ArgGroup::new("amount").required(true).multiple(true).args(["set", "delta"])))]
pub struct AdjustArgs {
    #[command(flatten)]
    pub target: KeyArgs,
    /// Numeric column to change (defaults to Current Stock for products, Quantity for batches)
    #[arg(long)]
    pub field: Option<String>,
    /// New absolute value; wins over --delta
    #[arg(long)]
    pub set: Option<f64>,
    /// Amount to add (negative to subtract)
    #[arg(long, allow_hyphen_values = true)]
    pub delta: Option<f64>,
}

#[derive(Args, Debug)]
pub struct FilterArgs {
    pub entity: EntityKind,
    /// Query parameter as name=value (repeatable), e.g. min_price=10
    #[arg(short, long = "param", value_parser = parse_param)]
    pub params: Vec<(String, String)>,
}

#[derive(Subcommand, Debug)]
pub enum SummaryCommands {
    /// Stock and cost per product across all batches
    Inventory {
        /// Only this product
        #[arg(long)]
        product_id: Option<String>,
    },
    /// Quantity and average unit cost of one product's batches
    ProductBatches { product_id: String },
    /// Counts and amounts over transactions
    Transactions {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        date_from: Option<String>,
        #[arg(long)]
        date_to: Option<String>,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected name=value, got '{}'", raw)),
    }
}

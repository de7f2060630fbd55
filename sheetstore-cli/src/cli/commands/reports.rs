//! Read-only reports: filter, low-stock and summaries

use anyhow::{Context, Result, anyhow};
use std::collections::HashMap;

use crate::cli::SummaryCommands;
use crate::cli::output::{OutputFormat, render, render_records};
use crate::query::{
    DateWindow, FilterSet, TransactionQuery, QueryParams, filter, filter_set_for,
    inventory_summary, product_batch_summary, transaction_summary,
};
use crate::repository::{EntityKind, Repositories};
use crate::store::StoreError;

pub async fn filter_rows(
    repos: &Repositories,
    entity: EntityKind,
    params: Vec<(String, String)>,
    format: OutputFormat,
) -> Result<()> {
    let params: HashMap<String, String> = params.into_iter().collect();
    let set = filter_set_for(entity, &params)?;
    let data = repos
        .get(entity)
        .scan_all()
        .await
        .with_context(|| format!("Failed to read {}", entity))?;
    let rows = filter(&data.rows, &set);
    println!("{}", render_records(&rows, format)?);
    Ok(())
}

pub async fn low_stock(repos: &Repositories, format: OutputFormat) -> Result<()> {
    let data = repos.products.scan_all().await?;
    let set = FilterSet::new().at_or_below("Current Stock", "Min Stock");
    let rows = filter(&data.rows, &set);
    println!("{}", render_records(&rows, format)?);
    Ok(())
}

pub async fn summary(repos: &Repositories, kind: SummaryCommands, format: OutputFormat) -> Result<()> {
    match kind {
        SummaryCommands::Inventory { product_id } => {
            let batches = match product_id.as_deref() {
                Some(id) => repos.batches.find_all("Product ID", id).await?,
                None => repos.batches.scan_all().await?.rows,
            };
            println!("{}", render(&inventory_summary(&batches), format)?);
        }
        SummaryCommands::ProductBatches { product_id } => {
            let batches = repos.batches.find_all("Product ID", &product_id).await?;
            let summary = product_batch_summary(&product_id, &batches).ok_or_else(|| {
                anyhow!(StoreError::not_found(
                    repos.batches.sheet(),
                    "Product ID",
                    &product_id
                ))
            })?;
            println!("{}", render(&summary, format)?);
        }
        SummaryCommands::Transactions {
            category,
            date_from,
            date_to,
        } => {
            let query = TransactionQuery {
                category,
                date_from: date_from.clone(),
                date_to: date_to.clone(),
                ..Default::default()
            };
            let set = query.filter_set()?;
            let data = repos.transactions.scan_all().await?;
            let rows = filter(&data.rows, &set);
            let summary = transaction_summary(
                &rows,
                DateWindow {
                    from: date_from,
                    to: date_to,
                },
            );
            println!("{}", render(&summary, format)?);
        }
    }
    Ok(())
}

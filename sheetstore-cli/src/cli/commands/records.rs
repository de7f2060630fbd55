//! Row commands: list, get, find-all, create, update, adjust, confirm, delete

use anyhow::{Context, Result, bail};
use colored::*;
use std::fs;

use crate::cli::output::{OutputFormat, render, render_records};
use crate::cli::{AdjustArgs, CreateArgs, KeyArgs, ListArgs, UpdateArgs};
use crate::repository::{Adjustment, EntityKind, EntityRepository, Repositories};
use crate::store::{ListWindow, Record};

fn key_column<'a>(repo: &'a EntityRepository, args: &'a KeyArgs) -> &'a str {
    args.column.as_deref().unwrap_or(&repo.schema().natural_key)
}

fn parse_record(json: &str, source: &str) -> Result<Record> {
    let value: serde_json::Value =
        serde_json::from_str(json).with_context(|| format!("Invalid JSON in {}", source))?;
    match Record::from_json(&value) {
        Some(record) => Ok(record),
        None => bail!("Expected a JSON object of column names to values in {}", source),
    }
}

fn done(format: OutputFormat, message: String) {
    if format == OutputFormat::Table {
        eprintln!("{} {}", "✓".bright_green(), message);
    }
}

pub async fn list(repos: &Repositories, args: ListArgs, format: OutputFormat) -> Result<()> {
    let repo = repos.get(args.entity);
    let window = ListWindow::from_parts(args.range, args.page, args.limit);
    let rows = repo
        .list(&window)
        .await
        .with_context(|| format!("Failed to list {}", args.entity))?;
    println!("{}", render_records(&rows, format)?);
    Ok(())
}

pub async fn get(repos: &Repositories, args: KeyArgs, format: OutputFormat) -> Result<()> {
    let repo = repos.get(args.entity);
    let handle = repo.get_by_key(key_column(repo, &args), &args.key).await?;
    println!("{}", render(&handle, format)?);
    Ok(())
}

pub async fn find_all(
    repos: &Repositories,
    entity: EntityKind,
    column: &str,
    value: &str,
    format: OutputFormat,
) -> Result<()> {
    let rows = repos.get(entity).find_all(column, value).await?;
    println!("{}", render_records(&rows, format)?);
    Ok(())
}

pub async fn create(repos: &Repositories, args: CreateArgs, format: OutputFormat) -> Result<()> {
    let record = match (&args.data, &args.file) {
        (Some(data), _) => parse_record(data, "--data")?,
        (None, Some(path)) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            parse_record(&content, &path.display().to_string())?
        }
        (None, None) => bail!("Provide the row with --data or --file"),
    };

    let repo = repos.get(args.entity);
    let created = repo.create(&record).await?;
    done(
        format,
        format!(
            "Created {} {}",
            args.entity.label(),
            created.record.get_or_empty(&repo.schema().natural_key)
        ),
    );
    println!("{}", render(&created, format)?);
    Ok(())
}

pub async fn update(repos: &Repositories, args: UpdateArgs, format: OutputFormat) -> Result<()> {
    let partial = parse_record(&args.data, "--data")?;
    if partial.is_empty() {
        bail!("--data must name at least one column");
    }

    let repo = repos.get(args.target.entity);
    let updated = repo
        .update(key_column(repo, &args.target), &args.target.key, &partial)
        .await?;
    done(format, format!("Updated {} {}", args.target.entity.label(), args.target.key));
    println!("{}", render(&updated, format)?);
    Ok(())
}

/// Numeric column adjusted when `--field` is not given
fn default_numeric_field(entity: EntityKind) -> Option<&'static str> {
    match entity {
        EntityKind::Products => Some("Current Stock"),
        EntityKind::Batches => Some("Quantity"),
        _ => None,
    }
}

pub async fn adjust(repos: &Repositories, args: AdjustArgs, format: OutputFormat) -> Result<()> {
    let entity = args.target.entity;
    let field = match args.field.as_deref().or(default_numeric_field(entity)) {
        Some(field) => field.to_string(),
        None => bail!("--field is required when adjusting {}", entity),
    };

    let repo = repos.get(entity);
    let adjusted = repo
        .adjust_numeric_field(
            key_column(repo, &args.target),
            &args.target.key,
            &field,
            Adjustment {
                absolute: args.set,
                delta: args.delta,
            },
        )
        .await?;
    done(
        format,
        format!("{}: {} -> {}", field, adjusted.previous, adjusted.current),
    );
    println!("{}", render(&adjusted, format)?);
    Ok(())
}

pub async fn confirm(repos: &Repositories, id: &str, unset: bool, format: OutputFormat) -> Result<()> {
    let repo = &repos.transactions;
    let updated = repo
        .set_flag(&repo.schema().natural_key, id, "Confirmed", !unset)
        .await?;
    done(
        format,
        format!(
            "Transaction {} {}",
            id,
            if unset { "unconfirmed" } else { "confirmed" }
        ),
    );
    println!("{}", render(&updated, format)?);
    Ok(())
}

pub async fn delete(repos: &Repositories, args: KeyArgs, format: OutputFormat) -> Result<()> {
    let repo = repos.get(args.entity);
    let removed = repo.remove(key_column(repo, &args), &args.key).await?;
    done(format, format!("Deleted {} {}", args.entity.label(), args.key));
    println!("{}", render(&removed, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MemoryBackend, ResilienceConfig};
    use crate::store::RowStore;
    use std::sync::Arc;

    fn shop() -> (Arc<MemoryBackend>, Repositories) {
        let backend = Arc::new(MemoryBackend::new("Shop").with_sheet(
            "Products",
            vec![vec![
                "Product ID",
                "Product Name",
                "Selling Price",
                "Current Stock",
                "Min Stock",
            ]],
        ));
        let store = RowStore::new(backend.clone(), &ResilienceConfig::disabled());
        (backend, Repositories::with_defaults(store))
    }

    fn target(key: &str) -> KeyArgs {
        KeyArgs {
            entity: EntityKind::Products,
            key: key.to_string(),
            column: None,
        }
    }

    #[test]
    fn test_parse_record_accepts_objects_only() {
        let record = parse_record(r#"{"Product ID": "P1", "Current Stock": 4}"#, "test").unwrap();
        assert_eq!(record.get("Current Stock"), Some("4"));

        assert!(parse_record("[1, 2]", "test").is_err());
        assert!(parse_record("{oops", "test").is_err());
    }

    #[test]
    fn test_default_numeric_fields() {
        assert_eq!(default_numeric_field(EntityKind::Products), Some("Current Stock"));
        assert_eq!(default_numeric_field(EntityKind::Batches), Some("Quantity"));
        assert_eq!(default_numeric_field(EntityKind::Orders), None);
    }

    #[tokio::test]
    async fn test_create_then_adjust_default_field() {
        let (backend, repos) = shop();

        create(
            &repos,
            CreateArgs {
                entity: EntityKind::Products,
                data: Some(r#"{"Product ID": "PROD001", "Product Name": "Soap", "Current Stock": "10"}"#.into()),
                file: None,
            },
            OutputFormat::JsonCompact,
        )
        .await
        .unwrap();

        adjust(
            &repos,
            AdjustArgs {
                target: target("PROD001"),
                field: None,
                set: None,
                delta: Some(-4.0),
            },
            OutputFormat::JsonCompact,
        )
        .await
        .unwrap();

        let rows = backend.rows("Products").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], "PROD001");
        assert_eq!(rows[1][3], "6");
    }

    #[tokio::test]
    async fn test_adjust_without_field_on_orders_fails() {
        let (_, repos) = shop();
        let result = adjust(
            &repos,
            AdjustArgs {
                target: KeyArgs {
                    entity: EntityKind::Orders,
                    key: "ORD1".into(),
                    column: None,
                },
                field: None,
                set: Some(1.0),
                delta: None,
            },
            OutputFormat::Json,
        )
        .await;
        assert!(result.unwrap_err().to_string().contains("--field"));
    }
}

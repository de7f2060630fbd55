//! Per-entity query parameters and their translation into filter sets
//!
//! Every parameter is optional and empty strings count as absent. Numeric
//! bounds must parse as numbers; date bounds are compared as text, so anything
//! other than `YYYY-MM-DD` is accepted with a warning.

use chrono::NaiveDate;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::coerce::{is_truthy, parse_bound};
use super::filters::FilterSet;
use crate::repository::EntityKind;
use crate::store::{StoreError, StoreResult};

/// Builds a [`FilterSet`] from a parameter struct
pub trait QueryParams {
    fn filter_set(&self) -> StoreResult<FilterSet>;
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn bound(name: &str, value: &Option<String>) -> StoreResult<Option<f64>> {
    match present(value) {
        None => Ok(None),
        Some(raw) => parse_bound(raw).map(Some).ok_or_else(|| {
            StoreError::ValidationFailed(format!("{} must be a number, got '{}'", name, raw))
        }),
    }
}

fn date<'a>(name: &str, value: &'a Option<String>) -> Option<&'a str> {
    let raw = present(value)?;
    if NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_err() {
        warn!(
            "{} '{}' is not a YYYY-MM-DD date; comparing it as text",
            name, raw
        );
    }
    Some(raw)
}

fn number_range(
    set: FilterSet,
    column: &str,
    (min_name, min): (&str, &Option<String>),
    (max_name, max): (&str, &Option<String>),
) -> StoreResult<FilterSet> {
    let min = bound(min_name, min)?;
    let max = bound(max_name, max)?;
    if min.is_none() && max.is_none() {
        return Ok(set);
    }
    Ok(set.number_range(column, min, max))
}

fn date_range(
    set: FilterSet,
    column: &str,
    (from_name, from): (&str, &Option<String>),
    (to_name, to): (&str, &Option<String>),
) -> FilterSet {
    let from = date(from_name, from);
    let to = date(to_name, to);
    if from.is_none() && to.is_none() {
        return set;
    }
    set.date_range(column, from, to)
}

fn contains(set: FilterSet, column: &str, value: &Option<String>) -> FilterSet {
    match present(value) {
        Some(needle) => set.contains(column, needle),
        None => set,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductQuery {
    pub name: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub min_stock: Option<String>,
    pub max_stock: Option<String>,
    pub low_stock_only: Option<String>,
}

impl QueryParams for ProductQuery {
    fn filter_set(&self) -> StoreResult<FilterSet> {
        let mut set = contains(FilterSet::new(), "Product Name", &self.name);
        set = number_range(
            set,
            "Selling Price",
            ("min_price", &self.min_price),
            ("max_price", &self.max_price),
        )?;
        set = number_range(
            set,
            "Current Stock",
            ("min_stock", &self.min_stock),
            ("max_stock", &self.max_stock),
        )?;
        if present(&self.low_stock_only).is_some_and(is_truthy) {
            set = set.at_or_below("Current Stock", "Min Stock");
        }
        Ok(set)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderQuery {
    pub channel: Option<String>,
    pub platform: Option<String>,
    pub process: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

impl QueryParams for OrderQuery {
    fn filter_set(&self) -> StoreResult<FilterSet> {
        let mut set = contains(FilterSet::new(), "Channel", &self.channel);
        set = contains(set, "Platform", &self.platform);
        set = contains(set, "Process", &self.process);
        Ok(date_range(
            set,
            "Order Date",
            ("date_from", &self.date_from),
            ("date_to", &self.date_to),
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderDetailQuery {
    pub product_id: Option<String>,
    pub batch_id: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
}

impl QueryParams for OrderDetailQuery {
    fn filter_set(&self) -> StoreResult<FilterSet> {
        let mut set = contains(FilterSet::new(), "Product ID", &self.product_id);
        set = contains(set, "Batch ID", &self.batch_id);
        set = contains(set, "Size", &self.size);
        set = contains(set, "Color", &self.color);
        number_range(
            set,
            "Selling Price",
            ("min_price", &self.min_price),
            ("max_price", &self.max_price),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionQuery {
    pub category: Option<String>,
    pub confirmed: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub min_amount: Option<String>,
    pub max_amount: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl QueryParams for TransactionQuery {
    fn filter_set(&self) -> StoreResult<FilterSet> {
        let mut set = contains(FilterSet::new(), "Category", &self.category);
        if let Some(confirmed) = present(&self.confirmed) {
            set = set.bool_equals("Confirmed", is_truthy(confirmed));
        }
        set = date_range(
            set,
            "Date",
            ("date_from", &self.date_from),
            ("date_to", &self.date_to),
        );
        set = number_range(
            set,
            "Amount",
            ("min_amount", &self.min_amount),
            ("max_amount", &self.max_amount),
        )?;
        set = contains(set, "From", &self.from);
        Ok(contains(set, "To", &self.to))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchQuery {
    pub product_id: Option<String>,
    pub min_cost: Option<String>,
    pub max_cost: Option<String>,
    pub min_quantity: Option<String>,
    pub max_quantity: Option<String>,
    pub import_date_from: Option<String>,
    pub import_date_to: Option<String>,
}

impl QueryParams for BatchQuery {
    fn filter_set(&self) -> StoreResult<FilterSet> {
        let mut set = contains(FilterSet::new(), "Product ID", &self.product_id);
        set = number_range(
            set,
            "Unit Cost Price",
            ("min_cost", &self.min_cost),
            ("max_cost", &self.max_cost),
        )?;
        set = number_range(
            set,
            "Quantity",
            ("min_quantity", &self.min_quantity),
            ("max_quantity", &self.max_quantity),
        )?;
        Ok(date_range(
            set,
            "Import Date",
            ("import_date_from", &self.import_date_from),
            ("import_date_to", &self.import_date_to),
        ))
    }
}

fn parse_params<T: for<'de> Deserialize<'de>>(params: &HashMap<String, String>) -> StoreResult<T> {
    let value = serde_json::to_value(params)
        .map_err(|e| StoreError::ValidationFailed(format!("Invalid query parameters: {}", e)))?;
    serde_json::from_value(value)
        .map_err(|e| StoreError::ValidationFailed(format!("Invalid query parameters: {}", e)))
}

/// Filter set for `kind` from loose `name=value` parameters. Unknown names are ignored.
pub fn filter_set_for(kind: EntityKind, params: &HashMap<String, String>) -> StoreResult<FilterSet> {
    match kind {
        EntityKind::Products => parse_params::<ProductQuery>(params)?.filter_set(),
        EntityKind::Orders => parse_params::<OrderQuery>(params)?.filter_set(),
        EntityKind::OrderDetails => parse_params::<OrderDetailQuery>(params)?.filter_set(),
        EntityKind::Transactions => parse_params::<TransactionQuery>(params)?.filter_set(),
        EntityKind::Batches => parse_params::<BatchQuery>(params)?.filter_set(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filters::Predicate;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_params_give_empty_set() {
        for kind in EntityKind::ALL {
            assert!(filter_set_for(kind, &HashMap::new()).unwrap().is_empty());
        }
        let blanks = params(&[("name", ""), ("min_price", "  ")]);
        assert!(filter_set_for(EntityKind::Products, &blanks).unwrap().is_empty());
    }

    #[test]
    fn test_product_params() {
        let set = filter_set_for(
            EntityKind::Products,
            &params(&[("name", "widget"), ("max_price", "20"), ("low_stock_only", "true")]),
        )
        .unwrap();
        assert_eq!(
            set.predicates(),
            &[
                Predicate::Contains {
                    column: "Product Name".into(),
                    needle: "widget".into()
                },
                Predicate::NumberRange {
                    column: "Selling Price".into(),
                    min: None,
                    max: Some(20.0)
                },
                Predicate::AtOrBelow {
                    column: "Current Stock".into(),
                    limit_column: "Min Stock".into()
                },
            ]
        );
    }

    #[test]
    fn test_low_stock_only_false_adds_nothing() {
        let set = filter_set_for(EntityKind::Products, &params(&[("low_stock_only", "false")])).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_non_numeric_bound_is_rejected() {
        let err = filter_set_for(EntityKind::Batches, &params(&[("min_cost", "cheap")])).unwrap_err();
        assert!(matches!(err, StoreError::ValidationFailed(ref m) if m.contains("min_cost")));
    }

    #[test]
    fn test_non_iso_dates_are_still_applied() {
        let set = filter_set_for(EntityKind::Orders, &params(&[("date_from", "01/02/2024")])).unwrap();
        assert_eq!(
            set.predicates(),
            &[Predicate::DateRange {
                column: "Order Date".into(),
                from: Some("01/02/2024".into()),
                to: None
            }]
        );
    }

    #[test]
    fn test_transaction_confirmed_flag() {
        let set = filter_set_for(
            EntityKind::Transactions,
            &params(&[("confirmed", "false"), ("unknown", "x")]),
        )
        .unwrap();
        assert_eq!(
            set.predicates(),
            &[Predicate::BoolEquals {
                column: "Confirmed".into(),
                expected: false
            }]
        );
    }
}

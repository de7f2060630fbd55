//! Aggregates over scanned batches and transactions

use serde::Serialize;

use super::coerce::{is_true_cell, to_number};
use crate::store::Record;

/// Stock of one product across its batches
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductBatchSummary {
    pub product_id: String,
    pub total_quantity: f64,
    /// Plain mean of the batches' unit costs, not weighted by quantity
    pub average_unit_cost: f64,
    pub total_batches: usize,
}

/// Summarize the batches of one product; `None` when it has none
pub fn product_batch_summary(product_id: &str, batches: &[Record]) -> Option<ProductBatchSummary> {
    if batches.is_empty() {
        return None;
    }
    let total_quantity: f64 = batches
        .iter()
        .map(|b| to_number(b.get_or_empty("Quantity")))
        .sum();
    let total_cost: f64 = batches
        .iter()
        .map(|b| to_number(b.get_or_empty("Unit Cost Price")))
        .sum();

    Some(ProductBatchSummary {
        product_id: product_id.to_string(),
        total_quantity,
        average_unit_cost: total_cost / batches.len() as f64,
        total_batches: batches.len(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductInventory {
    pub product_id: String,
    pub total_quantity: f64,
    pub total_batches: usize,
    /// Sum of quantity times unit cost
    pub total_cost_value: f64,
    /// Cost value per unit, 0 when nothing is in stock
    pub average_cost: f64,
    pub batches: Vec<Record>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InventoryTotals {
    pub total_batches: usize,
    pub total_quantity: f64,
    pub total_value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InventorySummary {
    pub products: Vec<ProductInventory>,
    pub total_products: usize,
    pub overall: InventoryTotals,
}

/// Group batches by product in first-seen order
pub fn inventory_summary(batches: &[Record]) -> InventorySummary {
    let mut products: Vec<ProductInventory> = Vec::new();

    for batch in batches {
        let product_id = batch.get_or_empty("Product ID");
        let quantity = to_number(batch.get_or_empty("Quantity"));
        let unit_cost = to_number(batch.get_or_empty("Unit Cost Price"));

        let entry = match products.iter().position(|p| p.product_id == product_id) {
            Some(i) => &mut products[i],
            None => {
                products.push(ProductInventory {
                    product_id: product_id.to_string(),
                    total_quantity: 0.0,
                    total_batches: 0,
                    total_cost_value: 0.0,
                    average_cost: 0.0,
                    batches: Vec::new(),
                });
                let last = products.len() - 1;
                &mut products[last]
            }
        };

        entry.total_quantity += quantity;
        entry.total_batches += 1;
        entry.total_cost_value += quantity * unit_cost;
        entry.batches.push(batch.clone());
    }

    for product in &mut products {
        if product.total_quantity > 0.0 {
            product.average_cost = product.total_cost_value / product.total_quantity;
        }
    }

    let overall = InventoryTotals {
        total_batches: batches.len(),
        total_quantity: products.iter().map(|p| p.total_quantity).sum(),
        total_value: products.iter().map(|p| p.total_cost_value).sum(),
    };

    InventorySummary {
        total_products: products.len(),
        products,
        overall,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DateWindow {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransactionSummary {
    pub total_transactions: usize,
    pub confirmed_transactions: usize,
    /// Everything not confirmed, including blank cells
    pub unconfirmed_transactions: usize,
    pub total_amount: f64,
    pub average_amount: f64,
    /// Distinct non-empty categories in first-seen order
    pub categories: Vec<String>,
    pub date_range: DateWindow,
}

/// Totals over already filtered transactions; the date window is echoed back
pub fn transaction_summary(transactions: &[Record], date_range: DateWindow) -> TransactionSummary {
    let total = transactions.len();
    let confirmed = transactions
        .iter()
        .filter(|t| is_true_cell(t.get_or_empty("Confirmed")))
        .count();
    let total_amount: f64 = transactions
        .iter()
        .map(|t| to_number(t.get_or_empty("Amount")))
        .sum();

    let mut categories: Vec<String> = Vec::new();
    for category in transactions.iter().map(|t| t.get_or_empty("Category")) {
        if !category.is_empty() && !categories.iter().any(|c| c == category) {
            categories.push(category.to_string());
        }
    }

    TransactionSummary {
        total_transactions: total,
        confirmed_transactions: confirmed,
        unconfirmed_transactions: total - confirmed,
        total_amount,
        average_amount: if total > 0 {
            total_amount / total as f64
        } else {
            0.0
        },
        categories,
        date_range,
    }
}

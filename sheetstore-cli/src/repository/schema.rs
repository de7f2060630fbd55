//! Per-entity sheet layout: tab name, natural key and write column order

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// The five retail tables kept in the spreadsheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Products,
    Orders,
    OrderDetails,
    Transactions,
    Batches,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Products,
        EntityKind::Orders,
        EntityKind::OrderDetails,
        EntityKind::Transactions,
        EntityKind::Batches,
    ];

    /// Default tab title
    pub fn default_sheet_name(&self) -> &'static str {
        match self {
            EntityKind::Products => "Products",
            EntityKind::Orders => "Orders",
            EntityKind::OrderDetails => "Order Details",
            EntityKind::Transactions => "Transactions",
            EntityKind::Batches => "Batches",
        }
    }

    /// Environment variable overriding the tab title
    pub fn sheet_name_env(&self) -> &'static str {
        match self {
            EntityKind::Products => "PRODUCTS_SHEET_NAME",
            EntityKind::Orders => "ORDERS_SHEET_NAME",
            EntityKind::OrderDetails => "ORDER_DETAILS_SHEET_NAME",
            EntityKind::Transactions => "TRANSACTIONS_SHEET_NAME",
            EntityKind::Batches => "BATCHES_SHEET_NAME",
        }
    }

    /// Singular label for messages
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Products => "product",
            EntityKind::Orders => "order",
            EntityKind::OrderDetails => "order detail",
            EntityKind::Transactions => "transaction",
            EntityKind::Batches => "batch",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Products => "products",
            EntityKind::Orders => "orders",
            EntityKind::OrderDetails => "order-details",
            EntityKind::Transactions => "transactions",
            EntityKind::Batches => "batches",
        };
        write!(f, "{}", name)
    }
}

/// Constructor-time description of one entity's sheet.
///
/// `columns` is used only to flatten records for append and update; reads
/// always key cells by the live header row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    pub kind: EntityKind,
    pub sheet_name: String,
    pub natural_key: String,
    pub columns: Vec<String>,
    /// Whether create rejects a second row with the same natural key
    pub unique_key: bool,
    /// Values filled in on create when the caller leaves a column out
    pub defaults: Vec<(String, String)>,
}

impl EntitySchema {
    /// Built-in layout for `kind` on its default tab
    pub fn for_kind(kind: EntityKind) -> Self {
        let (key, columns, unique_key, defaults): (&str, &[&str], bool, &[(&str, &str)]) =
            match kind {
                EntityKind::Products => (
                    "Product ID",
                    &[
                        "Product ID",
                        "Product Name",
                        "Selling Price",
                        "Current Stock",
                        "Min Stock",
                    ],
                    true,
                    &[],
                ),
                EntityKind::Orders => (
                    "OrderID",
                    &[
                        "OrderID",
                        "Order Date",
                        "Channel",
                        "Remark",
                        "Platform",
                        "Username",
                        "Recipient",
                        "Phone Number",
                        "Address",
                        "Process",
                    ],
                    true,
                    &[],
                ),
                EntityKind::OrderDetails => (
                    "Order ID",
                    &[
                        "Order ID",
                        "Product ID",
                        "Selling Price",
                        "Total Selling Price",
                        "Size",
                        "Color",
                        "Batch ID",
                    ],
                    false,
                    &[],
                ),
                EntityKind::Transactions => (
                    "Transaction ID",
                    &[
                        "Transaction ID",
                        "Date",
                        "Category",
                        "Amount",
                        "From",
                        "To",
                        "Confirmed",
                        "Note",
                    ],
                    true,
                    &[("Confirmed", "FALSE")],
                ),
                EntityKind::Batches => (
                    "Batch ID",
                    &[
                        "Batch ID",
                        "Product ID",
                        "Unit Cost Price",
                        "Quantity",
                        "Import Date",
                    ],
                    true,
                    &[],
                ),
            };

        EntitySchema {
            kind,
            sheet_name: kind.default_sheet_name().to_string(),
            natural_key: key.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique_key,
            defaults: defaults
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Same layout on a differently named tab
    pub fn with_sheet_name(mut self, sheet_name: impl Into<String>) -> Self {
        self.sheet_name = sheet_name.into();
        self
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layouts() {
        let products = EntitySchema::for_kind(EntityKind::Products);
        assert_eq!(products.sheet_name, "Products");
        assert_eq!(products.natural_key, "Product ID");
        assert_eq!(products.columns.len(), 5);
        assert_eq!(products.columns[0], products.natural_key);

        let orders = EntitySchema::for_kind(EntityKind::Orders);
        assert_eq!(orders.natural_key, "OrderID");
        assert_eq!(orders.columns.len(), 10);
    }

    #[test]
    fn test_order_details_key_is_not_unique() {
        let details = EntitySchema::for_kind(EntityKind::OrderDetails);
        assert_eq!(details.sheet_name, "Order Details");
        assert!(!details.unique_key);
        assert!(EntityKind::ALL
            .iter()
            .filter(|k| **k != EntityKind::OrderDetails)
            .all(|k| EntitySchema::for_kind(*k).unique_key));
    }

    #[test]
    fn test_transactions_default_unconfirmed() {
        let tx = EntitySchema::for_kind(EntityKind::Transactions);
        assert_eq!(tx.defaults, vec![("Confirmed".to_string(), "FALSE".to_string())]);
        assert!(tx.has_column("Confirmed"));
    }

    #[test]
    fn test_sheet_name_override() {
        let batches = EntitySchema::for_kind(EntityKind::Batches).with_sheet_name("Lots 2024");
        assert_eq!(batches.sheet_name, "Lots 2024");
        assert_eq!(batches.natural_key, "Batch ID");
    }
}

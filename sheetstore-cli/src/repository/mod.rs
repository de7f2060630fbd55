//! Entity repositories
//!
//! One [`EntityRepository`] per retail table, all sharing a single
//! [`RowStore`] and, when write serialization is on, a single set of key locks.

pub mod entity;
pub mod schema;

pub use entity::{Adjusted, Adjustment, Created, EntityRepository, Removed, Updated};
pub use schema::{EntityKind, EntitySchema};

use std::sync::Arc;

use crate::api::KeyedLocks;
use crate::store::RowStore;

/// The five repositories of one spreadsheet
#[derive(Debug, Clone)]
pub struct Repositories {
    pub products: EntityRepository,
    pub orders: EntityRepository,
    pub order_details: EntityRepository,
    pub transactions: EntityRepository,
    pub batches: EntityRepository,
}

impl Repositories {
    /// Build from explicit schemas; kinds not listed use their built-in layout
    pub fn new(store: RowStore, schemas: Vec<EntitySchema>, serialize_writes: bool) -> Self {
        let locks = serialize_writes.then(|| Arc::new(KeyedLocks::new()));
        let build = |kind: EntityKind| {
            let schema = schemas
                .iter()
                .find(|s| s.kind == kind)
                .cloned()
                .unwrap_or_else(|| EntitySchema::for_kind(kind));
            let repo = EntityRepository::new(schema, store.clone());
            match &locks {
                Some(locks) => repo.with_locks(locks.clone()),
                None => repo,
            }
        };

        Self {
            products: build(EntityKind::Products),
            orders: build(EntityKind::Orders),
            order_details: build(EntityKind::OrderDetails),
            transactions: build(EntityKind::Transactions),
            batches: build(EntityKind::Batches),
        }
    }

    /// Built-in layouts on their default tabs
    pub fn with_defaults(store: RowStore) -> Self {
        Self::new(store, Vec::new(), false)
    }

    pub fn get(&self, kind: EntityKind) -> &EntityRepository {
        match kind {
            EntityKind::Products => &self.products,
            EntityKind::Orders => &self.orders,
            EntityKind::OrderDetails => &self.order_details,
            EntityKind::Transactions => &self.transactions,
            EntityKind::Batches => &self.batches,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityRepository> {
        EntityKind::ALL.into_iter().map(|kind| self.get(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MemoryBackend, ResilienceConfig};

    fn store() -> RowStore {
        RowStore::new(Arc::new(MemoryBackend::new("Shop")), &ResilienceConfig::disabled())
    }

    #[test]
    fn test_defaults_cover_every_kind() {
        let repos = Repositories::with_defaults(store());
        for kind in EntityKind::ALL {
            assert_eq!(repos.get(kind).schema().kind, kind);
        }
        assert_eq!(repos.order_details.sheet(), "Order Details");
        assert_eq!(repos.iter().count(), 5);
    }

    #[test]
    fn test_schema_overrides_apply_per_kind() {
        let schemas = vec![EntitySchema::for_kind(EntityKind::Orders).with_sheet_name("Orders 2024")];
        let repos = Repositories::new(store(), schemas, true);
        assert_eq!(repos.orders.sheet(), "Orders 2024");
        assert_eq!(repos.products.sheet(), "Products");
    }
}

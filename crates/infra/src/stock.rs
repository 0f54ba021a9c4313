//! Item catalogue and manual stock adjustments.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{info, instrument};

use karatbook_core::{DomainError, ItemId, OrganizationId};
use karatbook_inventory::{Item, Metal, MovementReason, StockMovement, net_stock_changes};

use crate::error::{ServiceResult, store_step};
use crate::records::{entity_row, from_rows, to_row};
use crate::store::{DataStore, Delta, Filter, Table, WriteBatch};

#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn DataStore>,
}

impl InventoryService {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, sku, name, purity), fields(organization_id = %organization_id), err)]
    pub async fn create_item(
        &self,
        organization_id: OrganizationId,
        sku: &str,
        name: &str,
        metal: Metal,
        weight_grams: Decimal,
        purity: Option<String>,
    ) -> ServiceResult<Item> {
        let mut item = Item::create(organization_id, sku, name, metal, weight_grams)?;
        if let Some(purity) = purity {
            item = item.with_purity(purity);
        }

        let taken = self
            .store
            .select(
                Table::Items,
                Filter::organization(organization_id).eq("sku", &item.sku),
            )
            .await
            .map_err(store_step("load item by sku"))?;
        if !taken.is_empty() {
            return Err(DomainError::conflict(format!("sku {} already exists", item.sku)).into());
        }

        let mut batch = WriteBatch::new();
        batch.insert(
            Table::Items,
            entity_row(Table::Items, &item).map_err(store_step("encode item"))?,
        );
        self.store
            .commit(batch)
            .await
            .map_err(store_step("insert item"))?;

        info!(item_id = %item.id, sku = %item.sku, "item created");
        Ok(item)
    }

    /// Items of the organization, ordered by sku.
    pub async fn list_items(&self, organization_id: OrganizationId) -> ServiceResult<Vec<Item>> {
        let rows = self
            .store
            .select(
                Table::Items,
                Filter::organization(organization_id).order_by("sku"),
            )
            .await
            .map_err(store_step("load items"))?;
        Ok(from_rows(Table::Items, rows).map_err(store_step("decode items"))?)
    }

    /// Record a stock count correction. Adjustments have no ledger effect.
    #[instrument(skip(self), fields(organization_id = %organization_id), err)]
    pub async fn adjust_stock(
        &self,
        organization_id: OrganizationId,
        item_id: ItemId,
        quantity: i64,
        date: NaiveDate,
    ) -> ServiceResult<StockMovement> {
        let movement =
            StockMovement::new(organization_id, item_id, quantity, MovementReason::Adjustment, date)?;

        let on_hand: HashMap<ItemId, i64> = self
            .list_items(organization_id)
            .await?
            .into_iter()
            .map(|i| (i.id, i.current_stock))
            .collect();
        if !on_hand.contains_key(&item_id) {
            return Err(DomainError::not_found(format!("item {item_id}")).into());
        }
        net_stock_changes(&on_hand, std::slice::from_ref(&movement))?;

        let mut batch = WriteBatch::new();
        batch
            .insert(
                Table::StockMovements,
                to_row(Table::StockMovements, &movement)
                    .map_err(store_step("encode stock movement"))?,
            )
            .increment(Table::Items, item_id, "current_stock", Delta::Integer(quantity));
        self.store
            .commit(batch)
            .await
            .map_err(store_step("commit stock adjustment"))?;

        info!(item_id = %item_id, quantity, "stock adjusted");
        Ok(movement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::store::InMemoryDataStore;

    fn service() -> (InventoryService, Arc<InMemoryDataStore>) {
        let store = Arc::new(InMemoryDataStore::new());
        (InventoryService::new(store.clone()), store)
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 14).unwrap()
    }

    #[tokio::test]
    async fn duplicate_sku_is_a_conflict() {
        let (svc, _) = service();
        let org = OrganizationId::new();
        svc.create_item(org, "CHN-18", "Chain", Metal::Gold, Decimal::new(12, 0), Some("18K".into()))
            .await
            .unwrap();
        let err = svc
            .create_item(org, "CHN-18", "Other chain", Metal::Gold, Decimal::ONE, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));

        // sku uniqueness is per organization
        svc.create_item(OrganizationId::new(), "CHN-18", "Chain", Metal::Gold, Decimal::ONE, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn adjustments_cannot_take_stock_negative() {
        let (svc, store) = service();
        let org = OrganizationId::new();
        let item = svc
            .create_item(org, "ANK-1", "Anklet", Metal::Silver, Decimal::new(40, 0), None)
            .await
            .unwrap();

        svc.adjust_stock(org, item.id, 4, date()).await.unwrap();
        svc.adjust_stock(org, item.id, -3, date()).await.unwrap();
        let err = svc.adjust_stock(org, item.id, -2, date()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));

        assert_eq!(svc.list_items(org).await.unwrap()[0].current_stock, 1);
        assert_eq!(store.row_count(Table::StockMovements).unwrap(), 2);
    }

    #[tokio::test]
    async fn adjusting_an_unknown_item_is_not_found() {
        let (svc, _) = service();
        let err = svc
            .adjust_stock(OrganizationId::new(), ItemId::new(), 1, date())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));
    }
}

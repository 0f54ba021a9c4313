//! Posting of transactional documents.
//!
//! A posted document lands in one write batch: its header and line rows, the
//! generated ledger entry with balance increments, stock movements with the
//! matching `current_stock` increments, and the party balance change.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument};

use karatbook_accounting::{Counterparty, EntryStatus, Postable, validate};
use karatbook_core::{DocumentId, DomainError, EntryId, OrganizationId, PartyId};
use karatbook_inventory::{Item, net_stock_changes};
use karatbook_purchasing::{PurchaseOrder, PurchaseReceipt};

use crate::error::{ServiceResult, store_step};
use crate::ledger::LedgerService;
use crate::records::{DocumentRows, from_rows, purchase_order_from_rows, to_row};
use crate::store::{DataStore, Delta, Filter, Table, WriteBatch};

/// Ids produced by posting a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PostedDocument {
    pub document_id: DocumentId,
    pub entry_id: EntryId,
}

#[derive(Clone)]
pub struct DocumentService {
    store: Arc<dyn DataStore>,
    ledger: LedgerService,
}

impl DocumentService {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            ledger: LedgerService::new(store.clone()),
            store,
        }
    }

    /// Post a sale, receipt, voucher or advance.
    #[instrument(
        skip(self, doc),
        fields(
            organization_id = %doc.organization_id(),
            document_id = %doc.document_id(),
            kind = ?doc.document_kind()
        ),
        err
    )]
    pub async fn post_document<D>(&self, doc: &D) -> ServiceResult<PostedDocument>
    where
        D: Postable + DocumentRows + Sync,
    {
        let batch = WriteBatch::new();
        self.post_with(doc, batch).await
    }

    async fn post_with<D>(&self, doc: &D, mut batch: WriteBatch) -> ServiceResult<PostedDocument>
    where
        D: Postable + DocumentRows + Sync,
    {
        let organization_id = doc.organization_id();

        let accounts = self.ledger.posting_accounts(organization_id).await?;
        let entry = doc.to_posting(&accounts)?;
        let validated = validate(&entry)?;

        for (table, row) in doc.rows().map_err(store_step("encode document"))? {
            batch.insert(table, row);
        }
        let entry_id = self
            .ledger
            .stage_entry(validated, EntryStatus::Posted, &mut batch)
            .await?;

        let movements = DocumentRows::stock_movements(doc)?;
        if !movements.is_empty() {
            let on_hand = self.stock_on_hand(organization_id).await?;
            let net = net_stock_changes(&on_hand, &movements)?;
            for movement in &movements {
                batch.insert(
                    Table::StockMovements,
                    to_row(Table::StockMovements, movement)
                        .map_err(store_step("encode stock movement"))?,
                );
            }
            for (item_id, delta) in net {
                batch.increment(Table::Items, item_id, "current_stock", Delta::Integer(delta));
            }
        }

        if let Some(change) = doc.party_balance_change() {
            let table = self
                .party_table(organization_id, change.party_id, change.counterparty)
                .await?;
            batch.increment(
                table,
                change.party_id,
                "current_balance",
                Delta::Decimal(change.delta),
            );
        }

        self.store
            .commit(batch)
            .await
            .map_err(store_step("commit document posting"))?;

        info!(entry_id = %entry_id, "document posted");
        Ok(PostedDocument {
            document_id: doc.document_id(),
            entry_id,
        })
    }

    /// Post a goods receipt, closing the purchase order it fulfils in the
    /// same batch.
    pub async fn post_purchase_receipt(
        &self,
        receipt: PurchaseReceipt,
        purchase_order_id: Option<DocumentId>,
    ) -> ServiceResult<PostedDocument> {
        let Some(order_id) = purchase_order_id else {
            return self.post_document(&receipt).await;
        };

        let order = self
            .purchase_order(receipt.organization_id, order_id)
            .await?;
        let receipt = receipt.against_order(&order)?;

        let mut batch = WriteBatch::new();
        batch.update(
            Table::PurchaseOrders,
            Filter::organization(order.organization_id)
                .eq("id", order.id)
                .eq("status", "open"),
            vec![("status", json!("received"))],
            Some(1),
        );
        self.post_with(&receipt, batch).await
    }

    /// Record a purchase order. Orders have no ledger or stock effect.
    #[instrument(skip(self, order), fields(organization_id = %order.organization_id), err)]
    pub async fn create_purchase_order(&self, order: &PurchaseOrder) -> ServiceResult<DocumentId> {
        self.party_table(order.organization_id, order.supplier_id, Counterparty::Supplier)
            .await?;
        let mut batch = WriteBatch::new();
        for (table, row) in order.rows().map_err(store_step("encode purchase order"))? {
            batch.insert(table, row);
        }
        self.store
            .commit(batch)
            .await
            .map_err(store_step("insert purchase order"))?;
        info!(order_id = %order.id, "purchase order created");
        Ok(order.id)
    }

    pub async fn purchase_order(
        &self,
        organization_id: OrganizationId,
        order_id: DocumentId,
    ) -> ServiceResult<PurchaseOrder> {
        let header = self
            .store
            .select(
                Table::PurchaseOrders,
                Filter::organization(organization_id).eq("id", order_id),
            )
            .await
            .map_err(store_step("load purchase order"))?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::not_found(format!("purchase order {order_id}")))?;
        let items = self
            .store
            .select(
                Table::PurchaseOrderItems,
                Filter::organization(organization_id).eq("order_id", order_id),
            )
            .await
            .map_err(store_step("load purchase order items"))?;
        Ok(purchase_order_from_rows(header, items).map_err(store_step("decode purchase order"))?)
    }

    async fn stock_on_hand(
        &self,
        organization_id: OrganizationId,
    ) -> ServiceResult<HashMap<karatbook_core::ItemId, i64>> {
        let rows = self
            .store
            .select(Table::Items, Filter::organization(organization_id))
            .await
            .map_err(store_step("load items"))?;
        let items: Vec<Item> = from_rows(Table::Items, rows).map_err(store_step("decode items"))?;
        Ok(items.into_iter().map(|i| (i.id, i.current_stock)).collect())
    }

    /// Table holding `party_id`, which must be a party of the `expected` kind.
    async fn party_table(
        &self,
        organization_id: OrganizationId,
        party_id: PartyId,
        expected: Counterparty,
    ) -> ServiceResult<Table> {
        let (table, other) = match expected {
            Counterparty::Customer => (Table::Customers, Table::Suppliers),
            Counterparty::Supplier => (Table::Suppliers, Table::Customers),
        };
        let filter = || Filter::organization(organization_id).eq("id", party_id);
        let found = self
            .store
            .select(table, filter())
            .await
            .map_err(store_step("load party"))?;
        if !found.is_empty() {
            return Ok(table);
        }
        let misfiled = self
            .store
            .select(other, filter())
            .await
            .map_err(store_step("load party"))?;
        if !misfiled.is_empty() {
            return Err(DomainError::validation(format!(
                "party {party_id} is not a {}",
                match expected {
                    Counterparty::Customer => "customer",
                    Counterparty::Supplier => "supplier",
                }
            ))
            .into());
        }
        Err(DomainError::not_found(format!("party {party_id}")).into())
    }
}

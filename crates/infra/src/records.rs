//! Conversions between domain types and stored rows.

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use karatbook_accounting::{Voucher, VoucherBody};
use karatbook_core::{DocumentId, DomainResult, Entity, OrganizationId, PartyId};
use karatbook_inventory::{StockEffect, StockMovement};
use karatbook_parties::{ContactInfo, Party, PartyKind};
use karatbook_purchasing::{PurchaseOrder, PurchaseOrderItem, PurchaseOrderStatus, PurchaseReceipt};
use karatbook_sales::{AdvancePayment, Sale};

use crate::store::{Row, StoreError, StoreResult, Table};

pub(crate) fn to_row<T: Serialize + ?Sized>(table: Table, value: &T) -> StoreResult<Row> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Decode {
            table,
            detail: format!("expected object, got {other}"),
        }),
        Err(e) => Err(StoreError::Decode {
            table,
            detail: e.to_string(),
        }),
    }
}

/// Encode a master record, stamping the organization that owns it.
pub(crate) fn entity_row<E: Entity + Serialize>(table: Table, entity: &E) -> StoreResult<Row> {
    let mut row = to_row(table, entity)?;
    row.insert("organization_id".into(), json!(entity.organization_id()));
    Ok(row)
}

pub(crate) fn from_row<T: DeserializeOwned>(table: Table, row: Row) -> StoreResult<T> {
    serde_json::from_value(Value::Object(row)).map_err(|e| StoreError::Decode {
        table,
        detail: e.to_string(),
    })
}

pub(crate) fn from_rows<T: DeserializeOwned>(table: Table, rows: Vec<Row>) -> StoreResult<Vec<T>> {
    rows.into_iter().map(|r| from_row(table, r)).collect()
}

/// Customers and suppliers live in separate tables with the same shape.
pub(crate) fn party_table(kind: PartyKind) -> Table {
    match kind {
        PartyKind::Customer => Table::Customers,
        PartyKind::Supplier => Table::Suppliers,
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PartyRow {
    id: PartyId,
    organization_id: OrganizationId,
    name: String,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    current_balance: Decimal,
}

pub(crate) fn party_to_row(party: &Party) -> StoreResult<Row> {
    to_row(
        party_table(party.kind),
        &PartyRow {
            id: party.id,
            organization_id: party.organization_id,
            name: party.name.clone(),
            phone: party.contact.phone.clone(),
            email: party.contact.email.clone(),
            address: party.contact.address.clone(),
            current_balance: party.current_balance,
        },
    )
}

pub(crate) fn party_from_row(kind: PartyKind, row: Row) -> StoreResult<Party> {
    let r: PartyRow = from_row(party_table(kind), row)?;
    Ok(Party {
        id: r.id,
        organization_id: r.organization_id,
        kind,
        name: r.name,
        contact: ContactInfo {
            phone: r.phone,
            email: r.email,
            address: r.address,
        },
        current_balance: r.current_balance,
    })
}

/// A document's header and line rows, in insert order.
pub trait DocumentRows {
    fn rows(&self) -> StoreResult<Vec<(Table, Row)>>;

    /// Stock the document moves when posted.
    fn stock_movements(&self) -> DomainResult<Vec<StockMovement>> {
        Ok(Vec::new())
    }
}

fn object(table: Table, value: Value) -> StoreResult<(Table, Row)> {
    to_row(table, &value).map(|row| (table, row))
}

fn line_id() -> Uuid {
    Uuid::now_v7()
}

impl DocumentRows for Sale {
    fn rows(&self) -> StoreResult<Vec<(Table, Row)>> {
        let mut rows = vec![object(
            Table::Sales,
            json!({
                "id": self.id,
                "organization_id": self.organization_id,
                "invoice_number": self.invoice_number,
                "date": self.date,
                "customer_id": self.customer_id,
                "tax_rate": self.tax_rate,
                "subtotal": self.subtotal(),
                "tax": self.tax(),
                "total": self.total(),
                "amount_paid": self.amount_paid,
            }),
        )?];
        for item in &self.items {
            rows.push(object(
                Table::SaleItems,
                json!({
                    "id": line_id(),
                    "organization_id": self.organization_id,
                    "sale_id": self.id,
                    "line_no": item.line_no,
                    "item_id": item.item_id,
                    "quantity": item.quantity,
                    "rate": item.rate,
                    "making_charges": item.making_charges,
                }),
            )?);
        }
        Ok(rows)
    }

    fn stock_movements(&self) -> DomainResult<Vec<StockMovement>> {
        StockEffect::stock_movements(self)
    }
}

impl DocumentRows for PurchaseOrder {
    fn rows(&self) -> StoreResult<Vec<(Table, Row)>> {
        let mut rows = vec![object(
            Table::PurchaseOrders,
            json!({
                "id": self.id,
                "organization_id": self.organization_id,
                "order_number": self.order_number,
                "supplier_id": self.supplier_id,
                "date": self.date,
                "status": self.status,
                "total": self.total(),
            }),
        )?];
        for item in &self.items {
            rows.push(object(
                Table::PurchaseOrderItems,
                json!({
                    "id": line_id(),
                    "organization_id": self.organization_id,
                    "order_id": self.id,
                    "line_no": item.line_no,
                    "item_id": item.item_id,
                    "quantity": item.quantity,
                    "rate": item.rate,
                }),
            )?);
        }
        Ok(rows)
    }
}

#[derive(Debug, Deserialize)]
struct PurchaseOrderHeader {
    id: DocumentId,
    organization_id: OrganizationId,
    order_number: String,
    supplier_id: PartyId,
    date: chrono::NaiveDate,
    status: PurchaseOrderStatus,
}

pub(crate) fn purchase_order_from_rows(header: Row, items: Vec<Row>) -> StoreResult<PurchaseOrder> {
    let h: PurchaseOrderHeader = from_row(Table::PurchaseOrders, header)?;
    let mut items: Vec<PurchaseOrderItem> = from_rows(Table::PurchaseOrderItems, items)?;
    items.sort_by_key(|i| i.line_no);
    Ok(PurchaseOrder {
        id: h.id,
        organization_id: h.organization_id,
        order_number: h.order_number,
        supplier_id: h.supplier_id,
        date: h.date,
        status: h.status,
        items,
    })
}

impl DocumentRows for PurchaseReceipt {
    fn rows(&self) -> StoreResult<Vec<(Table, Row)>> {
        let mut rows = vec![object(
            Table::PurchaseReceipts,
            json!({
                "id": self.id,
                "organization_id": self.organization_id,
                "receipt_number": self.receipt_number,
                "supplier_id": self.supplier_id,
                "purchase_order_id": self.purchase_order_id,
                "date": self.date,
                "total": self.total(),
                "amount_paid": self.amount_paid,
            }),
        )?];
        for item in &self.items {
            rows.push(object(
                Table::PurchaseReceiptItems,
                json!({
                    "id": line_id(),
                    "organization_id": self.organization_id,
                    "receipt_id": self.id,
                    "line_no": item.line_no,
                    "item_id": item.item_id,
                    "quantity": item.quantity,
                    "rate": item.rate,
                }),
            )?);
        }
        Ok(rows)
    }

    fn stock_movements(&self) -> DomainResult<Vec<StockMovement>> {
        StockEffect::stock_movements(self)
    }
}

impl DocumentRows for Voucher {
    fn rows(&self) -> StoreResult<Vec<(Table, Row)>> {
        let (kind, amount) = match &self.body {
            VoucherBody::Payment { amount, .. } => ("payment", amount.value()),
            VoucherBody::Receipt { amount, .. } => ("receipt", amount.value()),
            VoucherBody::Journal { lines } => (
                "journal",
                lines.iter().filter_map(|l| l.debit).sum::<Decimal>(),
            ),
        };
        let body = serde_json::to_value(&self.body).map_err(|e| StoreError::Decode {
            table: Table::Vouchers,
            detail: e.to_string(),
        })?;
        Ok(vec![object(
            Table::Vouchers,
            json!({
                "id": self.id,
                "organization_id": self.organization_id,
                "number": self.number,
                "date": self.date,
                "narration": self.narration,
                "kind": kind,
                "party_id": self.party_id,
                "amount": amount,
                "body": body,
            }),
        )?])
    }
}

impl DocumentRows for AdvancePayment {
    fn rows(&self) -> StoreResult<Vec<(Table, Row)>> {
        Ok(vec![object(
            Table::AdvancePayments,
            json!({
                "id": self.id,
                "organization_id": self.organization_id,
                "customer_id": self.customer_id,
                "date": self.date,
                "amount": self.amount,
                "note": self.note,
            }),
        )?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use karatbook_core::ItemId;
    use karatbook_sales::SaleItem;

    #[test]
    fn party_survives_the_split_contact_columns() {
        let party = Party::register(
            OrganizationId::new(),
            PartyKind::Supplier,
            "Kundan Karigar",
            Some(ContactInfo {
                phone: Some("98200 00000".into()),
                ..ContactInfo::default()
            }),
        )
        .unwrap();
        let row = party_to_row(&party).unwrap();
        assert!(row.contains_key("phone"));
        assert!(!row.contains_key("contact"));
        assert_eq!(party_from_row(PartyKind::Supplier, row).unwrap(), party);
    }

    #[test]
    fn sale_rows_carry_header_totals_and_one_row_per_item() {
        let sale = Sale::new(
            OrganizationId::new(),
            "INV-7",
            NaiveDate::from_ymd_opt(2024, 10, 2).unwrap(),
            None,
            vec![
                SaleItem {
                    line_no: 1,
                    item_id: ItemId::new(),
                    quantity: 1,
                    rate: Decimal::new(1_000, 0),
                    making_charges: Decimal::ZERO,
                },
                SaleItem {
                    line_no: 2,
                    item_id: ItemId::new(),
                    quantity: 2,
                    rate: Decimal::new(500, 0),
                    making_charges: Decimal::ZERO,
                },
            ],
            Decimal::ZERO,
            Decimal::new(2_000, 0),
        )
        .unwrap();

        let rows = DocumentRows::rows(&sale).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].0, Table::Sales);
        let total: Decimal = rows[0].1["total"].as_str().unwrap().parse().unwrap();
        assert_eq!(total, Decimal::new(2_000, 0));
        assert!(rows[1..].iter().all(|(t, r)| *t == Table::SaleItems
            && r["sale_id"] == json!(sale.id.to_string())));
    }
}

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use karatbook_accounting::{
    Counterparty, DocumentKind, LinesBuilder, PartyBalanceChange, PostEntry, Postable,
    PostingAccounts, PostingRole,
};
use karatbook_core::{DocumentId, DomainError, DomainResult, ItemId, OrganizationId, PartyId};
use karatbook_inventory::{MovementReason, StockEffect, StockMovement};

use crate::order::{PurchaseOrder, lines_total};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceiptItem {
    pub line_no: u32,
    pub item_id: ItemId,
    pub quantity: i64,
    pub rate: Decimal,
}

/// Goods received from a supplier, optionally against a purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub id: DocumentId,
    pub organization_id: OrganizationId,
    pub receipt_number: String,
    pub supplier_id: PartyId,
    pub purchase_order_id: Option<DocumentId>,
    pub date: NaiveDate,
    pub items: Vec<PurchaseReceiptItem>,
    pub amount_paid: Decimal,
}

impl PurchaseReceipt {
    pub fn new(
        organization_id: OrganizationId,
        receipt_number: impl Into<String>,
        supplier_id: PartyId,
        date: NaiveDate,
        items: Vec<PurchaseReceiptItem>,
        amount_paid: Decimal,
    ) -> DomainResult<Self> {
        let receipt_number = receipt_number.into().trim().to_string();
        if receipt_number.is_empty() {
            return Err(DomainError::validation("receipt number cannot be empty"));
        }
        if items.is_empty() {
            return Err(DomainError::validation("receipt must have lines"));
        }
        for line in &items {
            if line.quantity <= 0 {
                return Err(DomainError::validation(format!(
                    "line {}: quantity must be positive",
                    line.line_no
                )));
            }
            if line.rate.is_sign_negative() {
                return Err(DomainError::validation(format!(
                    "line {}: rate cannot be negative",
                    line.line_no
                )));
            }
        }
        if amount_paid.is_sign_negative() {
            return Err(DomainError::validation("amount paid cannot be negative"));
        }

        lines_total(items.iter().map(|l| (l.rate, l.quantity)))?;

        let receipt = Self {
            id: DocumentId::new(),
            organization_id,
            receipt_number,
            supplier_id,
            purchase_order_id: None,
            date,
            items,
            amount_paid,
        };
        if receipt.amount_paid > receipt.total() {
            return Err(DomainError::validation(format!(
                "amount paid {} exceeds receipt total {}",
                receipt.amount_paid,
                receipt.total()
            )));
        }
        Ok(receipt)
    }

    /// Link the receipt to the order it fulfils.
    pub fn against_order(mut self, order: &PurchaseOrder) -> DomainResult<Self> {
        if order.organization_id != self.organization_id {
            return Err(DomainError::invariant("purchase order belongs to another organization"));
        }
        if order.supplier_id != self.supplier_id {
            return Err(DomainError::validation("receipt supplier does not match the order"));
        }
        if !order.is_receivable() {
            return Err(DomainError::conflict(format!(
                "purchase order {} is not open",
                order.order_number
            )));
        }
        self.purchase_order_id = Some(order.id);
        Ok(self)
    }

    pub fn total(&self) -> Decimal {
        self.items
            .iter()
            .map(|l| l.rate * Decimal::from(l.quantity))
            .sum()
    }

    pub fn outstanding(&self) -> Decimal {
        self.total() - self.amount_paid
    }
}

impl Postable for PurchaseReceipt {
    fn document_id(&self) -> DocumentId {
        self.id
    }

    fn document_kind(&self) -> DocumentKind {
        DocumentKind::PurchaseReceipt
    }

    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    fn to_posting(&self, accounts: &PostingAccounts) -> DomainResult<PostEntry> {
        let mut lines = LinesBuilder::new()
            .debit(accounts.get(PostingRole::Inventory)?, self.total())
            .credit(accounts.get(PostingRole::Cash)?, self.amount_paid);
        if !self.outstanding().is_zero() {
            lines = lines.credit(accounts.get(PostingRole::AccountsPayable)?, self.outstanding());
        }
        Ok(lines.into_entry(self, self.date, format!("Purchase receipt {}", self.receipt_number)))
    }

    fn party_balance_change(&self) -> Option<PartyBalanceChange> {
        let outstanding = self.outstanding();
        (!outstanding.is_zero()).then_some(PartyBalanceChange {
            party_id: self.supplier_id,
            counterparty: Counterparty::Supplier,
            delta: outstanding,
        })
    }
}

impl StockEffect for PurchaseReceipt {
    fn stock_movements(&self) -> DomainResult<Vec<StockMovement>> {
        self.items
            .iter()
            .map(|line| {
                StockMovement::new(
                    self.organization_id,
                    line.item_id,
                    line.quantity,
                    MovementReason::PurchaseReceipt,
                    self.date,
                )
                .map(|m| m.from_document(self.id))
            })
            .collect()
    }
}

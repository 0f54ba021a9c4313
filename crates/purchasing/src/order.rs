use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use karatbook_core::{
    Amount, DocumentId, DomainError, DomainResult, Entity, ItemId, OrganizationId, PartyId,
};

/// Purchase order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOrderStatus {
    Open,
    Received,
    Cancelled,
}

/// Purchase order line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderItem {
    pub line_no: u32,
    pub item_id: ItemId,
    pub quantity: i64,
    pub rate: Decimal,
}

/// Order placed with a supplier (karigar or wholesaler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: DocumentId,
    pub organization_id: OrganizationId,
    pub order_number: String,
    pub supplier_id: PartyId,
    pub date: NaiveDate,
    pub status: PurchaseOrderStatus,
    pub items: Vec<PurchaseOrderItem>,
}

/// Sum of `rate * quantity`, rejecting totals that overflow or exceed [`Amount::MAX`].
pub(crate) fn lines_total(lines: impl Iterator<Item = (Decimal, i64)>) -> DomainResult<Decimal> {
    let too_large = || DomainError::validation("document total is too large");
    let mut total = Decimal::ZERO;
    for (rate, quantity) in lines {
        let line = rate.checked_mul(Decimal::from(quantity)).ok_or_else(too_large)?;
        total = total.checked_add(line).ok_or_else(too_large)?;
    }
    if total > Amount::MAX {
        return Err(too_large());
    }
    Ok(total)
}

impl PurchaseOrder {
    pub fn new(
        organization_id: OrganizationId,
        order_number: impl Into<String>,
        supplier_id: PartyId,
        date: NaiveDate,
        items: Vec<PurchaseOrderItem>,
    ) -> DomainResult<Self> {
        let order_number = order_number.into().trim().to_string();
        if order_number.is_empty() {
            return Err(DomainError::validation("order number cannot be empty"));
        }
        if items.is_empty() {
            return Err(DomainError::validation("purchase order must have lines"));
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
        lines_total(items.iter().map(|l| (l.rate, l.quantity)))?;
        Ok(Self {
            id: DocumentId::new(),
            organization_id,
            order_number,
            supplier_id,
            date,
            status: PurchaseOrderStatus::Open,
            items,
        })
    }

    pub fn total(&self) -> Decimal {
        self.items
            .iter()
            .map(|l| l.rate * Decimal::from(l.quantity))
            .sum()
    }

    pub fn is_receivable(&self) -> bool {
        self.status == PurchaseOrderStatus::Open
    }
}

impl Entity for PurchaseOrder {
    type Id = DocumentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    #[test]
    fn new_order_is_open_and_totals_lines() {
        let po = PurchaseOrder::new(
            OrganizationId::new(),
            "PO-1",
            PartyId::new(),
            date(),
            vec![
                PurchaseOrderItem {
                    line_no: 1,
                    item_id: ItemId::new(),
                    quantity: 2,
                    rate: Decimal::new(12_000, 0),
                },
                PurchaseOrderItem {
                    line_no: 2,
                    item_id: ItemId::new(),
                    quantity: 1,
                    rate: Decimal::new(3_500, 0),
                },
            ],
        )
        .unwrap();
        assert!(po.is_receivable());
        assert_eq!(po.total(), Decimal::new(27_500, 0));
    }

    #[test]
    fn empty_order_is_rejected() {
        let res = PurchaseOrder::new(OrganizationId::new(), "PO-2", PartyId::new(), date(), vec![]);
        assert!(matches!(res, Err(DomainError::Validation(_))));
    }

    #[test]
    fn order_above_the_amount_ceiling_is_rejected() {
        let res = PurchaseOrder::new(
            OrganizationId::new(),
            "PO-3",
            PartyId::new(),
            date(),
            vec![PurchaseOrderItem {
                line_no: 1,
                item_id: ItemId::new(),
                quantity: 2,
                rate: Amount::MAX,
            }],
        );
        assert!(matches!(res, Err(DomainError::Validation(_))));
    }
}

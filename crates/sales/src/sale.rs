use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use karatbook_accounting::{
    Counterparty, DocumentKind, LinesBuilder, PartyBalanceChange, PostEntry, Postable,
    PostingAccounts, PostingRole,
};
use karatbook_core::{Amount, DocumentId, DomainError, DomainResult, ItemId, OrganizationId, PartyId};
use karatbook_inventory::{MovementReason, StockEffect, StockMovement};

/// Sale line: item, pieces, rate per piece and making charges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItem {
    pub line_no: u32,
    pub item_id: ItemId,
    pub quantity: i64,
    pub rate: Decimal,
    #[serde(default)]
    pub making_charges: Decimal,
}

impl SaleItem {
    pub fn line_total(&self) -> Decimal {
        self.rate * Decimal::from(self.quantity) + self.making_charges
    }
}

/// Total of a sale, failing where the plain accessors on [`Sale`] would overflow.
///
/// A constructed sale always passes this check, so its accessors are safe.
fn checked_total(items: &[SaleItem], tax_rate: Decimal) -> DomainResult<Decimal> {
    let too_large = || DomainError::validation("sale total is too large");
    let mut subtotal = Decimal::ZERO;
    for item in items {
        let line = item
            .rate
            .checked_mul(Decimal::from(item.quantity))
            .and_then(|v| v.checked_add(item.making_charges))
            .ok_or_else(too_large)?;
        subtotal = subtotal.checked_add(line).ok_or_else(too_large)?;
    }
    let tax = subtotal
        .checked_mul(tax_rate)
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .ok_or_else(too_large)?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let total = subtotal.checked_add(tax).ok_or_else(too_large)?;
    if total > Amount::MAX {
        return Err(too_large());
    }
    Ok(total)
}

/// Counter sale. Whatever is not paid at the counter becomes udhari on the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: DocumentId,
    pub organization_id: OrganizationId,
    pub invoice_number: String,
    pub date: NaiveDate,
    pub customer_id: Option<PartyId>,
    pub items: Vec<SaleItem>,
    /// Tax rate in percent (e.g. 3 for 3% GST on jewellery).
    pub tax_rate: Decimal,
    pub amount_paid: Decimal,
}

impl Sale {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        organization_id: OrganizationId,
        invoice_number: impl Into<String>,
        date: NaiveDate,
        customer_id: Option<PartyId>,
        items: Vec<SaleItem>,
        tax_rate: Decimal,
        amount_paid: Decimal,
    ) -> DomainResult<Self> {
        let invoice_number = invoice_number.into().trim().to_string();
        if invoice_number.is_empty() {
            return Err(DomainError::validation("invoice number cannot be empty"));
        }
        if items.is_empty() {
            return Err(DomainError::validation("sale must have at least one item"));
        }
        for item in &items {
            if item.quantity <= 0 {
                return Err(DomainError::validation(format!(
                    "line {}: quantity must be positive",
                    item.line_no
                )));
            }
            if item.rate.is_sign_negative() || item.making_charges.is_sign_negative() {
                return Err(DomainError::validation(format!(
                    "line {}: rate and making charges cannot be negative",
                    item.line_no
                )));
            }
        }
        if tax_rate.is_sign_negative() || tax_rate > Decimal::ONE_HUNDRED {
            return Err(DomainError::validation("tax rate must be between 0 and 100"));
        }
        if amount_paid.is_sign_negative() {
            return Err(DomainError::validation("amount paid cannot be negative"));
        }

        checked_total(&items, tax_rate)?;

        let sale = Self {
            id: DocumentId::new(),
            organization_id,
            invoice_number,
            date,
            customer_id,
            items,
            tax_rate,
            amount_paid,
        };

        if sale.amount_paid > sale.total() {
            return Err(DomainError::validation(format!(
                "amount paid {} exceeds sale total {}",
                sale.amount_paid,
                sale.total()
            )));
        }
        if sale.outstanding() > Decimal::ZERO && sale.customer_id.is_none() {
            return Err(DomainError::validation(
                "a customer is required when part of the sale is on udhari",
            ));
        }
        Ok(sale)
    }

    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(SaleItem::line_total).sum()
    }

    /// Tax rounded half-up to paise.
    pub fn tax(&self) -> Decimal {
        (self.subtotal() * self.tax_rate / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    pub fn total(&self) -> Decimal {
        self.subtotal() + self.tax()
    }

    /// Udhari left on the customer after this sale.
    pub fn outstanding(&self) -> Decimal {
        self.total() - self.amount_paid
    }
}

impl Postable for Sale {
    fn document_id(&self) -> DocumentId {
        self.id
    }

    fn document_kind(&self) -> DocumentKind {
        DocumentKind::Sale
    }

    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    fn to_posting(&self, accounts: &PostingAccounts) -> DomainResult<PostEntry> {
        let mut lines = LinesBuilder::new()
            .debit(accounts.get(PostingRole::Cash)?, self.amount_paid)
            .credit(accounts.get(PostingRole::SalesRevenue)?, self.subtotal());
        if !self.outstanding().is_zero() {
            lines = lines.debit(accounts.get(PostingRole::AccountsReceivable)?, self.outstanding());
        }
        if !self.tax().is_zero() {
            lines = lines.credit(accounts.get(PostingRole::TaxPayable)?, self.tax());
        }
        Ok(lines.into_entry(self, self.date, format!("Sale {}", self.invoice_number)))
    }

    fn party_balance_change(&self) -> Option<PartyBalanceChange> {
        let party_id = self.customer_id?;
        let outstanding = self.outstanding();
        (!outstanding.is_zero()).then_some(PartyBalanceChange {
            party_id,
            counterparty: Counterparty::Customer,
            delta: outstanding,
        })
    }
}

impl StockEffect for Sale {
    fn stock_movements(&self) -> DomainResult<Vec<StockMovement>> {
        self.items
            .iter()
            .map(|item| {
                StockMovement::new(
                    self.organization_id,
                    item.item_id,
                    -item.quantity,
                    MovementReason::Sale,
                    self.date,
                )
                .map(|m| m.from_document(self.id))
            })
            .collect()
    }
}

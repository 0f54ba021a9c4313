use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use karatbook_accounting::{
    DocumentKind, LinesBuilder, PostEntry, Postable, PostingAccounts, PostingRole,
};
use karatbook_core::{Amount, DocumentId, DomainError, DomainResult, OrganizationId, PartyId};

/// Money taken from a customer ahead of a sale (booking an ornament, gold scheme
/// instalment). Held as a liability until it is adjusted against a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancePayment {
    pub id: DocumentId,
    pub organization_id: OrganizationId,
    pub customer_id: PartyId,
    pub date: NaiveDate,
    pub amount: Amount,
    pub note: Option<String>,
}

impl AdvancePayment {
    pub fn new(
        organization_id: OrganizationId,
        customer_id: PartyId,
        date: NaiveDate,
        amount: Amount,
        note: Option<String>,
    ) -> DomainResult<Self> {
        if amount.is_zero() {
            return Err(DomainError::validation("advance amount must be positive"));
        }
        Ok(Self {
            id: DocumentId::new(),
            organization_id,
            customer_id,
            date,
            amount,
            note,
        })
    }
}

impl Postable for AdvancePayment {
    fn document_id(&self) -> DocumentId {
        self.id
    }

    fn document_kind(&self) -> DocumentKind {
        DocumentKind::AdvancePayment
    }

    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    fn to_posting(&self, accounts: &PostingAccounts) -> DomainResult<PostEntry> {
        Ok(LinesBuilder::new()
            .debit(accounts.get(PostingRole::Cash)?, self.amount.value())
            .credit(accounts.get(PostingRole::CustomerAdvances)?, self.amount.value())
            .into_entry(self, self.date, "Customer advance"))
    }
}

//! Documents that turn into ledger postings.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use karatbook_core::{AccountId, DocumentId, DomainResult, OrganizationId, PartyId};

use crate::chart::PostingAccounts;
use crate::ledger::{DocumentKind, PostEntry, PostingLineInput};

/// Which sub-ledger a party balance lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Counterparty {
    /// Udhari, mirrored by Accounts Receivable.
    Customer,
    /// Amount owed, mirrored by Accounts Payable.
    Supplier,
}

/// Change to a customer's or supplier's running balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyBalanceChange {
    pub party_id: PartyId,
    /// The party must be of this kind for the change to apply.
    pub counterparty: Counterparty,
    pub delta: Decimal,
}

/// A transactional document that, once posted, yields one balanced entry.
pub trait Postable {
    fn document_id(&self) -> DocumentId;

    fn document_kind(&self) -> DocumentKind;

    fn organization_id(&self) -> OrganizationId;

    /// Build the journal entry for this document, tagged with its source.
    fn to_posting(&self, accounts: &PostingAccounts) -> DomainResult<PostEntry>;

    /// Sub-ledger effect on a customer or supplier, if any.
    fn party_balance_change(&self) -> Option<PartyBalanceChange> {
        None
    }
}

/// Accumulates posting lines, dropping zero-amount legs.
#[derive(Debug, Default)]
pub struct LinesBuilder {
    lines: Vec<PostingLineInput>,
}

impl LinesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debit(mut self, account_id: AccountId, amount: Decimal) -> Self {
        if !amount.is_zero() {
            self.lines.push(PostingLineInput::debit(account_id, amount));
        }
        self
    }

    pub fn credit(mut self, account_id: AccountId, amount: Decimal) -> Self {
        if !amount.is_zero() {
            self.lines.push(PostingLineInput::credit(account_id, amount));
        }
        self
    }

    pub fn into_entry<D: Postable + ?Sized>(
        self,
        doc: &D,
        date: NaiveDate,
        narration: impl Into<String>,
    ) -> PostEntry {
        PostEntry::new(doc.organization_id(), date, narration, self.lines)
            .with_source(doc.document_kind(), doc.document_id())
    }
}

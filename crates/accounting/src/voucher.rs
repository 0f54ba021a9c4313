use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use karatbook_core::{
    AccountId, Amount, DocumentId, DomainError, DomainResult, Entity, OrganizationId, PartyId,
};

use crate::chart::{PostingAccounts, PostingRole};
use crate::document::{Counterparty, LinesBuilder, PartyBalanceChange, Postable};
use crate::ledger::{DocumentKind, PostEntry, PostingLineInput};

/// What a voucher does to the books.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VoucherBody {
    /// Money out of the till: debit `account_id`, credit cash.
    Payment { account_id: AccountId, amount: Amount },
    /// Money into the till: debit cash, credit `account_id`.
    Receipt { account_id: AccountId, amount: Amount },
    /// Free-form journal voucher with explicit lines.
    Journal { lines: Vec<PostingLineInput> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: DocumentId,
    pub organization_id: OrganizationId,
    pub number: String,
    pub date: NaiveDate,
    pub narration: String,
    /// Customer settling udhari (receipt against Accounts Receivable) or
    /// supplier being paid (payment against Accounts Payable).
    pub party_id: Option<PartyId>,
    pub body: VoucherBody,
}

impl Voucher {
    pub fn new(
        organization_id: OrganizationId,
        number: impl Into<String>,
        date: NaiveDate,
        narration: impl Into<String>,
        body: VoucherBody,
    ) -> DomainResult<Self> {
        let number = number.into().trim().to_string();
        if number.is_empty() {
            return Err(DomainError::validation("voucher number must not be empty"));
        }
        match &body {
            VoucherBody::Payment { amount, .. } | VoucherBody::Receipt { amount, .. }
                if amount.is_zero() =>
            {
                return Err(DomainError::validation("voucher amount must be positive"));
            }
            VoucherBody::Journal { lines } if lines.is_empty() => {
                return Err(DomainError::validation("journal voucher must have lines"));
            }
            _ => {}
        }
        Ok(Self {
            id: DocumentId::new(),
            organization_id,
            number,
            date,
            narration: narration.into(),
            party_id: None,
            body,
        })
    }

    pub fn for_party(mut self, party_id: PartyId) -> Self {
        self.party_id = Some(party_id);
        self
    }

    /// A party voucher must post against the control account of the party's
    /// sub-ledger: receipts from customers against Accounts Receivable,
    /// payments to suppliers against Accounts Payable.
    fn check_party_account(&self, accounts: &PostingAccounts) -> DomainResult<()> {
        if self.party_id.is_none() {
            return Ok(());
        }
        let (account_id, role) = match &self.body {
            VoucherBody::Receipt { account_id, .. } => (account_id, PostingRole::AccountsReceivable),
            VoucherBody::Payment { account_id, .. } => (account_id, PostingRole::AccountsPayable),
            VoucherBody::Journal { .. } => {
                return Err(DomainError::validation(
                    "journal vouchers cannot settle a party balance",
                ));
            }
        };
        if *account_id != accounts.get(role)? {
            return Err(DomainError::validation(format!(
                "voucher {} for a party must post against the {role:?} account",
                self.number
            )));
        }
        Ok(())
    }
}

impl Entity for Voucher {
    type Id = DocumentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }
}

impl Postable for Voucher {
    fn document_id(&self) -> DocumentId {
        self.id
    }

    fn document_kind(&self) -> DocumentKind {
        DocumentKind::Voucher
    }

    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    fn to_posting(&self, accounts: &PostingAccounts) -> DomainResult<PostEntry> {
        self.check_party_account(accounts)?;
        let narration = format!("Voucher {}: {}", self.number, self.narration);
        match &self.body {
            VoucherBody::Payment { account_id, amount } => {
                let cash = accounts.get(PostingRole::Cash)?;
                Ok(LinesBuilder::new()
                    .debit(*account_id, amount.value())
                    .credit(cash, amount.value())
                    .into_entry(self, self.date, narration))
            }
            VoucherBody::Receipt { account_id, amount } => {
                let cash = accounts.get(PostingRole::Cash)?;
                Ok(LinesBuilder::new()
                    .debit(cash, amount.value())
                    .credit(*account_id, amount.value())
                    .into_entry(self, self.date, narration))
            }
            VoucherBody::Journal { lines } => Ok(PostEntry::new(
                self.organization_id,
                self.date,
                narration,
                lines.clone(),
            )
            .with_source(DocumentKind::Voucher, self.id)),
        }
    }

    fn party_balance_change(&self) -> Option<PartyBalanceChange> {
        let party_id = self.party_id?;
        let (counterparty, amount) = match &self.body {
            VoucherBody::Receipt { amount, .. } => (Counterparty::Customer, amount),
            VoucherBody::Payment { amount, .. } => (Counterparty::Supplier, amount),
            VoucherBody::Journal { .. } => return None,
        };
        Some(PartyBalanceChange {
            party_id,
            counterparty,
            delta: -amount.value(),
        })
    }
}

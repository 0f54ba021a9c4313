//! System account roles used when documents generate their postings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use karatbook_core::{AccountId, DomainError, DomainResult};

use crate::account::AccountKind;

/// Role an account plays for document postings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostingRole {
    Cash,
    AccountsReceivable,
    AccountsPayable,
    Inventory,
    SalesRevenue,
    TaxPayable,
    CustomerAdvances,
}

impl PostingRole {
    pub const ALL: [PostingRole; 7] = [
        PostingRole::Cash,
        PostingRole::AccountsReceivable,
        PostingRole::AccountsPayable,
        PostingRole::Inventory,
        PostingRole::SalesRevenue,
        PostingRole::TaxPayable,
        PostingRole::CustomerAdvances,
    ];

    /// Code, name and kind of the account seeded for this role.
    pub fn default_account(self) -> (&'static str, &'static str, AccountKind) {
        match self {
            PostingRole::Cash => ("1000", "Cash in Hand", AccountKind::Asset),
            PostingRole::AccountsReceivable => ("1100", "Udhari Receivable", AccountKind::Asset),
            PostingRole::Inventory => ("1200", "Jewellery Stock", AccountKind::Asset),
            PostingRole::AccountsPayable => ("2000", "Supplier Payable", AccountKind::Liability),
            PostingRole::TaxPayable => ("2100", "GST Payable", AccountKind::Liability),
            PostingRole::CustomerAdvances => ("2200", "Customer Advances", AccountKind::Liability),
            PostingRole::SalesRevenue => ("4000", "Sales", AccountKind::Income),
        }
    }
}

/// Mapping from posting roles to the organization's ledger accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingAccounts {
    roles: HashMap<PostingRole, AccountId>,
}

impl PostingAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, role: PostingRole, account_id: AccountId) -> Self {
        self.roles.insert(role, account_id);
        self
    }

    pub fn set(&mut self, role: PostingRole, account_id: AccountId) {
        self.roles.insert(role, account_id);
    }

    pub fn get(&self, role: PostingRole) -> DomainResult<AccountId> {
        self.roles.get(&role).copied().ok_or_else(|| {
            DomainError::validation(format!("no ledger account configured for role {role:?}"))
        })
    }
}

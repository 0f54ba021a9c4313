use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use karatbook_core::{AccountId, DomainError, DomainResult, Entity, OrganizationId};

/// High-level account kind (determines normal balance side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Asset,
    Liability,
    Equity,
    Income,
    Expense,
}

/// Side of a posting line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Debit,
    Credit,
}

impl AccountKind {
    /// Side on which this kind of account normally carries its balance.
    pub fn normal_side(self) -> Side {
        match self {
            AccountKind::Asset | AccountKind::Expense => Side::Debit,
            AccountKind::Liability | AccountKind::Equity | AccountKind::Income => Side::Credit,
        }
    }

    /// Change to the account's balance caused by posting `amount` on `side`.
    ///
    /// Positive when the posting lands on the normal side.
    pub fn signed_delta(self, side: Side, amount: Decimal) -> Decimal {
        if side == self.normal_side() {
            amount
        } else {
            -amount
        }
    }

    /// Balance implied by gross debit/credit totals.
    pub fn balance_from_totals(self, debit_total: Decimal, credit_total: Decimal) -> Decimal {
        match self.normal_side() {
            Side::Debit => debit_total - credit_total,
            Side::Credit => credit_total - debit_total,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccountKind::Asset => "asset",
            AccountKind::Liability => "liability",
            AccountKind::Equity => "equity",
            AccountKind::Income => "income",
            AccountKind::Expense => "expense",
        }
    }
}

impl core::str::FromStr for AccountKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asset" => Ok(AccountKind::Asset),
            "liability" => Ok(AccountKind::Liability),
            "equity" => Ok(AccountKind::Equity),
            // "revenue" is what most of the screens call it
            "income" | "revenue" => Ok(AccountKind::Income),
            "expense" => Ok(AccountKind::Expense),
            other => Err(DomainError::validation(format!(
                "unknown account kind '{other}' (expected asset, liability, equity, income or expense)"
            ))),
        }
    }
}

/// Chart-of-accounts entry with its cached running balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerAccount {
    pub id: AccountId,
    pub organization_id: OrganizationId,
    pub code: String, // e.g. "1000"
    pub name: String, // e.g. "Cash"
    pub kind: AccountKind,
    /// Signed by the normal side of `kind`; only posting changes it.
    pub current_balance: Decimal,
}

impl LedgerAccount {
    pub fn open(
        organization_id: OrganizationId,
        code: impl Into<String>,
        name: impl Into<String>,
        kind: AccountKind,
    ) -> DomainResult<Self> {
        let code = code.into().trim().to_string();
        let name = name.into().trim().to_string();
        if code.is_empty() {
            return Err(DomainError::validation("account code must not be empty"));
        }
        if name.is_empty() {
            return Err(DomainError::validation("account name must not be empty"));
        }
        Ok(Self {
            id: AccountId::new(),
            organization_id,
            code,
            name,
            kind,
            current_balance: Decimal::ZERO,
        })
    }
}

impl Entity for LedgerAccount {
    type Id = AccountId;

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

    #[test]
    fn debit_normal_kinds_grow_on_debit() {
        let amt = Decimal::new(250, 0);
        assert_eq!(AccountKind::Asset.signed_delta(Side::Debit, amt), amt);
        assert_eq!(AccountKind::Expense.signed_delta(Side::Credit, amt), -amt);
    }

    #[test]
    fn credit_normal_kinds_grow_on_credit() {
        let amt = Decimal::new(250, 0);
        for kind in [AccountKind::Liability, AccountKind::Equity, AccountKind::Income] {
            assert_eq!(kind.signed_delta(Side::Credit, amt), amt);
            assert_eq!(kind.signed_delta(Side::Debit, amt), -amt);
        }
    }

    #[test]
    fn parses_revenue_alias() {
        assert_eq!("Revenue".parse::<AccountKind>().unwrap(), AccountKind::Income);
        assert!("stock".parse::<AccountKind>().is_err());
    }

    #[test]
    fn open_rejects_blank_code() {
        let err = LedgerAccount::open(OrganizationId::new(), "  ", "Cash", AccountKind::Asset)
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}

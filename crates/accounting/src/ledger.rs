use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use karatbook_core::{
    AccountId, Amount, DocumentId, DomainError, DomainResult, Entity, EntryId, OrganizationId,
};

use crate::account::{AccountKind, Side};

/// Kind of transactional document a ledger entry was generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Sale,
    PurchaseReceipt,
    Voucher,
    AdvancePayment,
}

/// Back-reference from a ledger entry to the document that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub kind: DocumentKind,
    pub id: DocumentId,
}

/// One requested posting line, as received from a caller.
///
/// Exactly one of `debit` / `credit` must be set; `validate` enforces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingLineInput {
    pub account_id: AccountId,
    #[serde(default)]
    pub debit: Option<Decimal>,
    #[serde(default)]
    pub credit: Option<Decimal>,
}

impl PostingLineInput {
    pub fn debit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: Some(amount),
            credit: None,
        }
    }

    pub fn credit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: None,
            credit: Some(amount),
        }
    }
}

/// A validated posting line (immutable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingLine {
    pub account_id: AccountId,
    pub side: Side,
    /// Strictly positive.
    pub amount: Amount,
}

/// Command: post (or draft) a journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostEntry {
    pub organization_id: OrganizationId,
    pub date: NaiveDate,
    pub narration: String,
    pub lines: Vec<PostingLineInput>,
    #[serde(default)]
    pub source: Option<SourceDocument>,
}

impl PostEntry {
    pub fn new(
        organization_id: OrganizationId,
        date: NaiveDate,
        narration: impl Into<String>,
        lines: Vec<PostingLineInput>,
    ) -> Self {
        Self {
            organization_id,
            date,
            narration: narration.into(),
            lines,
            source: None,
        }
    }

    pub fn with_source(mut self, kind: DocumentKind, id: DocumentId) -> Self {
        self.source = Some(SourceDocument { kind, id });
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Draft,
    Posted,
}

/// Journal header row (`ledger_entries`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub organization_id: OrganizationId,
    pub date: NaiveDate,
    pub narration: String,
    pub status: EntryStatus,
    pub source_kind: Option<DocumentKind>,
    pub source_id: Option<DocumentId>,
}

impl Entity for LedgerEntry {
    type Id = EntryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }
}

/// Journal line row (`ledger_entry_details`). Exactly one of debit/credit is non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntryDetail {
    pub id: Uuid,
    pub organization_id: OrganizationId,
    pub entry_id: EntryId,
    pub account_id: AccountId,
    pub debit: Decimal,
    pub credit: Decimal,
}

impl LedgerEntryDetail {
    pub fn side(&self) -> Side {
        if self.debit > Decimal::ZERO {
            Side::Debit
        } else {
            Side::Credit
        }
    }

    pub fn amount(&self) -> Decimal {
        self.debit.max(self.credit)
    }
}

/// A posting that passed validation and is ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedEntry {
    pub organization_id: OrganizationId,
    pub date: NaiveDate,
    pub narration: String,
    pub lines: Vec<PostingLine>,
    pub source: Option<SourceDocument>,
    /// Sum of the debit side (equal to the credit side).
    pub total: Decimal,
}

/// Validate a posting request without touching any storage.
///
/// Rejects empty entries, lines with both or neither side set, non-positive
/// amounts and entries whose debits and credits differ (exact comparison).
pub fn validate(cmd: &PostEntry) -> DomainResult<ValidatedEntry> {
    if cmd.lines.is_empty() {
        return Err(DomainError::validation("journal entry must have lines"));
    }

    let mut lines = Vec::with_capacity(cmd.lines.len());
    let mut debit_total = Decimal::ZERO;
    let mut credit_total = Decimal::ZERO;

    for (idx, line) in cmd.lines.iter().enumerate() {
        let (side, raw) = match (line.debit, line.credit) {
            (Some(d), None) => (Side::Debit, d),
            (None, Some(c)) => (Side::Credit, c),
            (Some(_), Some(_)) => {
                return Err(DomainError::validation(format!(
                    "line {idx}: set either debit or credit, not both"
                )));
            }
            (None, None) => {
                return Err(DomainError::validation(format!(
                    "line {idx}: debit or credit is required"
                )));
            }
        };

        if raw <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "line {idx}: amount must be positive (got {raw})"
            )));
        }
        let amount = Amount::new(raw)?;

        let total = match side {
            Side::Debit => &mut debit_total,
            Side::Credit => &mut credit_total,
        };
        *total = total
            .checked_add(raw)
            .ok_or_else(|| DomainError::validation("entry total overflow"))?;

        lines.push(PostingLine {
            account_id: line.account_id,
            side,
            amount,
        });
    }

    if debit_total != credit_total {
        return Err(DomainError::validation(format!(
            "debits must equal credits (debits {debit_total}, credits {credit_total})"
        )));
    }

    Ok(ValidatedEntry {
        organization_id: cmd.organization_id,
        date: cmd.date,
        narration: cmd.narration.trim().to_string(),
        lines,
        source: cmd.source,
        total: debit_total,
    })
}

impl ValidatedEntry {
    /// Distinct accounts referenced by the entry.
    pub fn account_ids(&self) -> BTreeSet<AccountId> {
        self.lines.iter().map(|l| l.account_id).collect()
    }

    /// Materialise the header and detail rows for this entry.
    pub fn into_records(
        self,
        entry_id: EntryId,
        status: EntryStatus,
    ) -> (LedgerEntry, Vec<LedgerEntryDetail>) {
        let details = self
            .lines
            .iter()
            .map(|line| {
                let (debit, credit) = match line.side {
                    Side::Debit => (line.amount.value(), Decimal::ZERO),
                    Side::Credit => (Decimal::ZERO, line.amount.value()),
                };
                LedgerEntryDetail {
                    id: Uuid::now_v7(),
                    organization_id: self.organization_id,
                    entry_id,
                    account_id: line.account_id,
                    debit,
                    credit,
                }
            })
            .collect();

        let entry = LedgerEntry {
            id: entry_id,
            organization_id: self.organization_id,
            date: self.date,
            narration: self.narration,
            status,
            source_kind: self.source.map(|s| s.kind),
            source_id: self.source.map(|s| s.id),
        };

        (entry, details)
    }
}

/// Per-account change to the cached balance caused by posting `details`.
///
/// Every referenced account must be present in `kinds`.
pub fn balance_deltas(
    details: &[LedgerEntryDetail],
    kinds: &HashMap<AccountId, AccountKind>,
) -> DomainResult<BTreeMap<AccountId, Decimal>> {
    let mut deltas: BTreeMap<AccountId, Decimal> = BTreeMap::new();
    for detail in details {
        let kind = kinds.get(&detail.account_id).ok_or_else(|| {
            DomainError::validation(format!("unknown ledger account {}", detail.account_id))
        })?;
        let delta = deltas.entry(detail.account_id).or_insert(Decimal::ZERO);
        *delta = delta
            .checked_add(kind.signed_delta(detail.side(), detail.amount()))
            .ok_or_else(|| {
                DomainError::validation(format!("balance overflow on account {}", detail.account_id))
            })?;
    }
    Ok(deltas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    }

    fn dec(units: i64) -> Decimal {
        Decimal::new(units, 0)
    }

    fn entry(lines: Vec<PostingLineInput>) -> PostEntry {
        PostEntry::new(OrganizationId::new(), test_date(), "test entry", lines)
    }

    #[test]
    fn balanced_entry_validates() {
        let cash = AccountId::new();
        let sales = AccountId::new();
        let cmd = entry(vec![
            PostingLineInput::debit(cash, dec(1000)),
            PostingLineInput::credit(sales, dec(1000)),
        ]);

        let validated = validate(&cmd).unwrap();
        assert_eq!(validated.total, dec(1000));
        assert_eq!(validated.lines.len(), 2);
        assert_eq!(validated.lines[0].side, Side::Debit);
    }

    #[test]
    fn unbalanced_entry_is_rejected() {
        let cmd = entry(vec![
            PostingLineInput::debit(AccountId::new(), dec(500)),
            PostingLineInput::credit(AccountId::new(), dec(400)),
        ]);

        match validate(&cmd).unwrap_err() {
            DomainError::Validation(msg) if msg.contains("debits must equal credits") => {}
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn empty_entry_is_rejected() {
        assert!(matches!(
            validate(&entry(vec![])),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn line_with_both_sides_is_rejected() {
        let account = AccountId::new();
        let cmd = entry(vec![PostingLineInput {
            account_id: account,
            debit: Some(dec(10)),
            credit: Some(dec(10)),
        }]);
        let err = validate(&cmd).unwrap_err();
        assert!(err.to_string().contains("not both"));
    }

    #[test]
    fn line_with_neither_side_is_rejected() {
        let cmd = entry(vec![PostingLineInput {
            account_id: AccountId::new(),
            debit: None,
            credit: None,
        }]);
        let err = validate(&cmd).unwrap_err();
        assert!(err.to_string().contains("required"));
    }

    #[test]
    fn zero_and_negative_amounts_are_rejected() {
        for bad in [Decimal::ZERO, dec(-5)] {
            let cmd = entry(vec![
                PostingLineInput::debit(AccountId::new(), bad),
                PostingLineInput::credit(AccountId::new(), bad),
            ]);
            assert!(matches!(validate(&cmd), Err(DomainError::Validation(_))));
        }
    }

    #[test]
    fn fractional_amounts_compare_exactly() {
        // 0.1 + 0.2 must equal 0.3 exactly; with floats it would not.
        let cmd = entry(vec![
            PostingLineInput::debit(AccountId::new(), Decimal::new(1, 1)),
            PostingLineInput::debit(AccountId::new(), Decimal::new(2, 1)),
            PostingLineInput::credit(AccountId::new(), Decimal::new(3, 1)),
        ]);
        assert!(validate(&cmd).is_ok());
    }

    #[test]
    fn records_carry_source_reference() {
        let doc = DocumentId::new();
        let cmd = entry(vec![
            PostingLineInput::debit(AccountId::new(), dec(5)),
            PostingLineInput::credit(AccountId::new(), dec(5)),
        ])
        .with_source(DocumentKind::Sale, doc);

        let (header, details) = validate(&cmd)
            .unwrap()
            .into_records(EntryId::new(), EntryStatus::Posted);
        assert_eq!(header.source_kind, Some(DocumentKind::Sale));
        assert_eq!(header.source_id, Some(doc));
        assert!(details.iter().all(|d| d.entry_id == header.id));
    }

    #[test]
    fn deltas_follow_normal_side() {
        let cash = AccountId::new();
        let capital = AccountId::new();
        let kinds = HashMap::from([(cash, AccountKind::Asset), (capital, AccountKind::Equity)]);
        let cmd = entry(vec![
            PostingLineInput::debit(cash, dec(700)),
            PostingLineInput::credit(capital, dec(700)),
        ]);
        let (_, details) = validate(&cmd)
            .unwrap()
            .into_records(EntryId::new(), EntryStatus::Posted);

        let deltas = balance_deltas(&details, &kinds).unwrap();
        assert_eq!(deltas[&cash], dec(700));
        assert_eq!(deltas[&capital], dec(700));
    }

    #[test]
    fn deltas_reject_unknown_account() {
        let cmd = entry(vec![
            PostingLineInput::debit(AccountId::new(), dec(1)),
            PostingLineInput::credit(AccountId::new(), dec(1)),
        ]);
        let (_, details) = validate(&cmd)
            .unwrap()
            .into_records(EntryId::new(), EntryStatus::Posted);
        assert!(balance_deltas(&details, &HashMap::new()).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Any entry built from split amounts balances and its detail rows
        /// keep debits equal to credits.
        #[test]
        fn split_entries_balance(
            parts in prop::collection::vec(1i64..5_000_000i64, 1..8)
        ) {
            let credit_account = AccountId::new();
            let total: i64 = parts.iter().sum();
            let mut lines: Vec<PostingLineInput> = parts
                .iter()
                .map(|p| PostingLineInput::debit(AccountId::new(), Decimal::new(*p, 2)))
                .collect();
            lines.push(PostingLineInput::credit(credit_account, Decimal::new(total, 2)));

            let validated = validate(&entry(lines)).unwrap();
            let (_, details) = validated.into_records(EntryId::new(), EntryStatus::Posted);

            let debits: Decimal = details.iter().map(|d| d.debit).sum();
            let credits: Decimal = details.iter().map(|d| d.credit).sum();
            prop_assert_eq!(debits, credits);
            prop_assert!(details.iter().all(|d| d.debit.is_zero() != d.credit.is_zero()));
        }

        /// Any mismatch between the two sides is rejected.
        #[test]
        fn mismatched_entries_are_rejected(
            debit in 1i64..1_000_000i64,
            skew in 1i64..1_000i64,
        ) {
            let cmd = entry(vec![
                PostingLineInput::debit(AccountId::new(), Decimal::new(debit, 2)),
                PostingLineInput::credit(AccountId::new(), Decimal::new(debit + skew, 2)),
            ]);
            prop_assert!(validate(&cmd).is_err());
        }
    }
}

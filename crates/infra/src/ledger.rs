//! Ledger application service: chart of accounts, posting and reports.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;
use tracing::{info, instrument};

use karatbook_accounting::{
    AccountKind, BalanceDrift, EntryStatus, LedgerAccount, LedgerEntry, LedgerEntryDetail,
    PostEntry, PostingAccounts, PostingRole, ProfitAndLoss, TrialBalance, ValidatedEntry,
    balance_deltas, balance_drift, profit_and_loss, trial_balance, validate,
};
use karatbook_core::{AccountId, DomainError, EntryId, OrganizationId};

use crate::error::{ServiceResult, store_step};
use crate::records::{entity_row, from_row, from_rows, to_row};
use crate::store::{DataStore, Delta, Filter, NamedOperation, Table, WriteBatch};

#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn DataStore>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, code, name), fields(organization_id = %organization_id), err)]
    pub async fn create_account(
        &self,
        organization_id: OrganizationId,
        code: &str,
        name: &str,
        kind: AccountKind,
    ) -> ServiceResult<LedgerAccount> {
        let account = LedgerAccount::open(organization_id, code, name, kind)?;

        let existing = self
            .store
            .select(
                Table::LedgerAccounts,
                Filter::organization(organization_id).eq("code", &account.code),
            )
            .await
            .map_err(store_step("load ledger account by code"))?;
        if !existing.is_empty() {
            return Err(DomainError::conflict(format!(
                "account code {} already exists",
                account.code
            ))
            .into());
        }

        let mut batch = WriteBatch::new();
        batch.insert(
            Table::LedgerAccounts,
            entity_row(Table::LedgerAccounts, &account).map_err(store_step("encode ledger account"))?,
        );
        self.store
            .commit(batch)
            .await
            .map_err(store_step("insert ledger account"))?;

        info!(account_id = %account.id, code = %account.code, "ledger account created");
        Ok(account)
    }

    /// All accounts of the organization, ordered by code.
    pub async fn list_accounts(
        &self,
        organization_id: OrganizationId,
    ) -> ServiceResult<Vec<LedgerAccount>> {
        let rows = self
            .store
            .select(
                Table::LedgerAccounts,
                Filter::organization(organization_id).order_by("code"),
            )
            .await
            .map_err(store_step("load ledger accounts"))?;
        Ok(from_rows(Table::LedgerAccounts, rows).map_err(store_step("decode ledger accounts"))?)
    }

    /// Open the default account for every posting role whose code is not
    /// taken yet. Safe to call repeatedly.
    #[instrument(skip(self), fields(organization_id = %organization_id), err)]
    pub async fn seed_default_chart(
        &self,
        organization_id: OrganizationId,
    ) -> ServiceResult<Vec<LedgerAccount>> {
        let existing: Vec<String> = self
            .list_accounts(organization_id)
            .await?
            .into_iter()
            .map(|a| a.code)
            .collect();

        for role in PostingRole::ALL {
            let (code, name, kind) = role.default_account();
            if !existing.iter().any(|c| c == code) {
                self.create_account(organization_id, code, name, kind).await?;
            }
        }
        self.list_accounts(organization_id).await
    }

    /// Resolve posting roles to accounts by their default codes.
    pub async fn posting_accounts(
        &self,
        organization_id: OrganizationId,
    ) -> ServiceResult<PostingAccounts> {
        let by_code: HashMap<String, AccountId> = self
            .list_accounts(organization_id)
            .await?
            .into_iter()
            .map(|a| (a.code, a.id))
            .collect();

        let mut accounts = PostingAccounts::new();
        for role in PostingRole::ALL {
            if let Some(id) = by_code.get(role.default_account().0) {
                accounts.set(role, *id);
            }
        }
        Ok(accounts)
    }

    /// Add the rows of a validated entry to `batch`. Posted entries also
    /// carry one balance increment per affected account.
    pub(crate) async fn stage_entry(
        &self,
        entry: ValidatedEntry,
        status: EntryStatus,
        batch: &mut WriteBatch,
    ) -> ServiceResult<EntryId> {
        let kinds = self.account_kinds(entry.organization_id).await?;
        for account_id in entry.account_ids() {
            if !kinds.contains_key(&account_id) {
                return Err(DomainError::validation(format!(
                    "unknown ledger account {account_id}"
                ))
                .into());
            }
        }

        let entry_id = EntryId::new();
        let (header, details) = entry.into_records(entry_id, status);

        batch.insert(
            Table::LedgerEntries,
            to_row(Table::LedgerEntries, &header).map_err(store_step("encode ledger entry"))?,
        );
        for detail in &details {
            batch.insert(
                Table::LedgerEntryDetails,
                to_row(Table::LedgerEntryDetails, detail)
                    .map_err(store_step("encode ledger entry detail"))?,
            );
        }

        if status == EntryStatus::Posted {
            for (account_id, delta) in balance_deltas(&details, &kinds)? {
                batch.increment(
                    Table::LedgerAccounts,
                    account_id,
                    "current_balance",
                    Delta::Decimal(delta),
                );
            }
        }
        Ok(entry_id)
    }

    async fn account_kinds(
        &self,
        organization_id: OrganizationId,
    ) -> ServiceResult<HashMap<AccountId, AccountKind>> {
        Ok(self
            .list_accounts(organization_id)
            .await?
            .into_iter()
            .map(|a| (a.id, a.kind))
            .collect())
    }

    async fn write_entry(&self, cmd: &PostEntry, status: EntryStatus) -> ServiceResult<EntryId> {
        let validated = validate(cmd)?;
        let mut batch = WriteBatch::new();
        let entry_id = self.stage_entry(validated, status, &mut batch).await?;
        self.store
            .commit(batch)
            .await
            .map_err(store_step("commit ledger entry"))?;
        Ok(entry_id)
    }

    /// Validate and post a balanced entry in one atomic batch.
    #[instrument(
        skip(self, cmd),
        fields(organization_id = %cmd.organization_id, lines = cmd.lines.len()),
        err
    )]
    pub async fn post_entry(&self, cmd: &PostEntry) -> ServiceResult<EntryId> {
        let entry_id = self.write_entry(cmd, EntryStatus::Posted).await?;
        info!(entry_id = %entry_id, "ledger entry posted");
        Ok(entry_id)
    }

    /// Store a validated entry as a draft. Balances are untouched.
    #[instrument(skip(self, cmd), fields(organization_id = %cmd.organization_id), err)]
    pub async fn save_draft(&self, cmd: &PostEntry) -> ServiceResult<EntryId> {
        let entry_id = self.write_entry(cmd, EntryStatus::Draft).await?;
        info!(entry_id = %entry_id, "draft entry saved");
        Ok(entry_id)
    }

    /// Header and lines of one entry.
    pub async fn get_entry(
        &self,
        organization_id: OrganizationId,
        entry_id: EntryId,
    ) -> ServiceResult<(LedgerEntry, Vec<LedgerEntryDetail>)> {
        let header = self
            .store
            .select(
                Table::LedgerEntries,
                Filter::organization(organization_id).eq("id", entry_id),
            )
            .await
            .map_err(store_step("load ledger entry"))?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::not_found(format!("ledger entry {entry_id}")))?;
        let header: LedgerEntry =
            from_row(Table::LedgerEntries, header).map_err(store_step("decode ledger entry"))?;

        let details = self
            .store
            .select(
                Table::LedgerEntryDetails,
                Filter::organization(organization_id).eq("entry_id", entry_id),
            )
            .await
            .map_err(store_step("load ledger entry details"))?;
        let details = from_rows(Table::LedgerEntryDetails, details)
            .map_err(store_step("decode ledger entry details"))?;
        Ok((header, details))
    }

    /// Flip a draft to posted and apply its balance increments atomically.
    #[instrument(skip(self), fields(organization_id = %organization_id, entry_id = %entry_id), err)]
    pub async fn post_draft(
        &self,
        organization_id: OrganizationId,
        entry_id: EntryId,
    ) -> ServiceResult<()> {
        let (header, details) = self.get_entry(organization_id, entry_id).await?;
        if header.status == EntryStatus::Posted {
            return Err(DomainError::conflict(format!("entry {entry_id} is already posted")).into());
        }

        let kinds = self.account_kinds(organization_id).await?;
        let mut batch = WriteBatch::new();
        // Matching on the draft status makes a concurrent second post fail the batch.
        batch.update(
            Table::LedgerEntries,
            Filter::organization(organization_id)
                .eq("id", entry_id)
                .eq("status", "draft"),
            vec![("status", json!("posted"))],
            Some(1),
        );
        for (account_id, delta) in balance_deltas(&details, &kinds)? {
            batch.increment(
                Table::LedgerAccounts,
                account_id,
                "current_balance",
                Delta::Decimal(delta),
            );
        }
        self.store
            .commit(batch)
            .await
            .map_err(store_step("post draft entry"))?;

        info!("draft entry posted");
        Ok(())
    }

    #[instrument(skip(self), fields(organization_id = %organization_id), err)]
    pub async fn trial_balance(
        &self,
        organization_id: OrganizationId,
        as_of: NaiveDate,
    ) -> ServiceResult<TrialBalance> {
        let accounts = self.list_accounts(organization_id).await?;
        let movements = self
            .store
            .account_movements(organization_id, None, as_of)
            .await
            .map_err(store_step("aggregate account movements"))?;
        Ok(trial_balance(as_of, &accounts, &movements)?)
    }

    #[instrument(skip(self), fields(organization_id = %organization_id), err)]
    pub async fn profit_and_loss(
        &self,
        organization_id: OrganizationId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ServiceResult<ProfitAndLoss> {
        if from > to {
            return Err(DomainError::validation(format!(
                "period start {from} is after period end {to}"
            ))
            .into());
        }
        let accounts = self.list_accounts(organization_id).await?;
        let movements = self
            .store
            .account_movements(organization_id, Some(from), to)
            .await
            .map_err(store_step("aggregate account movements"))?;
        Ok(profit_and_loss(from, to, &accounts, &movements)?)
    }

    /// Accounts whose cached balance disagrees with their posted details.
    #[instrument(skip(self), fields(organization_id = %organization_id), err)]
    pub async fn audit_balances(
        &self,
        organization_id: OrganizationId,
    ) -> ServiceResult<Vec<BalanceDrift>> {
        let accounts = self.list_accounts(organization_id).await?;
        let movements = self
            .store
            .account_movements(organization_id, None, NaiveDate::MAX)
            .await
            .map_err(store_step("aggregate account movements"))?;
        let drift = balance_drift(&accounts, &movements)?;
        if !drift.is_empty() {
            tracing::warn!(accounts = drift.len(), "cached balances drifted from ledger");
        }
        Ok(drift)
    }

    /// Rewrite cached balances from posted details.
    #[instrument(skip(self), fields(organization_id = %organization_id), err)]
    pub async fn repair_balances(&self, organization_id: OrganizationId) -> ServiceResult<u64> {
        let touched = self
            .store
            .call(NamedOperation::RecomputeAccountBalances { organization_id })
            .await
            .map_err(store_step("recompute account balances"))?;
        info!(accounts = touched, "account balances recomputed");
        Ok(touched)
    }
}

use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;
use std::sync::RwLock;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use karatbook_accounting::{
    AccountMovement, EntryStatus, LedgerAccount, LedgerEntry, LedgerEntryDetail,
    movements_from_details,
};
use karatbook_core::OrganizationId;

use super::schema::{FOREIGN_KEYS, UNIQUE_KEYS};
use super::{
    DataStore, Delta, Filter, NamedOperation, Row, StoreError, StoreResult, Table, WriteBatch,
    WriteOp, value_text,
};

type Tables = HashMap<Table, Vec<Row>>;

/// In-memory relational store.
///
/// Intended for tests/dev. Not optimized for performance: every write batch
/// clones the table set, applies its ops and swaps the result in under one
/// write lock, so batches are atomic and serialised.
#[derive(Debug)]
pub struct InMemoryDataStore {
    tables: RwLock<Tables>,
}

impl Default for InMemoryDataStore {
    fn default() -> Self {
        Self::with_tables(&Table::ALL)
    }
}

impl InMemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that only knows `tables`; every other table reports
    /// [`StoreError::MissingRelation`].
    pub fn with_tables(tables: &[Table]) -> Self {
        Self {
            tables: RwLock::new(tables.iter().map(|t| (*t, Vec::new())).collect()),
        }
    }

    /// Number of rows currently in `table` (all organizations).
    pub fn row_count(&self, table: Table) -> StoreResult<usize> {
        let tables = self.read()?;
        Ok(rows(&tables, table)?.len())
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

fn rows(tables: &Tables, table: Table) -> StoreResult<&Vec<Row>> {
    tables.get(&table).ok_or(StoreError::MissingRelation(table))
}

fn rows_mut(tables: &mut Tables, table: Table) -> StoreResult<&mut Vec<Row>> {
    tables
        .get_mut(&table)
        .ok_or(StoreError::MissingRelation(table))
}

fn column_text(row: &Row, column: &str) -> Option<String> {
    row.get(column).and_then(value_text)
}

fn insert(tables: &mut Tables, table: Table, row: Row) -> StoreResult<()> {
    let id = column_text(&row, "id").ok_or_else(|| StoreError::Conflict {
        table,
        detail: "row has no id".to_string(),
    })?;

    let existing = rows(tables, table)?;
    if existing
        .iter()
        .any(|r| column_text(r, "id").as_deref() == Some(id.as_str()))
    {
        return Err(StoreError::Conflict {
            table,
            detail: format!("duplicate id {id}"),
        });
    }

    for (_, columns) in UNIQUE_KEYS.iter().filter(|(t, _)| *t == table) {
        let key: Option<Vec<String>> = columns.iter().map(|c| column_text(&row, c)).collect();
        let Some(key) = key else { continue };
        let clash = existing.iter().any(|r| {
            columns
                .iter()
                .zip(&key)
                .all(|(c, v)| column_text(r, c).as_deref() == Some(v.as_str()))
        });
        if clash {
            return Err(StoreError::Conflict {
                table,
                detail: format!("duplicate ({}) = ({})", columns.join(", "), key.join(", ")),
            });
        }
    }

    for fk in FOREIGN_KEYS.iter().filter(|fk| fk.child == table) {
        let Some(parent_id) = column_text(&row, fk.column) else {
            continue;
        };
        // A store built without the parent relation has no constraint to check.
        let Some(parents) = tables.get(&fk.parent) else {
            continue;
        };
        if !parents
            .iter()
            .any(|p| column_text(p, "id").as_deref() == Some(parent_id.as_str()))
        {
            return Err(StoreError::ForeignKeyViolation {
                table,
                detail: format!(
                    "{}.{} = {parent_id} is not present in {}",
                    table, fk.column, fk.parent
                ),
            });
        }
    }

    rows_mut(tables, table)?.push(row);
    Ok(())
}

fn apply_delta(table: Table, column: &str, current: Option<&Value>, by: Delta) -> StoreResult<Value> {
    let decode = |detail: String| StoreError::Decode { table, detail };
    match by {
        Delta::Decimal(by) => {
            let current = match current {
                Some(Value::String(s)) => Decimal::from_str(s)
                    .map_err(|e| decode(format!("{column}: {e}")))?,
                Some(Value::Number(n)) => Decimal::from_str(&n.to_string())
                    .map_err(|e| decode(format!("{column}: {e}")))?,
                Some(Value::Null) | None => Decimal::ZERO,
                Some(other) => return Err(decode(format!("{column}: not a decimal: {other}"))),
            };
            let next = current
                .checked_add(by)
                .ok_or_else(|| decode(format!("{column}: decimal overflow")))?;
            Ok(Value::String(next.normalize().to_string()))
        }
        Delta::Integer(by) => {
            let current = match current {
                Some(Value::Null) | None => 0,
                Some(v) => v
                    .as_i64()
                    .ok_or_else(|| decode(format!("{column}: not an integer: {v}")))?,
            };
            let next = current
                .checked_add(by)
                .ok_or_else(|| decode(format!("{column}: integer overflow")))?;
            Ok(Value::from(next))
        }
    }
}

fn increment(
    tables: &mut Tables,
    table: Table,
    id: Uuid,
    column: &'static str,
    by: Delta,
) -> StoreResult<()> {
    let id_text = id.to_string();
    let row = rows_mut(tables, table)?
        .iter_mut()
        .find(|r| column_text(r, "id").as_deref() == Some(id_text.as_str()))
        .ok_or(StoreError::MissingRow { table, id })?;
    let next = apply_delta(table, column, row.get(column), by)?;
    row.insert(column.to_string(), next);
    Ok(())
}

fn patch_rows(
    tables: &mut Tables,
    table: Table,
    filter: &Filter,
    patch: &[(&'static str, Value)],
) -> StoreResult<u64> {
    let mut updated = 0;
    for row in rows_mut(tables, table)?
        .iter_mut()
        .filter(|r| filter.matches(r))
    {
        for (column, value) in patch {
            row.insert((*column).to_string(), value.clone());
        }
        updated += 1;
    }
    Ok(updated)
}

fn decode_rows<'a, T: serde::de::DeserializeOwned>(
    table: Table,
    rows: impl IntoIterator<Item = &'a Row>,
) -> StoreResult<Vec<T>> {
    rows.into_iter()
        .map(|r| {
            serde_json::from_value(Value::Object(r.clone())).map_err(|e| StoreError::Decode {
                table,
                detail: e.to_string(),
            })
        })
        .collect()
}

fn movements(
    tables: &Tables,
    organization_id: OrganizationId,
    from: Option<NaiveDate>,
    to: NaiveDate,
) -> StoreResult<Vec<AccountMovement>> {
    let scoped = Filter::organization(organization_id);
    let entries: Vec<LedgerEntry> = decode_rows(
        Table::LedgerEntries,
        rows(tables, Table::LedgerEntries)?
            .iter()
            .filter(|r| scoped.matches(r)),
    )?;
    let in_window: HashSet<_> = entries
        .into_iter()
        .filter(|e| e.status == EntryStatus::Posted)
        .filter(|e| from.is_none_or(|from| e.date >= from) && e.date <= to)
        .map(|e| e.id)
        .collect();

    let details: Vec<LedgerEntryDetail> = decode_rows(
        Table::LedgerEntryDetails,
        rows(tables, Table::LedgerEntryDetails)?
            .iter()
            .filter(|r| scoped.matches(r)),
    )?;
    movements_from_details(details.iter().filter(|d| in_window.contains(&d.entry_id))).map_err(
        |e| StoreError::Decode {
            table: Table::LedgerEntryDetails,
            detail: e.to_string(),
        },
    )
}

#[async_trait::async_trait]
impl DataStore for InMemoryDataStore {
    async fn select(&self, table: Table, filter: Filter) -> StoreResult<Vec<Row>> {
        let tables = self.read()?;
        let mut out: Vec<Row> = rows(&tables, table)?
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        if let Some(column) = filter.order_by {
            out.sort_by(|a, b| column_text(a, column).cmp(&column_text(b, column)));
        }
        Ok(out)
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut tables = self.write()?;
        let mut staged = tables.clone();
        for op in batch.ops() {
            match op {
                WriteOp::Insert { table, row } => insert(&mut staged, *table, row.clone())?,
                WriteOp::Increment {
                    table,
                    id,
                    column,
                    by,
                } => increment(&mut staged, *table, *id, *column, *by)?,
                WriteOp::Update {
                    table,
                    filter,
                    patch,
                    expect,
                } => {
                    let updated = patch_rows(&mut staged, *table, filter, patch)?;
                    if let Some(expected) = expect {
                        if updated != *expected {
                            return Err(StoreError::Conflict {
                                table: *table,
                                detail: format!("expected {expected} row(s), matched {updated}"),
                            });
                        }
                    }
                }
            }
        }
        *tables = staged;
        Ok(())
    }

    async fn delete(&self, table: Table, filter: Filter) -> StoreResult<u64> {
        let mut tables = self.write()?;
        let doomed: HashSet<String> = rows(&tables, table)?
            .iter()
            .filter(|r| filter.matches(r))
            .filter_map(|r| column_text(r, "id"))
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }

        for fk in FOREIGN_KEYS.iter().filter(|fk| fk.parent == table) {
            let Some(children) = tables.get(&fk.child) else {
                continue;
            };
            if let Some(child) = children.iter().find(|c| {
                column_text(c, fk.column).is_some_and(|v| doomed.contains(&v))
            }) {
                return Err(StoreError::ForeignKeyViolation {
                    table,
                    detail: format!(
                        "row still referenced from {}.{} (child id {})",
                        fk.child,
                        fk.column,
                        column_text(child, "id").unwrap_or_default()
                    ),
                });
            }
        }

        let rows = rows_mut(&mut tables, table)?;
        let before = rows.len();
        rows.retain(|r| !filter.matches(r));
        Ok((before - rows.len()) as u64)
    }

    async fn update(
        &self,
        table: Table,
        filter: Filter,
        patch: Vec<(&'static str, Value)>,
    ) -> StoreResult<u64> {
        let mut tables = self.write()?;
        patch_rows(&mut tables, table, &filter, &patch)
    }

    async fn account_movements(
        &self,
        organization_id: OrganizationId,
        from: Option<NaiveDate>,
        to: NaiveDate,
    ) -> StoreResult<Vec<AccountMovement>> {
        let tables = self.read()?;
        movements(&tables, organization_id, from, to)
    }

    async fn call(&self, op: NamedOperation) -> StoreResult<u64> {
        match op {
            NamedOperation::Ping => Ok(1),
            NamedOperation::RecomputeAccountBalances { organization_id } => {
                let mut tables = self.write()?;
                let totals: BTreeMap<_, _> =
                    movements(&tables, organization_id, None, NaiveDate::MAX)?
                        .into_iter()
                        .map(|m| (m.account_id, m))
                        .collect();

                let org = organization_id.to_string();
                let mut touched = 0;
                for row in rows_mut(&mut tables, Table::LedgerAccounts)?
                    .iter_mut()
                    .filter(|r| column_text(r, "organization_id").as_deref() == Some(org.as_str()))
                {
                    let account: LedgerAccount = serde_json::from_value(Value::Object(row.clone()))
                        .map_err(|e| StoreError::Decode {
                            table: Table::LedgerAccounts,
                            detail: e.to_string(),
                        })?;
                    let balance = totals
                        .get(&account.id)
                        .map(|m| account.kind.balance_from_totals(m.debit_total, m.credit_total))
                        .unwrap_or(Decimal::ZERO);
                    row.insert(
                        "current_balance".to_string(),
                        Value::String(balance.to_string()),
                    );
                    touched += 1;
                }
                Ok(touched)
            }
        }
    }
}

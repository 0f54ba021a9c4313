//! Postgres-backed [`DataStore`].
//!
//! Rows are moved in and out as `jsonb`: reads use `to_jsonb(t)` (numeric
//! columns re-rendered as text so decimals round-trip exactly), writes use
//! `jsonb_populate_record` so values are always bound, never interpolated.
//! Table names come from [`Table`] and column names from `&'static str`s in
//! code.
//!
//! ## Error Mapping
//!
//! | PostgreSQL code | StoreError |
//! |-----------------|------------|
//! | `42P01` undefined table | `MissingRelation` |
//! | `23503` foreign key violation | `ForeignKeyViolation` |
//! | `23505` unique violation | `Conflict` |
//! | anything else | `Backend` |

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row as _};
use tracing::{info, instrument};
use uuid::Uuid;

use karatbook_accounting::AccountMovement;
use karatbook_core::{AccountId, OrganizationId};

use super::schema::decimal_columns;
use super::{
    DataStore, Delta, Filter, NamedOperation, Row, StoreError, StoreResult, Table, WriteBatch,
    WriteOp,
};

#[derive(Debug, Clone)]
pub struct PostgresDataStore {
    pool: Arc<PgPool>,
}

impl PostgresDataStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    #[instrument(skip(database_url), err)]
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Backend(format!("failed to connect: {e}")))?;
        Ok(Self::new(pool))
    }

    /// Apply the versioned schema migrations shipped with this crate.
    #[instrument(skip(self), err)]
    pub async fn run_migrations(&self) -> StoreResult<()> {
        info!("running database migrations");
        sqlx::migrate!("./migrations")
            .run(&*self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("migration failed: {e}")))?;
        info!("database migrations completed");
        Ok(())
    }
}

fn map_sqlx_error(table: Table, operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let detail = format!("{operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("42P01") => StoreError::MissingRelation(table),
                Some("23503") => StoreError::ForeignKeyViolation { table, detail },
                Some("23505") => StoreError::Conflict { table, detail },
                _ => StoreError::Backend(format!("database error on {table}: {detail}")),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Backend(format!("sqlx error in {operation} on {table}: {other}")),
    }
}

fn quote(column: &str) -> StoreResult<String> {
    let valid = !column.is_empty()
        && column
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(format!("\"{column}\""))
    } else {
        Err(StoreError::Backend(format!("invalid column name {column:?}")))
    }
}

/// `WHERE` clause over alias `t`, placeholders starting at `$first`.
fn where_clause(filter: &Filter, first: usize) -> StoreResult<String> {
    if filter.eq.is_empty() {
        return Ok(String::new());
    }
    let conditions = filter
        .eq
        .iter()
        .enumerate()
        .map(|(i, (column, _))| Ok(format!("t.{}::text = ${}", quote(column)?, first + i)))
        .collect::<StoreResult<Vec<_>>>()?;
    Ok(format!(" WHERE {}", conditions.join(" AND ")))
}

fn bind_filter<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    filter: &'q Filter,
) -> Query<'q, Postgres, PgArguments> {
    for (_, value) in &filter.eq {
        query = query.bind(value.as_str());
    }
    query
}

fn select_sql(table: Table, filter: &Filter) -> StoreResult<String> {
    let mut projection = "to_jsonb(t)".to_string();
    let decimals = decimal_columns(table);
    if !decimals.is_empty() {
        let pairs = decimals
            .iter()
            .map(|c| Ok(format!("'{c}', t.{}::text", quote(c)?)))
            .collect::<StoreResult<Vec<_>>>()?;
        projection = format!("{projection} || jsonb_build_object({})", pairs.join(", "));
    }
    let mut sql = format!(
        "SELECT {projection} AS row FROM {} t{}",
        table.name(),
        where_clause(filter, 1)?
    );
    if let Some(column) = filter.order_by {
        sql.push_str(&format!(" ORDER BY t.{}", quote(column)?));
    }
    Ok(sql)
}

fn insert_sql(table: Table, row: &Row) -> StoreResult<String> {
    let columns = row
        .keys()
        .map(|k| quote(k))
        .collect::<StoreResult<Vec<_>>>()?
        .join(", ");
    Ok(format!(
        "INSERT INTO {t} ({columns}) SELECT {columns} FROM jsonb_populate_record(NULL::{t}, $1)",
        t = table.name()
    ))
}

fn update_sql(table: Table, filter: &Filter, patch: &[(&'static str, Value)]) -> StoreResult<String> {
    let assignments = patch
        .iter()
        .map(|(c, _)| {
            let c = quote(c)?;
            Ok(format!("{c} = r.{c}"))
        })
        .collect::<StoreResult<Vec<_>>>()?
        .join(", ");
    Ok(format!(
        "UPDATE {t} AS t SET {assignments} FROM jsonb_populate_record(NULL::{t}, $1) AS r{}",
        where_clause(filter, 2)?,
        t = table.name()
    ))
}

fn patch_object(patch: &[(&'static str, Value)]) -> Value {
    Value::Object(
        patch
            .iter()
            .map(|(c, v)| ((*c).to_string(), v.clone()))
            .collect(),
    )
}

const MOVEMENTS_SQL: &str = r#"
    SELECT d.account_id, SUM(d.debit) AS debit_total, SUM(d.credit) AS credit_total
    FROM ledger_entry_details d
    JOIN ledger_entries e ON e.id = d.entry_id
    WHERE e.organization_id = $1
      AND e.status = 'posted'
      AND ($2::date IS NULL OR e.date >= $2)
      AND ($3::date IS NULL OR e.date <= $3)
    GROUP BY d.account_id
    ORDER BY d.account_id
"#;

const RECOMPUTE_BALANCES_SQL: &str = r#"
    UPDATE ledger_accounts a
    SET current_balance = COALESCE((
        SELECT CASE WHEN a.kind IN ('asset', 'expense')
                    THEN SUM(d.debit - d.credit)
                    ELSE SUM(d.credit - d.debit) END
        FROM ledger_entry_details d
        JOIN ledger_entries e ON e.id = d.entry_id
        WHERE d.account_id = a.id AND e.status = 'posted'
    ), 0)
    WHERE a.organization_id = $1
"#;

#[async_trait::async_trait]
impl DataStore for PostgresDataStore {
    #[instrument(skip(self, filter), fields(table = %table), err)]
    async fn select(&self, table: Table, filter: Filter) -> StoreResult<Vec<Row>> {
        let sql = select_sql(table, &filter)?;
        let rows = bind_filter(sqlx::query(&sql), &filter)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(table, "select", e))?;

        rows.into_iter()
            .map(|r| {
                let value: Value = r
                    .try_get("row")
                    .map_err(|e| map_sqlx_error(table, "select", e))?;
                match value {
                    Value::Object(map) => Ok(map),
                    other => Err(StoreError::Decode {
                        table,
                        detail: format!("expected object, got {other}"),
                    }),
                }
            })
            .collect()
    }

    #[instrument(skip(self, batch), fields(ops = batch.len()), err)]
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Backend(format!("failed to begin transaction: {e}")))?;

        for op in batch.ops() {
            match op {
                WriteOp::Insert { table, row } => {
                    let sql = insert_sql(*table, row)?;
                    sqlx::query(&sql)
                        .bind(Value::Object(row.clone()))
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| map_sqlx_error(*table, "insert", e))?;
                }
                WriteOp::Increment {
                    table,
                    id,
                    column,
                    by,
                } => {
                    let c = quote(column)?;
                    let sql = format!("UPDATE {} SET {c} = {c} + $1 WHERE id = $2", table.name());
                    let query = match by {
                        Delta::Decimal(d) => sqlx::query(&sql).bind(*d),
                        Delta::Integer(n) => sqlx::query(&sql).bind(*n),
                    };
                    let done = query
                        .bind(*id)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| map_sqlx_error(*table, "increment", e))?;
                    if done.rows_affected() != 1 {
                        return Err(StoreError::MissingRow {
                            table: *table,
                            id: *id,
                        });
                    }
                }
                WriteOp::Update {
                    table,
                    filter,
                    patch,
                    expect,
                } => {
                    let sql = update_sql(*table, filter, patch)?;
                    let done = bind_filter(sqlx::query(&sql).bind(patch_object(patch)), filter)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| map_sqlx_error(*table, "update", e))?;
                    if let Some(expected) = expect {
                        if done.rows_affected() != *expected {
                            return Err(StoreError::Conflict {
                                table: *table,
                                detail: format!(
                                    "expected {expected} row(s), matched {}",
                                    done.rows_affected()
                                ),
                            });
                        }
                    }
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Backend(format!("failed to commit transaction: {e}")))
    }

    #[instrument(skip(self, filter), fields(table = %table), err)]
    async fn delete(&self, table: Table, filter: Filter) -> StoreResult<u64> {
        let sql = format!("DELETE FROM {} AS t{}", table.name(), where_clause(&filter, 1)?);
        let done = bind_filter(sqlx::query(&sql), &filter)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(table, "delete", e))?;
        Ok(done.rows_affected())
    }

    #[instrument(skip(self, filter, patch), fields(table = %table), err)]
    async fn update(
        &self,
        table: Table,
        filter: Filter,
        patch: Vec<(&'static str, Value)>,
    ) -> StoreResult<u64> {
        let sql = update_sql(table, &filter, &patch)?;
        let done = bind_filter(sqlx::query(&sql).bind(patch_object(&patch)), &filter)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(table, "update", e))?;
        Ok(done.rows_affected())
    }

    #[instrument(skip(self), fields(organization_id = %organization_id), err)]
    async fn account_movements(
        &self,
        organization_id: OrganizationId,
        from: Option<NaiveDate>,
        to: NaiveDate,
    ) -> StoreResult<Vec<AccountMovement>> {
        let table = Table::LedgerEntryDetails;
        // NaiveDate::MAX lies outside the Postgres date range; treat it as open-ended.
        let to = (to != NaiveDate::MAX).then_some(to);
        let rows = sqlx::query(MOVEMENTS_SQL)
            .bind(organization_id.as_uuid())
            .bind(from)
            .bind(to)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(table, "account_movements", e))?;

        rows.into_iter()
            .map(|r| {
                let account_id: Uuid = r
                    .try_get("account_id")
                    .map_err(|e| map_sqlx_error(table, "account_movements", e))?;
                let debit_total: Decimal = r
                    .try_get("debit_total")
                    .map_err(|e| map_sqlx_error(table, "account_movements", e))?;
                let credit_total: Decimal = r
                    .try_get("credit_total")
                    .map_err(|e| map_sqlx_error(table, "account_movements", e))?;
                Ok(AccountMovement {
                    account_id: AccountId::from_uuid(account_id),
                    debit_total,
                    credit_total,
                })
            })
            .collect()
    }

    #[instrument(skip(self), err)]
    async fn call(&self, op: NamedOperation) -> StoreResult<u64> {
        match op {
            NamedOperation::Ping => {
                sqlx::query("SELECT 1")
                    .execute(&*self.pool)
                    .await
                    .map_err(|e| StoreError::Backend(format!("ping failed: {e}")))?;
                Ok(1)
            }
            NamedOperation::RecomputeAccountBalances { organization_id } => {
                let done = sqlx::query(RECOMPUTE_BALANCES_SQL)
                    .bind(organization_id.as_uuid())
                    .execute(&*self.pool)
                    .await
                    .map_err(|e| map_sqlx_error(Table::LedgerAccounts, "recompute_balances", e))?;
                Ok(done.rows_affected())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_renders_decimals_as_text_and_binds_filters() {
        let filter = Filter::new()
            .eq("organization_id", "o")
            .eq("code", "1000")
            .order_by("code");
        let sql = select_sql(Table::LedgerAccounts, &filter).unwrap();
        assert_eq!(
            sql,
            "SELECT to_jsonb(t) || jsonb_build_object('current_balance', t.\"current_balance\"::text) \
             AS row FROM ledger_accounts t WHERE t.\"organization_id\"::text = $1 \
             AND t.\"code\"::text = $2 ORDER BY t.\"code\""
        );
    }

    #[test]
    fn update_placeholders_start_after_the_patch() {
        let filter = Filter::new().eq("organization_id", "o");
        let sql = update_sql(
            Table::Items,
            &filter,
            &[("current_stock", Value::from(0))],
        )
        .unwrap();
        assert!(sql.starts_with("UPDATE items AS t SET \"current_stock\" = r.\"current_stock\""));
        assert!(sql.ends_with("WHERE t.\"organization_id\"::text = $2"));
    }

    #[test]
    fn column_names_are_checked() {
        let mut row = Row::new();
        row.insert("id; drop table items".into(), Value::Null);
        assert!(insert_sql(Table::Items, &row).is_err());
    }
}

//! Persistence boundary.
//!
//! Services talk to storage only through [`DataStore`]. Rows travel as JSON
//! objects; table and column names are closed sets chosen by code, never by
//! request input.
//!
//! Two implementations are provided:
//!
//! - [`InMemoryDataStore`]: tests and local development. Enforces the declared
//!   foreign keys and serialises write batches behind one lock.
//! - [`PostgresDataStore`]: sqlx-backed; every write batch runs in a single
//!   transaction.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use karatbook_accounting::AccountMovement;
use karatbook_core::OrganizationId;

pub mod memory;
pub mod postgres;
pub mod schema;

pub use memory::InMemoryDataStore;
pub use postgres::PostgresDataStore;

/// One stored row.
pub type Row = serde_json::Map<String, Value>;

/// Every relation the application reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    LedgerAccounts,
    LedgerEntries,
    LedgerEntryDetails,
    Items,
    StockMovements,
    Customers,
    Suppliers,
    Sales,
    SaleItems,
    AdvancePayments,
    Vouchers,
    PurchaseOrders,
    PurchaseOrderItems,
    PurchaseReceipts,
    PurchaseReceiptItems,
}

impl Table {
    pub const ALL: [Table; 15] = [
        Table::LedgerAccounts,
        Table::LedgerEntries,
        Table::LedgerEntryDetails,
        Table::Items,
        Table::StockMovements,
        Table::Customers,
        Table::Suppliers,
        Table::Sales,
        Table::SaleItems,
        Table::AdvancePayments,
        Table::Vouchers,
        Table::PurchaseOrders,
        Table::PurchaseOrderItems,
        Table::PurchaseReceipts,
        Table::PurchaseReceiptItems,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::LedgerAccounts => "ledger_accounts",
            Table::LedgerEntries => "ledger_entries",
            Table::LedgerEntryDetails => "ledger_entry_details",
            Table::Items => "items",
            Table::StockMovements => "stock_movements",
            Table::Customers => "customers",
            Table::Suppliers => "suppliers",
            Table::Sales => "sales",
            Table::SaleItems => "sale_items",
            Table::AdvancePayments => "advance_payments",
            Table::Vouchers => "vouchers",
            Table::PurchaseOrders => "purchase_orders",
            Table::PurchaseOrderItems => "purchase_order_items",
            Table::PurchaseReceipts => "purchase_receipts",
            Table::PurchaseReceiptItems => "purchase_receipt_items",
        }
    }
}

impl core::fmt::Display for Table {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Text form used when comparing a stored value against a filter.
pub(crate) fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Equality filter plus optional ordering.
///
/// Values are compared in their text form (uuids hyphenated, dates ISO-8601,
/// enums by their serialized name).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub(crate) eq: Vec<(&'static str, String)>,
    pub(crate) order_by: Option<&'static str>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All rows belonging to one organization.
    pub fn organization(organization_id: OrganizationId) -> Self {
        Self::new().eq("organization_id", organization_id)
    }

    pub fn eq(mut self, column: &'static str, value: impl ToString) -> Self {
        self.eq.push((column, value.to_string()));
        self
    }

    pub fn order_by(mut self, column: &'static str) -> Self {
        self.order_by = Some(column);
        self
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.eq.iter().all(|(column, expected)| {
            row.get(*column)
                .and_then(value_text)
                .is_some_and(|actual| &actual == expected)
        })
    }
}

/// Relative change applied to a numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delta {
    Decimal(Decimal),
    Integer(i64),
}

/// One write inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Insert {
        table: Table,
        row: Row,
    },
    /// `column = column + by` on the row with primary key `id`.
    Increment {
        table: Table,
        id: Uuid,
        column: &'static str,
        by: Delta,
    },
    /// Set `patch` on every row matching `filter`. With `expect`, a different
    /// number of matched rows aborts the batch with [`StoreError::Conflict`].
    Update {
        table: Table,
        filter: Filter,
        patch: Vec<(&'static str, Value)>,
        expect: Option<u64>,
    },
}

/// Ordered writes that are applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: Table, row: Row) -> &mut Self {
        self.ops.push(WriteOp::Insert { table, row });
        self
    }

    pub fn increment(
        &mut self,
        table: Table,
        id: impl Into<Uuid>,
        column: &'static str,
        by: Delta,
    ) -> &mut Self {
        self.ops.push(WriteOp::Increment {
            table,
            id: id.into(),
            column,
            by,
        });
        self
    }

    pub fn update(
        &mut self,
        table: Table,
        filter: Filter,
        patch: Vec<(&'static str, Value)>,
        expect: Option<u64>,
    ) -> &mut Self {
        self.ops.push(WriteOp::Update {
            table,
            filter,
            patch,
            expect,
        });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Fixed server-side operations. There is no way to run free-form SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedOperation {
    /// Round-trip to the backend.
    Ping,
    /// Rewrite every cached account balance of the organization from its
    /// posted entry details. Returns the number of accounts touched.
    RecomputeAccountBalances { organization_id: OrganizationId },
}

/// Storage failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("relation \"{0}\" does not exist")]
    MissingRelation(Table),

    #[error("foreign key violation on {table}: {detail}")]
    ForeignKeyViolation { table: Table, detail: String },

    #[error("conflict on {table}: {detail}")]
    Conflict { table: Table, detail: String },

    #[error("row {id} not found in {table}")]
    MissingRow { table: Table, id: Uuid },

    #[error("backend error: {0}")]
    Backend(String),

    #[error("failed to decode {table} row: {detail}")]
    Decode { table: Table, detail: String },
}

impl StoreError {
    pub fn is_missing_relation(&self) -> bool {
        matches!(self, StoreError::MissingRelation(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Async persistence collaborator.
#[async_trait::async_trait]
pub trait DataStore: Send + Sync {
    async fn select(&self, table: Table, filter: Filter) -> StoreResult<Vec<Row>>;

    /// Apply every op of `batch` atomically.
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()>;

    /// Delete matching rows, returning how many were removed.
    async fn delete(&self, table: Table, filter: Filter) -> StoreResult<u64>;

    /// Patch matching rows, returning how many were updated.
    async fn update(
        &self,
        table: Table,
        filter: Filter,
        patch: Vec<(&'static str, Value)>,
    ) -> StoreResult<u64>;

    /// Per-account debit/credit totals of posted details dated in
    /// `[from, to]` (`from = None` means since the beginning).
    async fn account_movements(
        &self,
        organization_id: OrganizationId,
        from: Option<NaiveDate>,
        to: NaiveDate,
    ) -> StoreResult<Vec<AccountMovement>>;

    async fn call(&self, op: NamedOperation) -> StoreResult<u64>;
}

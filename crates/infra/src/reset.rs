//! Cascading reset of an organization's transactional data.
//!
//! Master data (accounts, items, customers, suppliers) survives; every
//! document, ledger entry and stock movement is deleted and the cached
//! counters on the master rows go back to zero.
//!
//! Steps run one at a time in [`RESET_STEPS`] order. The reset is not atomic:
//! a failure leaves the tables after the failing step untouched, and running
//! the reset again picks up where it stopped.

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{info, instrument, warn};

use karatbook_core::OrganizationId;

use crate::store::{DataStore, Filter, StoreError, Table};

/// Delete order. Every child table precedes the parents it references.
pub const RESET_STEPS: [Table; 11] = [
    Table::StockMovements,
    Table::LedgerEntryDetails,
    Table::LedgerEntries,
    Table::SaleItems,
    Table::Sales,
    Table::AdvancePayments,
    Table::Vouchers,
    Table::PurchaseReceiptItems,
    Table::PurchaseReceipts,
    Table::PurchaseOrderItems,
    Table::PurchaseOrders,
];

/// Cached counters zeroed once every delete step has run.
pub const COUNTER_RESETS: [(Table, &str); 4] = [
    (Table::Items, "current_stock"),
    (Table::Customers, "current_balance"),
    (Table::Suppliers, "current_balance"),
    (Table::LedgerAccounts, "current_balance"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResetStep {
    pub table: Table,
    pub rows_deleted: u64,
    /// The relation does not exist in this deployment.
    pub skipped_missing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterReset {
    pub table: Table,
    pub column: &'static str,
    pub rows_updated: u64,
    pub skipped_missing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResetReport {
    pub organization_id: OrganizationId,
    pub steps: Vec<ResetStep>,
    pub counters: Vec<CounterReset>,
    /// Delete steps that ran against an existing relation.
    pub cleared_tables: usize,
}

impl ResetReport {
    pub fn rows_deleted(&self) -> u64 {
        self.steps.iter().map(|s| s.rows_deleted).sum()
    }
}

/// A reset step failed; `completed` holds the steps that ran before it.
#[derive(Debug, Error)]
#[error("reset stopped at {step}: {source}")]
pub struct ResetError {
    pub step: Table,
    #[source]
    pub source: StoreError,
    pub completed: Vec<ResetStep>,
}

#[instrument(skip(store), fields(organization_id = %organization_id), err)]
pub async fn reset_transactional_data(
    store: &dyn DataStore,
    organization_id: OrganizationId,
) -> Result<ResetReport, ResetError> {
    let mut steps = Vec::with_capacity(RESET_STEPS.len());

    for table in RESET_STEPS {
        match store
            .delete(table, Filter::organization(organization_id))
            .await
        {
            Ok(rows_deleted) => {
                info!(table = %table, rows_deleted, "reset step done");
                steps.push(ResetStep {
                    table,
                    rows_deleted,
                    skipped_missing: false,
                });
            }
            Err(e) if e.is_missing_relation() => {
                warn!(table = %table, "relation missing, reset step skipped");
                steps.push(ResetStep {
                    table,
                    rows_deleted: 0,
                    skipped_missing: true,
                });
            }
            Err(source) => {
                return Err(ResetError {
                    step: table,
                    source,
                    completed: steps,
                });
            }
        }
    }

    let mut counters = Vec::with_capacity(COUNTER_RESETS.len());
    for (table, column) in COUNTER_RESETS {
        let zero = if column == "current_stock" {
            json!(0)
        } else {
            json!(Decimal::ZERO)
        };
        match store
            .update(table, Filter::organization(organization_id), vec![(column, zero)])
            .await
        {
            Ok(rows_updated) => counters.push(CounterReset {
                table,
                column,
                rows_updated,
                skipped_missing: false,
            }),
            Err(e) if e.is_missing_relation() => {
                warn!(table = %table, "relation missing, counter reset skipped");
                counters.push(CounterReset {
                    table,
                    column,
                    rows_updated: 0,
                    skipped_missing: true,
                });
            }
            Err(source) => {
                return Err(ResetError {
                    step: table,
                    source,
                    completed: steps,
                });
            }
        }
    }

    let cleared_tables = steps.iter().filter(|s| !s.skipped_missing).count();
    let report = ResetReport {
        organization_id,
        steps,
        counters,
        cleared_tables,
    };
    info!(
        cleared_tables,
        rows_deleted = report.rows_deleted(),
        "transactional data reset"
    );
    Ok(report)
}

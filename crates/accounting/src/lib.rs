//! Accounting module (double-entry ledger).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns.

pub mod account;
pub mod chart;
pub mod document;
pub mod ledger;
pub mod reports;
pub mod voucher;

pub use account::{AccountKind, LedgerAccount, Side};
pub use chart::{PostingAccounts, PostingRole};
pub use document::{Counterparty, LinesBuilder, PartyBalanceChange, Postable};
pub use ledger::{
    DocumentKind, EntryStatus, LedgerEntry, LedgerEntryDetail, PostEntry, PostingLine,
    PostingLineInput, SourceDocument, ValidatedEntry, balance_deltas, validate,
};
pub use reports::{
    AccountMovement, BalanceDrift, ProfitAndLoss, TrialBalance, TrialBalanceRow, balance_drift,
    movements_from_details, profit_and_loss, trial_balance,
};
pub use voucher::{Voucher, VoucherBody};

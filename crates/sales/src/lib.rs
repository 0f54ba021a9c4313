//! Sales documents: counter sales (with udhari) and customer advances.
//!
//! Pure domain logic: each document knows the ledger entry and stock
//! movements it produces; persisting them is the infra layer's job.

pub mod advance;
pub mod sale;

pub use advance::AdvancePayment;
pub use sale::{Sale, SaleItem};

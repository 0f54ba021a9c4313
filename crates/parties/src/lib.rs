//! Parties: customers and suppliers with their running balances.

pub mod party;

pub use party::{ContactInfo, Party, PartyKind};

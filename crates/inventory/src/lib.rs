//! Inventory domain module.
//!
//! Items and the stock movements that change their `current_stock`. Pure
//! domain logic only (no IO, no HTTP, no storage).

pub mod item;
pub mod movement;

pub use item::{Item, Metal};
pub use movement::{MovementReason, StockEffect, StockMovement, net_stock_changes};

//! Purchasing domain module: purchase orders and goods receipts.
//!
//! Pure domain logic (no IO, no HTTP, no storage). Orders have no ledger
//! effect; receipts post to inventory and the supplier's payable.

pub mod order;
pub mod receipt;

pub use order::{PurchaseOrder, PurchaseOrderItem, PurchaseOrderStatus};
pub use receipt::{PurchaseReceipt, PurchaseReceiptItem};

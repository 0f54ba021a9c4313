//! Declared relational constraints, mirrored by `migrations/`.

use super::Table;

/// `child.column` references `parent.id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub child: Table,
    pub column: &'static str,
    pub parent: Table,
}

const fn fk(child: Table, column: &'static str, parent: Table) -> ForeignKey {
    ForeignKey {
        child,
        column,
        parent,
    }
}

pub const FOREIGN_KEYS: &[ForeignKey] = &[
    fk(Table::LedgerEntryDetails, "entry_id", Table::LedgerEntries),
    fk(Table::LedgerEntryDetails, "account_id", Table::LedgerAccounts),
    fk(Table::StockMovements, "item_id", Table::Items),
    fk(Table::Sales, "customer_id", Table::Customers),
    fk(Table::SaleItems, "sale_id", Table::Sales),
    fk(Table::SaleItems, "item_id", Table::Items),
    fk(Table::AdvancePayments, "customer_id", Table::Customers),
    fk(Table::PurchaseOrders, "supplier_id", Table::Suppliers),
    fk(Table::PurchaseOrderItems, "order_id", Table::PurchaseOrders),
    fk(Table::PurchaseOrderItems, "item_id", Table::Items),
    fk(Table::PurchaseReceipts, "supplier_id", Table::Suppliers),
    fk(Table::PurchaseReceipts, "purchase_order_id", Table::PurchaseOrders),
    fk(Table::PurchaseReceiptItems, "receipt_id", Table::PurchaseReceipts),
    fk(Table::PurchaseReceiptItems, "item_id", Table::Items),
];

/// Column sets that must be unique per table (besides `id`).
pub const UNIQUE_KEYS: &[(Table, &[&str])] = &[
    (Table::LedgerAccounts, &["organization_id", "code"]),
    (Table::Items, &["organization_id", "sku"]),
    (Table::Sales, &["organization_id", "invoice_number"]),
    (Table::Vouchers, &["organization_id", "number"]),
    (Table::PurchaseOrders, &["organization_id", "order_number"]),
    (Table::PurchaseReceipts, &["organization_id", "receipt_number"]),
];

/// Numeric(…) columns, rendered as text on read so no precision is lost.
pub fn decimal_columns(table: Table) -> &'static [&'static str] {
    match table {
        Table::LedgerAccounts | Table::Customers | Table::Suppliers => &["current_balance"],
        Table::LedgerEntryDetails => &["debit", "credit"],
        Table::Items => &["weight_grams"],
        Table::Sales => &["tax_rate", "subtotal", "tax", "total", "amount_paid"],
        Table::SaleItems => &["rate", "making_charges"],
        Table::AdvancePayments | Table::Vouchers => &["amount"],
        Table::PurchaseOrders => &["total"],
        Table::PurchaseOrderItems | Table::PurchaseReceiptItems => &["rate"],
        Table::PurchaseReceipts => &["total", "amount_paid"],
        Table::LedgerEntries | Table::StockMovements => &[],
    }
}

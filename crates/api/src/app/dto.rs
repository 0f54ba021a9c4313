use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use karatbook_accounting::{AccountKind, PostEntry, PostingLineInput, Voucher, VoucherBody};
use karatbook_core::{Amount, DocumentId, DomainResult, OrganizationId, PartyId};
use karatbook_inventory::Metal;
use karatbook_parties::{ContactInfo, Party, PartyKind};
use karatbook_purchasing::{PurchaseOrder, PurchaseOrderItem, PurchaseReceipt, PurchaseReceiptItem};
use karatbook_sales::{AdvancePayment, Sale, SaleItem};

// -------------------------
// Ledger
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub code: String,
    pub name: String,
    pub kind: String,
}

impl CreateAccountRequest {
    pub fn kind(&self) -> DomainResult<AccountKind> {
        self.kind.parse()
    }
}

#[derive(Debug, Deserialize)]
pub struct PostEntryRequest {
    pub date: NaiveDate,
    #[serde(default)]
    pub narration: String,
    pub lines: Vec<PostingLineInput>,
}

impl PostEntryRequest {
    pub fn into_command(self, organization_id: OrganizationId) -> PostEntry {
        PostEntry::new(organization_id, self.date, self.narration, self.lines)
    }
}

#[derive(Debug, Deserialize)]
pub struct TrialBalanceQuery {
    /// Defaults to today.
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ProfitAndLossQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

// -------------------------
// Inventory & parties
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub sku: String,
    pub name: String,
    pub metal: Metal,
    #[serde(default)]
    pub weight_grams: Decimal,
    pub purity: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub quantity: i64,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePartyRequest {
    pub kind: String,
    pub name: String,
    pub contact: Option<ContactInfo>,
}

impl CreatePartyRequest {
    pub fn into_party(self, organization_id: OrganizationId) -> DomainResult<Party> {
        let kind: PartyKind = self.kind.parse()?;
        Party::register(organization_id, kind, self.name, self.contact)
    }
}

#[derive(Debug, Deserialize)]
pub struct ListPartiesQuery {
    pub kind: Option<String>,
}

// -------------------------
// Documents
// -------------------------

#[derive(Debug, Deserialize)]
pub struct SaleRequest {
    pub invoice_number: String,
    pub date: NaiveDate,
    pub customer_id: Option<PartyId>,
    pub items: Vec<SaleItem>,
    /// Percent, e.g. `3` for 3% GST.
    #[serde(default)]
    pub tax_rate: Decimal,
    #[serde(default)]
    pub amount_paid: Decimal,
}

impl SaleRequest {
    pub fn into_sale(self, organization_id: OrganizationId) -> DomainResult<Sale> {
        Sale::new(
            organization_id,
            self.invoice_number,
            self.date,
            self.customer_id,
            self.items,
            self.tax_rate,
            self.amount_paid,
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct PurchaseOrderRequest {
    pub order_number: String,
    pub supplier_id: PartyId,
    pub date: NaiveDate,
    pub items: Vec<PurchaseOrderItem>,
}

impl PurchaseOrderRequest {
    pub fn into_order(self, organization_id: OrganizationId) -> DomainResult<PurchaseOrder> {
        PurchaseOrder::new(
            organization_id,
            self.order_number,
            self.supplier_id,
            self.date,
            self.items,
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct PurchaseReceiptRequest {
    pub receipt_number: String,
    pub supplier_id: PartyId,
    pub date: NaiveDate,
    pub purchase_order_id: Option<DocumentId>,
    pub items: Vec<PurchaseReceiptItem>,
    #[serde(default)]
    pub amount_paid: Decimal,
}

impl PurchaseReceiptRequest {
    /// The receipt plus the order it is received against, if any.
    pub fn into_receipt(
        self,
        organization_id: OrganizationId,
    ) -> DomainResult<(PurchaseReceipt, Option<DocumentId>)> {
        let receipt = PurchaseReceipt::new(
            organization_id,
            self.receipt_number,
            self.supplier_id,
            self.date,
            self.items,
            self.amount_paid,
        )?;
        Ok((receipt, self.purchase_order_id))
    }
}

#[derive(Debug, Deserialize)]
pub struct VoucherRequest {
    pub number: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub narration: String,
    pub party_id: Option<PartyId>,
    pub body: VoucherBody,
}

impl VoucherRequest {
    pub fn into_voucher(self, organization_id: OrganizationId) -> DomainResult<Voucher> {
        let voucher = Voucher::new(
            organization_id,
            self.number,
            self.date,
            self.narration,
            self.body,
        )?;
        Ok(match self.party_id {
            Some(party_id) => voucher.for_party(party_id),
            None => voucher,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AdvanceRequest {
    pub customer_id: PartyId,
    pub date: NaiveDate,
    pub amount: Amount,
    pub note: Option<String>,
}

impl AdvanceRequest {
    pub fn into_advance(self, organization_id: OrganizationId) -> DomainResult<AdvancePayment> {
        AdvancePayment::new(
            organization_id,
            self.customer_id,
            self.date,
            self.amount,
            self.note,
        )
    }
}

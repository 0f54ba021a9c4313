//! End-to-end scenarios across the services on the in-memory store.
//!
//! A month of shop trading: capital brought in, stock bought against an
//! order, counter sales on udhari, an advance, a supplier payment and a
//! drafted wages entry. Then the reports and the reset.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use karatbook_accounting::{
        AccountKind, PostEntry, PostingLineInput, PostingRole, Voucher, VoucherBody,
    };
    use karatbook_core::{AccountId, Amount, DocumentId, ItemId, OrganizationId, PartyId};
    use karatbook_inventory::Metal;
    use karatbook_parties::{Party, PartyKind};
    use karatbook_purchasing::{
        PurchaseOrder, PurchaseOrderItem, PurchaseReceipt, PurchaseReceiptItem,
    };
    use karatbook_sales::{AdvancePayment, Sale, SaleItem};

    use crate::documents::DocumentService;
    use crate::ledger::LedgerService;
    use crate::parties::PartyService;
    use crate::reset::reset_transactional_data;
    use crate::stock::InventoryService;
    use crate::store::{InMemoryDataStore, Table};

    struct Books {
        org: OrganizationId,
        store: Arc<InMemoryDataStore>,
        ledger: LedgerService,
        docs: DocumentService,
        inventory: InventoryService,
        parties: PartyService,
    }

    impl Books {
        async fn open() -> Self {
            let store = Arc::new(InMemoryDataStore::new());
            let org = OrganizationId::new();
            let ledger = LedgerService::new(store.clone());
            ledger.seed_default_chart(org).await.unwrap();
            Self {
                org,
                docs: DocumentService::new(store.clone()),
                inventory: InventoryService::new(store.clone()),
                parties: PartyService::new(store.clone()),
                ledger,
                store,
            }
        }

        async fn role(&self, role: PostingRole) -> AccountId {
            self.ledger
                .posting_accounts(self.org)
                .await
                .unwrap()
                .get(role)
                .unwrap()
        }

        async fn balance(&self, id: AccountId) -> Decimal {
            self.ledger
                .list_accounts(self.org)
                .await
                .unwrap()
                .into_iter()
                .find(|a| a.id == id)
                .unwrap()
                .current_balance
        }

        async fn party(&self, kind: PartyKind, name: &str) -> PartyId {
            self.parties
                .create_party(Party::register(self.org, kind, name, None).unwrap())
                .await
                .unwrap()
                .id
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn rupees(units: i64) -> Decimal {
        Decimal::new(units, 0)
    }

    async fn stock_up(books: &Books, supplier: PartyId, item: ItemId) {
        let order = PurchaseOrder::new(
            books.org,
            "PO-001",
            supplier,
            day(2),
            vec![PurchaseOrderItem {
                line_no: 1,
                item_id: item,
                quantity: 10,
                rate: rupees(20_000),
            }],
        )
        .unwrap();
        books.docs.create_purchase_order(&order).await.unwrap();

        let receipt = PurchaseReceipt::new(
            books.org,
            "GRN-001",
            supplier,
            day(3),
            vec![PurchaseReceiptItem {
                line_no: 1,
                item_id: item,
                quantity: 10,
                rate: rupees(20_000),
            }],
            rupees(50_000),
        )
        .unwrap();
        books
            .docs
            .post_purchase_receipt(receipt, Some(order.id))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn month_of_trading_balances_and_reports() {
        let books = Books::open().await;
        let capital = books
            .ledger
            .create_account(books.org, "3000", "Owner Capital", AccountKind::Equity)
            .await
            .unwrap()
            .id;
        let wages = books
            .ledger
            .create_account(books.org, "5100", "Karigar Wages", AccountKind::Expense)
            .await
            .unwrap()
            .id;
        let cash = books.role(PostingRole::Cash).await;
        let payable = books.role(PostingRole::AccountsPayable).await;

        // capital
        let opening = Voucher::new(
            books.org,
            "JV-001",
            day(1),
            "opening capital",
            VoucherBody::Journal {
                lines: vec![
                    PostingLineInput::debit(cash, rupees(500_000)),
                    PostingLineInput::credit(capital, rupees(500_000)),
                ],
            },
        )
        .unwrap();
        books.docs.post_document(&opening).await.unwrap();

        let ring = books
            .inventory
            .create_item(books.org, "RNG-22K", "Ring 22K", Metal::Gold, Decimal::new(65, 1), Some("22K".into()))
            .await
            .unwrap()
            .id;
        let supplier = books.party(PartyKind::Supplier, "Kundan Karigar").await;
        let meena = books.party(PartyKind::Customer, "Meena").await;
        let farah = books.party(PartyKind::Customer, "Farah").await;

        stock_up(&books, supplier, ring).await;

        // 3 rings, 3% GST, part on udhari
        let sale = Sale::new(
            books.org,
            "INV-001",
            day(10),
            Some(meena),
            vec![SaleItem {
                line_no: 1,
                item_id: ring,
                quantity: 3,
                rate: rupees(30_000),
                making_charges: rupees(6_000),
            }],
            Decimal::new(3, 0),
            rupees(80_000),
        )
        .unwrap();
        books.docs.post_document(&sale).await.unwrap();

        let advance =
            AdvancePayment::new(books.org, farah, day(12), Amount::from_units(10_000), None)
                .unwrap();
        books.docs.post_document(&advance).await.unwrap();

        let payment = Voucher::new(
            books.org,
            "PV-001",
            day(15),
            "part payment to karigar",
            VoucherBody::Payment {
                account_id: payable,
                amount: Amount::from_units(100_000),
            },
        )
        .unwrap()
        .for_party(supplier);
        books.docs.post_document(&payment).await.unwrap();

        // wages drafted first, posted at month end
        let draft = books
            .ledger
            .save_draft(&PostEntry::new(
                books.org,
                day(31),
                "workshop wages",
                vec![
                    PostingLineInput::debit(wages, rupees(5_000)),
                    PostingLineInput::credit(cash, rupees(5_000)),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(books.balance(wages).await, Decimal::ZERO);
        books.ledger.post_draft(books.org, draft).await.unwrap();

        assert_eq!(books.balance(cash).await, rupees(435_000));
        assert_eq!(books.balance(payable).await, rupees(50_000));
        assert_eq!(books.inventory.list_items(books.org).await.unwrap()[0].current_stock, 7);

        let customers = books
            .parties
            .list_parties(books.org, Some(PartyKind::Customer))
            .await
            .unwrap();
        let meena_row = customers.iter().find(|p| p.id == meena).unwrap();
        assert_eq!(meena_row.current_balance, rupees(18_880));
        let farah_row = customers.iter().find(|p| p.id == farah).unwrap();
        assert!(farah_row.current_balance.is_zero());

        let tb = books.ledger.trial_balance(books.org, day(31)).await.unwrap();
        assert!(tb.is_balanced());
        assert_eq!(tb.total_debits, rupees(913_880));
        assert_eq!(tb.rows.len(), 9);

        // before the sale only capital and the receipt are in
        let early = books.ledger.trial_balance(books.org, day(5)).await.unwrap();
        assert_eq!(early.total_debits, rupees(700_000));

        let pnl = books
            .ledger
            .profit_and_loss(books.org, day(1), day(31))
            .await
            .unwrap();
        assert_eq!(pnl.revenue, rupees(96_000));
        assert_eq!(pnl.cost, rupees(5_000));
        assert_eq!(pnl.profit, rupees(91_000));

        assert!(books.ledger.audit_balances(books.org).await.unwrap().is_empty());

        // reset wipes the month but keeps the chart and the catalogue
        let report = reset_transactional_data(books.store.as_ref(), books.org)
            .await
            .unwrap();
        assert!(report.rows_deleted() > 0);
        let after = books.ledger.trial_balance(books.org, day(31)).await.unwrap();
        assert_eq!(after.total_debits, Decimal::ZERO);
        assert_eq!(after.rows.len(), 9);
        assert_eq!(books.store.row_count(Table::Items).unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sales_keep_cached_balances_exact() {
        let books = Arc::new(Books::open().await);
        let supplier = books.party(PartyKind::Supplier, "Kundan Karigar").await;
        let ring = books
            .inventory
            .create_item(books.org, "RNG-18K", "Ring 18K", Metal::Gold, Decimal::new(4, 0), None)
            .await
            .unwrap()
            .id;
        stock_up(&books, supplier, ring).await;

        let mut tasks = Vec::new();
        for n in 0..10 {
            let books = books.clone();
            tasks.push(tokio::spawn(async move {
                let sale = Sale::new(
                    books.org,
                    format!("INV-{n:03}-{}", DocumentId::new()),
                    day(20),
                    None,
                    vec![SaleItem {
                        line_no: 1,
                        item_id: ring,
                        quantity: 1,
                        rate: rupees(25_000),
                        making_charges: Decimal::ZERO,
                    }],
                    Decimal::ZERO,
                    rupees(25_000),
                )
                .unwrap();
                books.docs.post_document(&sale).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let revenue = books.role(PostingRole::SalesRevenue).await;
        assert_eq!(books.balance(revenue).await, rupees(250_000));
        assert_eq!(books.inventory.list_items(books.org).await.unwrap()[0].current_stock, 0);
        assert!(books.ledger.audit_balances(books.org).await.unwrap().is_empty());
        assert_eq!(books.store.row_count(Table::Sales).unwrap(), 10);
    }
}

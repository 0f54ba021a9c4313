use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use karatbook_core::{DocumentId, DomainError, DomainResult, ItemId, OrganizationId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementReason {
    Sale,
    PurchaseReceipt,
    Adjustment,
}

/// Signed change to an item's stock (`stock_movements` row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub organization_id: OrganizationId,
    pub item_id: ItemId,
    pub quantity: i64,
    pub reason: MovementReason,
    pub source_id: Option<DocumentId>,
    pub date: NaiveDate,
}

impl StockMovement {
    pub fn new(
        organization_id: OrganizationId,
        item_id: ItemId,
        quantity: i64,
        reason: MovementReason,
        date: NaiveDate,
    ) -> DomainResult<Self> {
        if quantity == 0 {
            return Err(DomainError::validation("stock movement quantity cannot be zero"));
        }
        Ok(Self {
            id: Uuid::now_v7(),
            organization_id,
            item_id,
            quantity,
            reason,
            source_id: None,
            date,
        })
    }

    pub fn from_document(mut self, source_id: DocumentId) -> Self {
        self.source_id = Some(source_id);
        self
    }
}

/// Documents that move stock when posted.
pub trait StockEffect {
    fn stock_movements(&self) -> DomainResult<Vec<StockMovement>>;
}

/// Net quantity change per item, rejecting any that would take stock below zero.
///
/// `on_hand` holds the current stock of every item the movements touch.
pub fn net_stock_changes(
    on_hand: &HashMap<ItemId, i64>,
    movements: &[StockMovement],
) -> DomainResult<BTreeMap<ItemId, i64>> {
    let mut net: BTreeMap<ItemId, i64> = BTreeMap::new();
    for m in movements {
        let slot = net.entry(m.item_id).or_insert(0);
        *slot = slot
            .checked_add(m.quantity)
            .ok_or_else(|| DomainError::validation("stock quantity overflow"))?;
    }

    for (item_id, delta) in &net {
        let current = on_hand
            .get(item_id)
            .ok_or_else(|| DomainError::validation(format!("unknown item {item_id}")))?;
        let after = current
            .checked_add(*delta)
            .ok_or_else(|| DomainError::validation("stock quantity overflow"))?;
        if after < 0 {
            return Err(DomainError::validation(format!(
                "insufficient stock for item {item_id} (on hand {current}, change {delta})"
            )));
        }
    }

    Ok(net)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
    }

    fn movement(item: ItemId, qty: i64) -> StockMovement {
        StockMovement::new(OrganizationId::new(), item, qty, MovementReason::Adjustment, date())
            .unwrap()
    }

    #[test]
    fn zero_quantity_is_rejected() {
        assert!(
            StockMovement::new(
                OrganizationId::new(),
                ItemId::new(),
                0,
                MovementReason::Sale,
                date()
            )
            .is_err()
        );
    }

    #[test]
    fn nets_movements_per_item() {
        let ring = ItemId::new();
        let chain = ItemId::new();
        let on_hand = HashMap::from([(ring, 2), (chain, 0)]);
        let net = net_stock_changes(
            &on_hand,
            &[movement(ring, -1), movement(chain, 5), movement(ring, -1)],
        )
        .unwrap();
        assert_eq!(net[&ring], -2);
        assert_eq!(net[&chain], 5);
    }

    #[test]
    fn overselling_is_rejected() {
        let ring = ItemId::new();
        let on_hand = HashMap::from([(ring, 1)]);
        let err = net_stock_changes(&on_hand, &[movement(ring, -2)]).unwrap_err();
        assert!(err.to_string().contains("insufficient stock"));
    }

    #[test]
    fn stock_overflow_is_rejected() {
        let ring = ItemId::new();
        let on_hand = HashMap::from([(ring, i64::MAX)]);
        let err = net_stock_changes(&on_hand, &[movement(ring, 1)]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn unknown_item_is_rejected() {
        let err = net_stock_changes(&HashMap::new(), &[movement(ItemId::new(), 1)]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    proptest! {
        /// Accepted movements never leave an item below zero.
        #[test]
        fn accepted_changes_keep_stock_non_negative(
            start in 0i64..50,
            deltas in prop::collection::vec(-20i64..20, 1..10),
        ) {
            let item = ItemId::new();
            let on_hand = HashMap::from([(item, start)]);
            let moves: Vec<_> = deltas
                .iter()
                .filter(|d| **d != 0)
                .map(|d| movement(item, *d))
                .collect();
            if let Ok(net) = net_stock_changes(&on_hand, &moves) {
                let delta = net.get(&item).copied().unwrap_or(0);
                prop_assert!(start + delta >= 0);
            }
        }
    }
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use karatbook_core::{DomainError, DomainResult, Entity, ItemId, OrganizationId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metal {
    Gold,
    Silver,
    Platinum,
    Diamond,
    Other,
}

/// Inventory stock keeping unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub organization_id: OrganizationId,
    pub sku: String,
    pub name: String,
    pub metal: Metal,
    /// Purity mark as printed on the tag, e.g. "22K" or "925".
    pub purity: Option<String>,
    /// Gross weight in grams.
    pub weight_grams: Decimal,
    /// Pieces on hand; only stock movements change it.
    pub current_stock: i64,
}

impl Item {
    pub fn create(
        organization_id: OrganizationId,
        sku: impl Into<String>,
        name: impl Into<String>,
        metal: Metal,
        weight_grams: Decimal,
    ) -> DomainResult<Self> {
        let sku = sku.into().trim().to_string();
        let name = name.into().trim().to_string();
        if sku.is_empty() {
            return Err(DomainError::validation("sku cannot be empty"));
        }
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if weight_grams.is_sign_negative() {
            return Err(DomainError::validation("weight cannot be negative"));
        }
        Ok(Self {
            id: ItemId::new(),
            organization_id,
            sku,
            name,
            metal,
            purity: None,
            weight_grams,
            current_stock: 0,
        })
    }

    pub fn with_purity(mut self, purity: impl Into<String>) -> Self {
        self.purity = Some(purity.into());
        self
    }
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }
}

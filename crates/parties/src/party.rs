use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use karatbook_core::{DomainError, DomainResult, Entity, OrganizationId, PartyId};

/// Party kind: customer or supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    Customer,
    Supplier,
}

impl PartyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PartyKind::Customer => "customer",
            PartyKind::Supplier => "supplier",
        }
    }
}

impl core::str::FromStr for PartyKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "customer" => Ok(PartyKind::Customer),
            "supplier" => Ok(PartyKind::Supplier),
            other => Err(DomainError::validation(format!(
                "party kind must be customer or supplier (got '{other}')"
            ))),
        }
    }
}

/// Contact information for a party.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// Customer or supplier.
///
/// For a customer `current_balance` is the outstanding udhari; for a supplier
/// it is what the shop still owes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub id: PartyId,
    pub organization_id: OrganizationId,
    pub kind: PartyKind,
    pub name: String,
    #[serde(default)]
    pub contact: ContactInfo,
    pub current_balance: Decimal,
}

impl Party {
    pub fn register(
        organization_id: OrganizationId,
        kind: PartyKind,
        name: impl Into<String>,
        contact: Option<ContactInfo>,
    ) -> DomainResult<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("party name cannot be empty"));
        }
        Ok(Self {
            id: PartyId::new(),
            organization_id,
            kind,
            name,
            contact: contact.unwrap_or_default(),
            current_balance: Decimal::ZERO,
        })
    }
}

impl Entity for Party {
    type Id = PartyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }
}

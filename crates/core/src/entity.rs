//! Entity trait: identity + continuity across state changes.

use crate::id::OrganizationId;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Organization the record belongs to. Every persisted row is scoped by it.
    fn organization_id(&self) -> OrganizationId;
}

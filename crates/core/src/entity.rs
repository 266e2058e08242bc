//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Loaded backend records are entities: two invoices with equal balances are
/// still different invoices if their identifiers differ.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

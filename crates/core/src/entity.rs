//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// The identifier's `Display` form is the key a record is stored under.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

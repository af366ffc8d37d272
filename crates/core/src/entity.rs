//! Records with identity.

/// A domain record identified by a typed id rather than by its contents.
///
/// Stores key their tables by `Entity::id`: saving a record whose id is
/// already present replaces it.
pub trait Entity {
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}

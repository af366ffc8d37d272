//! Member registry domain module.
//!
//! Business rules for members, implemented as deterministic domain logic
//! (no IO, no storage). Name uniqueness is enforced by the service layer,
//! which can see every member; this crate only validates a single member.

pub mod member;

pub use member::{Address, Member};

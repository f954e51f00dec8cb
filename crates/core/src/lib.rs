//! `bankcore-core`: domain foundation building blocks.
//!
//! Pure domain primitives shared by the store and banking crates: the error
//! taxonomy, strongly-typed identifiers, the caller identity and the entity trait.
//! No infrastructure concerns live here.

pub mod entity;
pub mod error;
pub mod id;
pub mod identity;

pub use entity::Entity;
pub use error::{BankError, BankResult};
pub use id::{AccountId, CardId, CardTransactionId, EntryId, HealthCheckId, Uid};
pub use identity::Identity;

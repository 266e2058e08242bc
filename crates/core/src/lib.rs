//! `bulkpay-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no IO, no collaborators):
//! record identifiers, the domain error model, and money amounts.

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::DomainError;
pub use id::{RecordId, RequestId, parse_record_ids};
pub use value_object::{Amount, ValueObject};

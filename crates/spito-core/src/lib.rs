//! Core types and contracts for the spito content-sharing service.
//!
//! This crate holds the spit record and its validation rules, the
//! [`KvStore`] contract that storage backends implement, and the
//! [`Storager`] contract the domain layer talks to.

pub mod clock;
pub mod error;
pub mod id;
pub mod spit;
pub mod store;
pub mod storager;
pub mod validation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Result, SpitError, StorageError};
pub use id::{MintedId, RawId, SpitId};
pub use spit::{ImageFormat, Spit, SpitDraft, SpitKind, SpitPayload};
pub use store::KvStore;
pub use storager::Storager;
pub use validation::{validate, RawSpitFields, ValidationErrors, MAX_CONTENT_CHARS};

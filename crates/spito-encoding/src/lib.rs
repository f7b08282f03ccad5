//! Bijective base-K encoding of counters into short identifiers.
//!
//! An [`Alphabet`] is an ordered set of distinct characters. Every `u64` has
//! exactly one encoding under a given alphabet and every non-empty string over
//! the alphabet decodes back to exactly one `u64` (when it fits).

mod alphabet;
pub mod error;

pub use alphabet::{Alphabet, DEFAULT_CHARS};
pub use error::EncodingError;

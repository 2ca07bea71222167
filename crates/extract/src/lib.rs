//! Normalization of Apple OS release sources.
//!
//! Every upstream format has a [`Normalizer`](normalize::Normalizer) that
//! turns its raw text into the canonical [`models`]. Nothing in this crate
//! performs I/O.

mod consts;
pub mod error;
pub mod identity;
pub mod models;
pub mod names;
pub mod normalize;

pub use crate::identity::{bytes_hash, canonical_json, content_hash, value_hash};
pub use crate::normalize::Normalizer;

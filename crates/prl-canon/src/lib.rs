//! Canonical encoding for the Persistent Reasoning Lineage (PRL).
//!
//! Every identity in PRL is derived from the canonical string form of a
//! structured payload. This crate owns that form: a small closed value model
//! ([`Value`]) and a deterministic encoder ([`canonicalize`]) whose output is
//! a byte-exact contract across implementations.
//!
//! # Encoding rules
//!
//! - Map keys are sorted byte-wise ascending.
//! - No insignificant whitespace.
//! - Booleans are never conflated with `0`/`1`; integers are exact.
//! - Floats go through a 17-significant-digit round trip and are rendered in
//!   positional notation with a fractional part (`1.0`, never `1` or `1e0`).
//! - Sets are encoded element-wise, the canonical strings sorted and
//!   de-duplicated, then emitted as an array of string literals.
//!
//! Byte strings, non-string map keys and non-finite floats are rejected with
//! a [`CanonicalizationError`]; callers must map such data explicitly.

pub mod encode;
pub mod error;
pub mod ser;
pub mod value;

pub use encode::{canonicalize, canonicalize_serialize};
pub use error::CanonicalizationError;
pub use ser::to_value;
pub use value::Value;

//! Identity anchors for the Persistent Reasoning Lineage (PRL).
//!
//! An anchor is a content-derived fingerprint over a payload plus the
//! identity metadata it lives under. It is an identity marker for
//! persistence and lineage tracking, not a representation of meaning: any
//! structural change to the payload changes the id.
//!
//! # Key Types
//!
//! - [`IdentityAnchor`] — fingerprint id plus kind, namespace, scope, version
//! - [`SchemaVersion`] — the envelope format version (only `v1` exists)
//! - [`Collision`] — outcome of checking an observed payload against an anchor

pub mod anchor;
pub mod collision;
pub mod error;
pub mod fingerprint;
pub mod version;

pub use anchor::{anchor_equal, IdentityAnchor, DEFAULT_SCOPE};
pub use collision::{detect_collision, Collision};
pub use error::IdentityError;
pub use fingerprint::fingerprint;
pub use version::SchemaVersion;

use std::fmt;

use prl_canon::Value;
use serde::Serialize;

use crate::anchor::IdentityAnchor;

/// Why an observed payload is inconsistent with an anchor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "collision", content = "detail", rename_all = "snake_case")]
pub enum Collision {
    /// The expected payload does not reconstruct the anchor's id.
    AnchorMismatch,
    /// Same anchor id, but the observed payload reconstructs a different one:
    /// a hash collision or an unauthorized mutation.
    ObservedDiverges,
    /// One of the payloads could not be turned into an anchor at all.
    Unreconstructable(String),
}

impl fmt::Display for Collision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AnchorMismatch => f.write_str(
                "anchor mismatch: expected payload does not reconstruct the given anchor id",
            ),
            Self::ObservedDiverges => f.write_str(
                "identity collision (or unauthorized mutation): same anchor id, \
                 but observed payload does not reconstruct it",
            ),
            Self::Unreconstructable(reason) => write!(f, "cannot reconstruct anchor: {reason}"),
        }
    }
}

/// Check an observed payload against the anchor it claims to belong to.
///
/// The expected payload must first reproduce the anchor; only then is the
/// observed payload compared. Returns `None` when both reproduce the same id.
pub fn detect_collision(
    anchor: &IdentityAnchor,
    expected: &Value,
    observed: &Value,
) -> Option<Collision> {
    let rebuild = |payload: &Value, side: &str| {
        IdentityAnchor::create_versioned(
            anchor.kind(),
            anchor.namespace(),
            anchor.scope(),
            anchor.version(),
            payload,
        )
        .map_err(|e| Collision::Unreconstructable(format!("{side} payload: {e}")))
    };

    match rebuild(expected, "expected") {
        Err(c) => return Some(c),
        Ok(a) if a.id() != anchor.id() => return Some(Collision::AnchorMismatch),
        Ok(_) => {}
    }
    match rebuild(observed, "observed") {
        Err(c) => Some(c),
        Ok(a) if a.id() != anchor.id() => Some(Collision::ObservedDiverges),
        Ok(_) => None,
    }
}

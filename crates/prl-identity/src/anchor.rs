use std::fmt;
use std::hash::{Hash, Hasher};

use prl_canon::Value;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::IdentityError;
use crate::fingerprint::fingerprint;
use crate::version::SchemaVersion;

/// Scope used when a caller does not name one.
pub const DEFAULT_SCOPE: &str = "global";

/// Shortest accepted anchor id, in hex characters.
const MIN_ID_LEN: usize = 32;

/// Deterministic, collision-resistant marker for a persistent object.
///
/// The id is a pure function of kind, namespace, scope, version and the
/// canonical payload. Equality compares id, kind, namespace and scope, so two
/// anchors that happen to share an id under different metadata never compare
/// equal.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "RawAnchor")]
pub struct IdentityAnchor {
    id: String,
    kind: String,
    namespace: String,
    scope: String,
    version: SchemaVersion,
}

/// Unvalidated wire form; deserialization goes through [`IdentityAnchor::validate`].
#[derive(Deserialize)]
struct RawAnchor {
    id: String,
    kind: String,
    namespace: String,
    scope: String,
    version: SchemaVersion,
}

impl TryFrom<RawAnchor> for IdentityAnchor {
    type Error = IdentityError;

    fn try_from(raw: RawAnchor) -> Result<Self, Self::Error> {
        let anchor = Self {
            id: raw.id,
            kind: raw.kind,
            namespace: raw.namespace,
            scope: raw.scope,
            version: raw.version,
        };
        anchor.validate()?;
        Ok(anchor)
    }
}

impl IdentityAnchor {
    /// Derive an anchor from a payload with version `v1`.
    pub fn create(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        scope: impl Into<String>,
        payload: &Value,
    ) -> Result<Self, IdentityError> {
        Self::create_versioned(kind, namespace, scope, SchemaVersion::V1, payload)
    }

    /// Derive an anchor in the default scope.
    pub fn create_global(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        payload: &Value,
    ) -> Result<Self, IdentityError> {
        Self::create(kind, namespace, DEFAULT_SCOPE, payload)
    }

    pub fn create_versioned(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        scope: impl Into<String>,
        version: SchemaVersion,
        payload: &Value,
    ) -> Result<Self, IdentityError> {
        let kind = kind.into();
        let namespace = namespace.into();
        let scope = scope.into();
        let id = fingerprint(&kind, &namespace, &scope, version, payload)?;
        debug!(
            id = %id.as_str(),
            kind = %kind.as_str(),
            namespace = %namespace.as_str(),
            "identity anchor derived"
        );
        Ok(Self {
            id,
            kind,
            namespace,
            scope,
            version,
        })
    }

    /// Rebuild an anchor from stored parts, validating them.
    ///
    /// The id is not recomputed; use [`detect_collision`](crate::detect_collision)
    /// to check it against a payload.
    pub fn from_parts(
        id: impl Into<String>,
        kind: impl Into<String>,
        namespace: impl Into<String>,
        scope: impl Into<String>,
        version: &str,
    ) -> Result<Self, IdentityError> {
        Self::try_from(RawAnchor {
            id: id.into(),
            kind: kind.into(),
            namespace: namespace.into(),
            scope: scope.into(),
            version: version.parse()?,
        })
    }

    /// Check the structural well-formedness of the anchor.
    pub fn validate(&self) -> Result<(), IdentityError> {
        if self.id.len() < MIN_ID_LEN {
            return Err(IdentityError::InvalidId(format!(
                "expected at least {MIN_ID_LEN} hex characters, got {}",
                self.id.len()
            )));
        }
        if !self.id.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(IdentityError::InvalidId(format!(
                "non-hex characters in {}",
                self.id
            )));
        }
        if self.kind.is_empty() {
            return Err(IdentityError::EmptyField("kind"));
        }
        if self.namespace.is_empty() {
            return Err(IdentityError::EmptyField("namespace"));
        }
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    /// Leading `n` characters of the id, never fewer than four.
    pub fn short(&self, n: usize) -> &str {
        self.id.get(..n.max(4)).unwrap_or(&self.id)
    }
}

impl PartialEq for IdentityAnchor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.namespace == other.namespace
            && self.scope == other.scope
    }
}

impl Eq for IdentityAnchor {}

impl Hash for IdentityAnchor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.kind.hash(state);
        self.namespace.hash(state);
        self.scope.hash(state);
    }
}

impl fmt::Debug for IdentityAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IdentityAnchor({} {}/{}@{} {})",
            self.short(12),
            self.namespace,
            self.kind,
            self.scope,
            self.version
        )
    }
}

impl fmt::Display for IdentityAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Equality for anchors that may be absent. Two absent anchors are not equal.
pub fn anchor_equal(a: Option<&IdentityAnchor>, b: Option<&IdentityAnchor>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a == b)
}

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use prl_canon::{canonicalize, canonicalize_serialize, Value};
use serde::Serialize;

use crate::error::IdentityError;
use crate::version::SchemaVersion;

type Blake2b256 = Blake2b<U32>;

/// Hashed material. Field order is irrelevant: struct fields become map keys.
#[derive(Serialize)]
struct Envelope<'a> {
    version: &'a str,
    kind: &'a str,
    namespace: &'a str,
    scope: &'a str,
    payload: String,
}

/// Compute the fingerprint of a payload under the given identity metadata.
///
/// The payload is canonicalized on its own first and embedded as a string
/// in an envelope `{kind, namespace, payload, scope, version}`, which is then
/// canonicalized again so the envelope's key order is fixed as well. The
/// result is the lowercase hex BLAKE2b-256 digest of the envelope's UTF-8 bytes.
pub fn fingerprint(
    kind: &str,
    namespace: &str,
    scope: &str,
    version: SchemaVersion,
    payload: &Value,
) -> Result<String, IdentityError> {
    if kind.is_empty() {
        return Err(IdentityError::EmptyField("kind"));
    }
    if namespace.is_empty() {
        return Err(IdentityError::EmptyField("namespace"));
    }

    let envelope = Envelope {
        version: version.as_str(),
        kind,
        namespace,
        scope,
        payload: canonicalize(payload)?,
    };
    let outer = canonicalize_serialize(&envelope)?;
    Ok(hex::encode(Blake2b256::digest(outer.as_bytes())))
}

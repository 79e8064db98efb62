use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

/// Version of the fingerprint envelope.
///
/// Unknown versions are rejected at parse time rather than mapped to the
/// nearest known one, so historical ids stay comparable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SchemaVersion {
    #[default]
    V1,
}

impl SchemaVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "v1",
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaVersion {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v1" => Ok(Self::V1),
            other => Err(IdentityError::UnsupportedVersion(other.to_owned())),
        }
    }
}

impl TryFrom<String> for SchemaVersion {
    type Error = IdentityError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SchemaVersion> for String {
    fn from(v: SchemaVersion) -> Self {
        v.as_str().to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_v1_only() {
        assert_eq!("v1".parse::<SchemaVersion>().unwrap(), SchemaVersion::V1);
        for bad in ["v2", "V1", "", "v1 "] {
            assert_eq!(
                bad.parse::<SchemaVersion>(),
                Err(IdentityError::UnsupportedVersion(bad.to_owned()))
            );
        }
    }

    #[test]
    fn serde_uses_string_form() {
        assert_eq!(serde_json::to_string(&SchemaVersion::V1).unwrap(), "\"v1\"");
        assert!(serde_json::from_str::<SchemaVersion>("\"v9\"").is_err());
    }
}

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use semver::Version;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::PackageName;

/// Canonical identity of a resolved package version, displayed as `name@version`.
///
/// Two tasks resolving to equal node ids describe the same graph node, regardless of the path
/// which led to them.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId {
    pub name: PackageName,
    pub version: Version,
}

impl NodeId {
    pub fn new(name: PackageName, version: Version) -> Self {
        Self { name, version }
    }
}

impl FromStr for NodeId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        // Skip the first character, so that the scope marker of `@scope/name@1.0.0` is never
        // taken for the version separator.
        let Some(at) = s.get(1..).and_then(|rest| rest.rfind('@')).map(|i| i + 1) else {
            bail!("invalid node id `{s}`: missing version");
        };
        let name = PackageName::try_new(&s[..at])
            .with_context(|| format!("invalid node id `{s}`"))?;
        let version = Version::parse(&s[at + 1..])
            .with_context(|| format!("invalid node id `{s}`"))?;
        Ok(Self::new(name, version))
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<NodeId, D::Error> {
        let string = String::deserialize(d)?;
        string.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({self})")
    }
}

#[cfg(test)]
mod tests {
    use semver::Version;
    use test_case::test_case;

    use super::NodeId;
    use crate::core::PackageName;

    #[test]
    fn display() {
        let id = NodeId::new(PackageName::new("foo"), Version::new(1, 0, 0));
        assert_eq!(id.to_string(), "foo@1.0.0");
    }

    #[test_case("foo@1.0.0", "foo", "1.0.0")]
    #[test_case("@scope/foo@2.1.0-beta.1", "@scope/foo", "2.1.0-beta.1")]
    fn parse(input: &str, name: &str, version: &str) {
        let id: NodeId = input.parse().unwrap();
        assert_eq!(id.name, PackageName::new(name));
        assert_eq!(id.version, Version::parse(version).unwrap());
        assert_eq!(id.to_string(), input);
    }

    #[test_case("foo"; "missing version")]
    #[test_case("@scope/foo"; "scoped without version")]
    #[test_case("foo@one"; "invalid version")]
    fn parse_errors(input: &str) {
        assert!(input.parse::<NodeId>().is_err());
    }

    #[test]
    fn serializes_as_string() {
        let id = NodeId::new(PackageName::new("@a/b"), Version::new(0, 1, 2));
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""@a/b@0.1.2""#);
    }
}

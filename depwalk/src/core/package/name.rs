use std::fmt;
use std::ops::Deref;

use anyhow::{Result, bail, ensure};
use serde::{Deserialize, Deserializer, Serialize};
use smol_str::SmolStr;

/// Maximum length of a package name accepted by the npm registry.
const MAX_NAME_LENGTH: usize = 214;

/// A validated registry package name, either plain (`lodash`) or scoped (`@types/node`).
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(transparent)]
pub struct PackageName(SmolStr);

impl PackageName {
    /// Constructs and validates new [`PackageName`].
    ///
    /// Panics if name does not conform to package naming rules.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self::try_new(name).unwrap()
    }

    /// Constructs and validates new [`PackageName`].
    pub fn try_new(name: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref();
        validate(name)?;
        Ok(Self(SmolStr::new(name)))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Path segment under which this package's document lives in the registry.
    ///
    /// The registry expects the scope separator to be percent-encoded, so that the whole name
    /// forms a single path segment: `@scope/name` becomes `@scope%2Fname`.
    pub fn to_registry_path(&self) -> String {
        self.0.replacen('/', "%2F", 1)
    }
}

fn validate(name: &str) -> Result<()> {
    ensure!(!name.is_empty(), "empty string cannot be used as package name");
    ensure!(
        name.len() <= MAX_NAME_LENGTH,
        "package name `{name}` is longer than {MAX_NAME_LENGTH} characters"
    );

    let bare = match name.strip_prefix('@') {
        Some(scoped) => {
            let Some((scope, bare)) = scoped.split_once('/') else {
                bail!("scoped package name `{name}` must have the form `@scope/name`");
            };
            validate_segment(name, scope)?;
            bare
        }
        None => name,
    };
    validate_segment(name, bare)?;

    if bare.starts_with('.') || bare.starts_with('_') {
        bail!("package name `{name}` cannot start with `.` or `_`");
    }

    Ok(())
}

fn validate_segment(name: &str, segment: &str) -> Result<()> {
    ensure!(!segment.is_empty(), "package name `{name}` has an empty segment");
    for ch in segment.chars() {
        let allowed = ch.is_ascii_alphanumeric()
            || matches!(ch, '-' | '_' | '.' | '~' | '!' | '*' | '\'' | '(' | ')');
        if !allowed {
            bail!("invalid character `{ch}` in package name: `{name}`");
        }
    }
    Ok(())
}

impl Deref for PackageName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl<'de> Deserialize<'de> for PackageName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = SmolStr::deserialize(deserializer)?;
        Self::try_new(&name).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PackageName({self})")
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::PackageName;

    #[test_case("lodash")]
    #[test_case("JSONStream")]
    #[test_case("left-pad")]
    #[test_case("@types/node")]
    #[test_case("@babel/core")]
    #[test_case("lodash.merge")]
    fn valid_names(name: &str) {
        assert_eq!(PackageName::new(name).as_str(), name);
    }

    #[test_case("", "empty string cannot be used as package name")]
    #[test_case("@types", "scoped package name `@types` must have the form `@scope/name`")]
    #[test_case("@/node", "package name `@/node` has an empty segment")]
    #[test_case("foo bar", "invalid character ` ` in package name: `foo bar`")]
    #[test_case(".hidden", "package name `.hidden` cannot start with `.` or `_`")]
    #[test_case("_private", "package name `_private` cannot start with `.` or `_`")]
    fn invalid_names(name: &str, error: &str) {
        assert_eq!(PackageName::try_new(name).unwrap_err().to_string(), error);
    }

    #[test]
    fn registry_path() {
        assert_eq!(PackageName::new("express").to_registry_path(), "express");
        assert_eq!(
            PackageName::new("@scope/name").to_registry_path(),
            "@scope%2Fname"
        );
    }
}

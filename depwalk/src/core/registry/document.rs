//! Schema of package documents served by npm-style registries.
//!
//! Every field is optional and accepts the historic shapes still found in public registries.

use std::collections::BTreeMap;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::core::errors::RegistryError;
use crate::core::{PackageName, RawDocument};
use crate::internal::serdex::null_as_default;

/// Full metadata document of a single package, covering all its published versions.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PackageDocument {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "dist-tags", deserialize_with = "null_as_default")]
    pub dist_tags: BTreeMap<String, String>,
    #[serde(deserialize_with = "null_as_default")]
    pub versions: BTreeMap<String, VersionRecord>,
    #[serde(deserialize_with = "null_as_default")]
    pub time: BTreeMap<String, String>,
    pub license: Option<License>,
    #[serde(deserialize_with = "null_as_default")]
    pub keywords: Keywords,
    #[serde(deserialize_with = "null_as_default")]
    pub maintainers: Vec<Person>,
    pub homepage: Option<String>,
    pub repository: Option<Repository>,
}

impl PackageDocument {
    pub fn parse(name: &PackageName, raw: &RawDocument) -> Result<Self, RegistryError> {
        serde_json::from_str(raw.as_str()).map_err(|source| RegistryError::Parse {
            name: name.clone(),
            source,
        })
    }

    /// Look up the manifest of a published version.
    ///
    /// Version keys are usually in canonical form, but hand-edited documents may contain keys
    /// padded with whitespace, which are only found by comparing parsed versions.
    pub fn version_record(&self, version: &Version) -> Option<&VersionRecord> {
        self.versions.get(&version.to_string()).or_else(|| {
            self.versions
                .iter()
                .find(|(key, _)| {
                    Version::parse(key.trim()).is_ok_and(|parsed| &parsed == version)
                })
                .map(|(_, record)| record)
        })
    }
}

/// Manifest of a single published version.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct VersionRecord {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub license: Option<License>,
    /// Pre-2014 manifests list licenses as an array of objects.
    #[serde(deserialize_with = "null_as_default")]
    pub licenses: Vec<License>,
    pub deprecated: Option<Deprecated>,
    #[serde(deserialize_with = "null_as_default")]
    pub keywords: Keywords,
    #[serde(deserialize_with = "null_as_default")]
    pub maintainers: Vec<Person>,
    pub homepage: Option<String>,
    pub repository: Option<Repository>,
    #[serde(deserialize_with = "null_as_default")]
    pub dependencies: BTreeMap<String, String>,
}

impl VersionRecord {
    pub fn dependencies(&self) -> impl Iterator<Item = DependencySpec> + '_ {
        self.dependencies
            .iter()
            .map(|(name, range)| DependencySpec::new(name, range))
    }

    pub fn license(&self) -> Option<&str> {
        self.license
            .as_ref()
            .or_else(|| self.licenses.first())
            .and_then(License::name)
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecated.as_ref().is_some_and(Deprecated::is_set)
    }
}

/// A single `dependencies` entry of a version manifest.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DependencySpec {
    pub name: String,
    pub range: String,
}

impl DependencySpec {
    /// Creates a dependency entry, resolving aliases of the form `alias: npm:name@range` to the
    /// package they point at.
    pub fn new(name: &str, range: &str) -> Self {
        let range = range.trim();
        if let Some((target, target_range)) = range.strip_prefix("npm:").and_then(split_alias) {
            return Self {
                name: target.to_string(),
                range: target_range.to_string(),
            };
        }

        Self {
            name: name.to_string(),
            range: range.to_string(),
        }
    }
}

/// Splits `name@range` (or `@scope/name@range`) into its parts. A missing range means `latest`.
fn split_alias(spec: &str) -> Option<(&str, &str)> {
    match spec.get(1..).and_then(|rest| rest.rfind('@')) {
        Some(at) => Some((&spec[..at + 1], &spec[at + 2..])),
        None if !spec.is_empty() => Some((spec, "latest")),
        None => None,
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum License {
    Spdx(String),
    Object {
        #[serde(rename = "type")]
        kind: Option<String>,
    },
}

impl License {
    pub fn name(&self) -> Option<&str> {
        match self {
            License::Spdx(name) => Some(name),
            License::Object { kind } => kind.as_deref(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum Deprecated {
    Flag(bool),
    Message(String),
}

impl Deprecated {
    pub fn is_set(&self) -> bool {
        match self {
            Deprecated::Flag(flag) => *flag,
            Deprecated::Message(message) => !message.is_empty(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum Keywords {
    List(Vec<String>),
    Text(String),
}

impl Default for Keywords {
    fn default() -> Self {
        Keywords::List(Vec::new())
    }
}

impl Keywords {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Keywords::List(list) => list.clone(),
            Keywords::Text(text) => text
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|kw| !kw.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Keywords::List(list) => list.is_empty(),
            Keywords::Text(text) => text.trim().is_empty(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum Person {
    Text(String),
    Object {
        name: Option<String>,
        email: Option<String>,
    },
}

/// Normalized maintainer entry, as exposed in the output graph.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Maintainer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl From<&Person> for Maintainer {
    fn from(person: &Person) -> Self {
        match person {
            // Legacy `Name <email> (url)` format.
            Person::Text(text) => {
                let (name, rest) = match text.split_once('<') {
                    Some((name, rest)) => (name, Some(rest)),
                    None => (text.as_str(), None),
                };
                let name = name.trim();
                Maintainer {
                    name: (!name.is_empty()).then(|| name.to_string()),
                    email: rest
                        .and_then(|rest| rest.split_once('>'))
                        .map(|(email, _)| email.trim().to_string()),
                }
            }
            Person::Object { name, email } => Maintainer {
                name: name.clone(),
                email: email.clone(),
            },
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum Repository {
    Url(String),
    Object {
        #[serde(rename = "type")]
        kind: Option<String>,
        url: Option<String>,
        directory: Option<String>,
    },
}

/// Normalized repository pointer, as exposed in the output graph.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct RepositoryPointer {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

impl Repository {
    pub fn to_pointer(&self) -> Option<RepositoryPointer> {
        match self {
            Repository::Url(url) => Some(RepositoryPointer {
                kind: None,
                url: url.clone(),
                directory: None,
            }),
            Repository::Object {
                kind,
                url,
                directory,
            } => url.as_ref().map(|url| RepositoryPointer {
                kind: kind.clone(),
                url: url.clone(),
                directory: directory.clone(),
            }),
        }
    }
}

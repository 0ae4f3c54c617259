use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value, json};

/// Builder of npm registry package documents (packuments).
///
/// Unless set explicitly, the `latest` dist-tag points at the last added version.
#[derive(Clone, Debug, Default)]
pub struct DocumentBuilder {
    name: String,
    versions: Vec<VersionBuilder>,
    dist_tags: BTreeMap<String, String>,
    fields: Map<String, Value>,
}

impl DocumentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(mut self, version: VersionBuilder) -> Self {
        self.versions.push(version);
        self
    }

    /// Shorthand for adding a version with the given `(name, range)` dependencies.
    pub fn release(self, version: &str, dependencies: &[(&str, &str)]) -> Self {
        let version = dependencies
            .iter()
            .fold(VersionBuilder::new(version), |builder, (name, range)| {
                builder.dep(*name, *range)
            });
        self.version(version)
    }

    pub fn dist_tag(mut self, tag: impl Into<String>, version: impl Into<String>) -> Self {
        self.dist_tags.insert(tag.into(), version.into());
        self
    }

    /// Set a top-level field, e.g. `description` or `time`.
    pub fn field(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.fields
            .insert(key.into(), serde_json::to_value(value).unwrap());
        self
    }

    pub fn build(&self) -> Value {
        let mut dist_tags = self.dist_tags.clone();
        if let Some(last) = self.versions.last() {
            dist_tags
                .entry("latest".to_string())
                .or_insert_with(|| last.version.clone());
        }

        let versions = self
            .versions
            .iter()
            .map(|version| (version.version.clone(), version.build(&self.name)))
            .collect::<Map<_, _>>();

        let mut document = json!({
            "name": self.name,
            "dist-tags": dist_tags,
            "versions": versions,
        });
        if let Value::Object(document) = &mut document {
            document.extend(self.fields.clone());
        }
        document
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(&self.build()).unwrap()
    }
}

/// Builder of a single version record inside a package document.
#[derive(Clone, Debug)]
pub struct VersionBuilder {
    version: String,
    dependencies: Vec<(String, String)>,
    fields: Map<String, Value>,
}

impl VersionBuilder {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            dependencies: Vec::new(),
            fields: Map::new(),
        }
    }

    pub fn dep(mut self, name: impl Into<String>, range: impl Into<String>) -> Self {
        self.dependencies.push((name.into(), range.into()));
        self
    }

    /// Set a field of the version record, e.g. `license` or `deprecated`.
    pub fn field(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.fields
            .insert(key.into(), serde_json::to_value(value).unwrap());
        self
    }

    fn build(&self, name: &str) -> Value {
        let dependencies = self
            .dependencies
            .iter()
            .map(|(name, range)| (name.clone(), Value::from(range.as_str())))
            .collect::<Map<_, _>>();

        let mut record = json!({
            "name": name,
            "version": self.version,
            "dependencies": dependencies,
        });
        if let Value::Object(record) = &mut record {
            record.extend(self.fields.clone());
        }
        record
    }
}

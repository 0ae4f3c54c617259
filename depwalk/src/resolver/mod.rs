//! Selection of the single best version of a package for a requested range.

use std::collections::BTreeMap;

use semver::Version;
use tracing::{debug, trace};

pub use range::{InvalidRange, VersionRange};

mod range;

/// Dist-tag which keeps its wildcard meaning when used as a range.
pub const LATEST_TAG: &str = "latest";

/// Pick the highest version from `versions` satisfying `range`.
///
/// * `latest` and an empty range mean `*`.
/// * For alias forms like `name@range`, only the part after the last `@` is considered.
/// * A range naming a dist-tag other than `latest` resolves to that tag's version, provided the
///   version is published.
/// * If a wildcard range matches nothing because every published version is a pre-release,
///   the version pointed to by the `latest` dist-tag is returned instead.
///
/// Versions that are not valid semantic versions are ignored. Returns `None` if nothing matches
/// or the range cannot be parsed.
pub fn resolve<'a>(
    range: &str,
    versions: impl IntoIterator<Item = &'a str>,
    dist_tags: &BTreeMap<String, String>,
) -> Option<Version> {
    let versions = versions
        .into_iter()
        .filter_map(|version| Version::parse(version.trim()).ok())
        .collect::<Vec<_>>();

    let range = normalize(range);

    if range != LATEST_TAG {
        if let Some(tagged) = dist_tags.get(range) {
            if let Some(version) = versions.iter().find(|v| v.to_string() == tagged.trim()) {
                trace!("range `{range}` resolved through dist-tag to {version}");
                return Some(version.clone());
            }
        }
    }

    let range_expr = if range == LATEST_TAG { "*" } else { range };
    let parsed = match VersionRange::parse(range_expr) {
        Ok(parsed) => parsed,
        Err(err) => {
            debug!("{err}");
            return None;
        }
    };

    let best = versions.iter().filter(|v| parsed.matches(v)).max().cloned();
    if best.is_some() {
        return best;
    }

    let only_pre_releases = !versions.is_empty() && versions.iter().all(|v| !v.pre.is_empty());
    if parsed.is_any() && only_pre_releases {
        let latest = dist_tags
            .get(LATEST_TAG)
            .and_then(|tag| Version::parse(tag.trim()).ok());
        if let Some(latest) = &latest {
            trace!("only pre-releases published, falling back to latest dist-tag {latest}");
        }
        return latest;
    }

    None
}

fn normalize(range: &str) -> &str {
    let range = range.trim();
    let range = match range.rfind('@') {
        Some(at) => &range[at + 1..],
        None => range,
    };
    range.trim()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use semver::Version;
    use test_case::test_case;

    use super::resolve;

    fn tags(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn check(range: &str, versions: &[&str], dist_tags: &[(&str, &str)]) -> Option<String> {
        resolve(range, versions.iter().copied(), &tags(dist_tags)).map(|v| v.to_string())
    }

    #[test]
    fn picks_highest_caret_match() {
        assert_eq!(
            check("^1.2.0", &["1.1.0", "1.2.0", "1.3.5", "2.0.0"], &[]),
            Some("1.3.5".into())
        );
    }

    #[test]
    fn pre_release_only_falls_back_to_latest_tag() {
        assert_eq!(
            check(
                "*",
                &["1.0.0-alpha", "2.0.0-beta"],
                &[("latest", "2.0.0-beta")]
            ),
            Some("2.0.0-beta".into())
        );
    }

    #[test]
    fn unsatisfiable_range() {
        assert_eq!(check("^9.9.9", &["1.0.0"], &[]), None);
    }

    #[test_case("latest", &["1.0.0", "2.0.0", "3.0.0-rc.1"], Some("2.0.0"); "latest is wildcard")]
    #[test_case("", &["0.1.0", "0.2.0"], Some("0.2.0"); "empty")]
    #[test_case("npm:other@^1.0.0", &["1.0.0", "1.4.2", "2.0.0"], Some("1.4.2"); "alias")]
    #[test_case("next", &["1.0.0", "2.0.0-rc.1"], Some("2.0.0-rc.1"); "dist tag")]
    #[test_case("canary", &["1.0.0"], None; "dangling dist tag")]
    #[test_case("1.0.0", &["1.0.0", "1.0.1"], Some("1.0.0"); "exact")]
    #[test_case("^1.0.0", &["1.0.0", "1.1.0-beta.1"], Some("1.0.0"); "release over pre-release")]
    #[test_case("^1", &[], None; "no versions")]
    #[test_case("*", &["not-a-version", "0.0.1"], Some("0.0.1"); "invalid versions skipped")]
    #[test_case("github:user/repo", &["1.0.0"], None; "non semver specifier")]
    fn resolution(range: &str, versions: &[&str], expected: Option<&str>) {
        let dist_tags = [("latest", "2.0.0"), ("next", "2.0.0-rc.1"), ("canary", "9.9.9")];
        assert_eq!(
            check(range, versions, &dist_tags),
            expected.map(str::to_string)
        );
    }

    #[test]
    fn pre_release_fallback_requires_wildcard() {
        assert_eq!(
            check("^2.0.0", &["2.0.0-beta"], &[("latest", "2.0.0-beta")]),
            None
        );
    }

    #[test]
    fn pre_release_fallback_requires_latest_tag() {
        assert_eq!(check("*", &["1.0.0-alpha"], &[]), None);
    }

    #[test]
    fn non_wildcard_does_not_fall_back() {
        assert_eq!(
            resolve(
                ">=5",
                ["1.0.0", "5.0.0-alpha"],
                &tags(&[("latest", "5.0.0-alpha")])
            ),
            None::<Version>
        );
    }
}

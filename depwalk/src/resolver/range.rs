//! npm flavoured version ranges, evaluated with [`semver::VersionReq`].
//!
//! npm accepts a richer syntax than Cargo: `||` unions, hyphen ranges, space separated
//! comparators, `x` wildcards and bare versions meaning an exact match. Each `||` alternative is
//! rewritten into a Cargo requirement with equivalent semantics, including pre-release handling
//! (a pre-release only matches comparators naming the same `major.minor.patch`).

use std::fmt;

use itertools::Itertools;
use semver::{Prerelease, Version, VersionReq};
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
#[error("invalid version range `{range}`: {reason}")]
pub struct InvalidRange {
    pub range: String,
    pub reason: String,
}

/// A union of version requirements.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VersionRange {
    alternatives: Vec<VersionReq>,
}

impl VersionRange {
    pub fn parse(range: &str) -> Result<Self, InvalidRange> {
        let invalid = |reason: String| InvalidRange {
            range: range.to_string(),
            reason,
        };

        let mut alternatives = Vec::new();
        for set in range.split("||") {
            if let Some(req) = parse_set(set).map_err(invalid)? {
                alternatives.push(req);
            }
        }
        Ok(Self { alternatives })
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    /// Whether this range accepts any release version.
    pub fn is_any(&self) -> bool {
        self.alternatives
            .iter()
            .any(|req| req.comparators.is_empty())
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.alternatives.is_empty() {
            return f.write_str("<never>");
        }
        write!(f, "{}", self.alternatives.iter().join(" || "))
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Op {
    Exact,
    Greater,
    GreaterEq,
    Less,
    LessEq,
    Tilde,
    Caret,
}

impl Op {
    fn as_cargo(self) -> &'static str {
        match self {
            Op::Exact => "=",
            Op::Greater => ">",
            Op::GreaterEq => ">=",
            Op::Less => "<",
            Op::LessEq => "<=",
            Op::Tilde => "~",
            Op::Caret => "^",
        }
    }
}

/// A possibly incomplete version. Missing components are either omitted or wildcards.
#[derive(Debug, Default)]
struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    pre: Option<Prerelease>,
}

enum Bound {
    Any,
    Never,
    Comparator(String),
}

/// Parses one `||` alternative. Returns `None` if it cannot match any version.
fn parse_set(set: &str) -> Result<Option<VersionReq>, String> {
    let tokens = set
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .collect_vec();

    let mut bounds = Vec::new();
    if let [low, "-", high] = tokens.as_slice() {
        bounds.push(bound(Op::GreaterEq, parse_partial(low)?));
        bounds.push(bound(Op::LessEq, parse_partial(high)?));
    } else {
        let mut tokens = tokens.into_iter();
        while let Some(token) = tokens.next() {
            let (op, rest) = split_op(token);
            // Allow whitespace between an operator and its version: `>= 1.2.3`.
            let rest = match rest {
                "" => tokens
                    .next()
                    .ok_or_else(|| format!("operator `{token}` is missing a version"))?,
                rest => rest,
            };
            bounds.push(bound(op, parse_partial(rest)?));
        }
    }

    let mut comparators = Vec::new();
    for bound in bounds {
        match bound {
            Bound::Any => {}
            Bound::Never => return Ok(None),
            Bound::Comparator(comparator) => comparators.push(comparator),
        }
    }

    if comparators.is_empty() {
        return Ok(Some(VersionReq::STAR));
    }
    VersionReq::parse(&comparators.join(", "))
        .map(Some)
        .map_err(|err| err.to_string())
}

fn split_op(token: &str) -> (Op, &str) {
    const OPS: [(&str, Op); 9] = [
        ("<=", Op::LessEq),
        (">=", Op::GreaterEq),
        ("~>", Op::Tilde),
        ("<", Op::Less),
        (">", Op::Greater),
        ("=", Op::Exact),
        ("~", Op::Tilde),
        ("^", Op::Caret),
        ("", Op::Exact),
    ];
    OPS.iter()
        .find_map(|(prefix, op)| token.strip_prefix(prefix).map(|rest| (*op, rest)))
        .unwrap_or((Op::Exact, token))
}

fn parse_partial(text: &str) -> Result<Partial, String> {
    let text = text.trim_start_matches(['v', '=']);
    // Build metadata never affects matching.
    let text = text.split_once('+').map_or(text, |(version, _)| version);
    let (core, pre) = match text.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (text, None),
    };

    let mut components = core.split('.');
    let mut next = |name: &str| -> Result<Option<u64>, String> {
        match components.next() {
            None | Some("x" | "X" | "*") => Ok(None),
            Some(number) => number
                .parse()
                .map(Some)
                .map_err(|_| format!("invalid {name} version component `{number}`")),
        }
    };
    let mut partial = Partial {
        major: next("major")?,
        ..Partial::default()
    };
    if partial.major.is_some() {
        partial.minor = next("minor")?;
    }
    if partial.minor.is_some() {
        partial.patch = next("patch")?;
    }
    if components.next().is_some() {
        return Err(format!("unexpected trailing version components in `{text}`"));
    }

    if let (Some(pre), Some(_)) = (pre, partial.patch) {
        let pre = Prerelease::new(pre).map_err(|err| err.to_string())?;
        partial.pre = Some(pre);
    }
    Ok(partial)
}

fn bound(op: Op, partial: Partial) -> Bound {
    let Some(major) = partial.major else {
        return match op {
            Op::Greater | Op::Less => Bound::Never,
            _ => Bound::Any,
        };
    };

    let mut comparator = format!("{}{major}", op.as_cargo());
    if let Some(minor) = partial.minor {
        comparator.push_str(&format!(".{minor}"));
    }
    if let Some(patch) = partial.patch {
        comparator.push_str(&format!(".{patch}"));
    }
    if let Some(pre) = partial.pre.filter(|pre| !pre.is_empty()) {
        comparator.push_str(&format!("-{pre}"));
    }
    Bound::Comparator(comparator)
}

#[cfg(test)]
mod tests {
    use semver::Version;
    use test_case::test_case;

    use super::VersionRange;

    fn matches(range: &str, version: &str) -> bool {
        VersionRange::parse(range)
            .unwrap()
            .matches(&Version::parse(version).unwrap())
    }

    #[test_case("^1.2.0", "1.3.5", true)]
    #[test_case("^1.2.0", "2.0.0", false)]
    #[test_case("^0.2.3", "0.2.9", true)]
    #[test_case("^0.2.3", "0.3.0", false)]
    #[test_case("~1.2.3", "1.2.9", true)]
    #[test_case("~1.2.3", "1.3.0", false)]
    #[test_case("~>1.2", "1.2.7", true)]
    #[test_case("1.2.3", "1.2.3", true; "bare version is exact")]
    #[test_case("1.2.3", "1.2.4", false; "bare version rejects others")]
    #[test_case("v1.2.3", "1.2.3", true)]
    #[test_case("=1.2.3", "1.2.3", true)]
    #[test_case("1.2", "1.2.8", true; "partial means x range")]
    #[test_case("1.2", "1.3.0", false; "partial rejects next minor")]
    #[test_case("1.x", "1.9.0", true)]
    #[test_case("1.2.X", "1.2.5", true)]
    #[test_case("1.*", "2.0.0", false)]
    #[test_case("*", "3.1.4", true)]
    #[test_case("", "3.1.4", true; "empty range")]
    #[test_case(">=1.0.0 <2.0.0", "1.5.0", true)]
    #[test_case(">= 1.0.0 < 2.0.0", "2.0.0", false; "spaced operators")]
    #[test_case(">1.2", "1.2.9", false; "greater than partial")]
    #[test_case(">1.2", "1.3.0", true; "greater than partial next minor")]
    #[test_case("1.2.3 - 2.3.4", "2.3.4", true)]
    #[test_case("1.2.3 - 2.3", "2.3.9", true; "hyphen partial upper bound")]
    #[test_case("1.2.3 - 2.3", "2.4.0", false; "hyphen partial upper bound exclusive")]
    #[test_case("^1.0.0 || ^3.0.0", "3.2.0", true)]
    #[test_case("^1.0.0 || ^3.0.0", "2.2.0", false)]
    #[test_case("^1.0.0", "1.1.0-beta.1", false; "pre-release excluded")]
    #[test_case("^1.1.0-beta.0", "1.1.0-beta.1", true; "pre-release on same tuple")]
    #[test_case("*", "1.0.0-alpha", false; "wildcard excludes pre-release")]
    #[test_case("<*", "1.0.0", false; "never")]
    fn range_matches(range: &str, version: &str, expected: bool) {
        assert_eq!(matches(range, version), expected);
    }

    #[test_case("*", true)]
    #[test_case("x", true)]
    #[test_case("1.x || *", true)]
    #[test_case("^1.0.0", false)]
    fn is_any(range: &str, expected: bool) {
        assert_eq!(VersionRange::parse(range).unwrap().is_any(), expected);
    }

    #[test_case("git+https://github.com/a/b.git")]
    #[test_case("file:../foo")]
    #[test_case("workspace:*")]
    #[test_case(">=")]
    #[test_case("1.2.3.4")]
    fn invalid(range: &str) {
        assert!(VersionRange::parse(range).is_err());
    }
}

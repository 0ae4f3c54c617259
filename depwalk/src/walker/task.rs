use std::fmt;

use crate::core::{NodeId, PackageName};

/// A pending request to resolve and expand one dependency.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Task {
    pub package: PackageName,
    pub range: String,
    /// Node which declared this dependency, `None` for the root of a walk.
    pub parent: Option<NodeId>,
}

impl Task {
    pub fn root(package: PackageName, range: impl Into<String>) -> Self {
        Self {
            package,
            range: range.into(),
            parent: None,
        }
    }

    pub fn child(package: PackageName, range: impl Into<String>, parent: NodeId) -> Self {
        Self {
            package,
            range: range.into(),
            parent: Some(parent),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{} {}`", self.package, self.range)?;
        if let Some(parent) = &self.parent {
            write!(f, " (required by {parent})")?;
        }
        Ok(())
    }
}

use thiserror::Error;

use crate::core::PackageName;
use crate::walker::Task;

/// Failures of the registry fetch path, after the request has been issued.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to fetch `{name}` from registry")]
    Transport {
        name: PackageName,
        #[source]
        source: anyhow::Error,
    },

    #[error("registry responded with status {status} when fetching `{name}`")]
    Status { name: PackageName, status: u16 },

    #[error("failed to deserialize registry document of `{name}`")]
    Parse {
        name: PackageName,
        #[source]
        source: serde_json::Error,
    },
}

/// An error that prunes one branch of the walk, without affecting the rest of it.
#[derive(Debug, Error)]
pub enum SoftFailure {
    #[error("package `{name}` not found in registry")]
    NotFound { name: PackageName },

    #[error("no version of `{name}` satisfies `{range}`")]
    Unresolvable { name: PackageName, range: String },

    #[error("invalid dependency name `{name}`")]
    InvalidName {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Fetch(#[from] RegistryError),
}

/// An error that aborts the entire walk. No graph is produced when one of these occurs.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("dependency walk aborted while processing {task}")]
    Aborted {
        task: Task,
        #[source]
        source: anyhow::Error,
    },

    #[error("worker panicked while processing {task}: {message}")]
    WorkerPanicked { task: Task, message: String },

    #[error("failed to join walker worker")]
    WorkerJoin(#[source] tokio::task::JoinError),
}

use std::process::ExitCode;

use thiserror::Error;

/// Exit code of a walk aborted by a hard failure.
pub const WALK_ABORTED: u8 = 3;

/// The error type used at the CLI layer to request a specific process exit code.
#[derive(Error, Debug)]
#[error("ErrorWithExitCode exit_code: {:?}", exit_code)]
pub struct ErrorWithExitCode {
    /// The error to display. This can be `None` in rare cases to exit with a
    /// code without displaying a message.
    #[source]
    pub source: Option<anyhow::Error>,
    /// The process exit code.
    pub exit_code: ExitCode,
}

impl ErrorWithExitCode {
    pub fn new(error: anyhow::Error, code: ExitCode) -> Self {
        Self {
            source: Some(error),
            exit_code: code,
        }
    }
}

impl From<anyhow::Error> for ErrorWithExitCode {
    fn from(err: anyhow::Error) -> ErrorWithExitCode {
        ErrorWithExitCode::new(err, ExitCode::FAILURE)
    }
}

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A specialized `Result` type for bridge operations.
pub type AdbResult<T> = Result<T, AdbError>;

/// Failures of a single adb invocation. The client never retries; callers decide.
#[derive(Debug, Error)]
pub enum AdbError {
    #[error("Failed to launch '{}': {source}", program.display())]
    Launch {
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("'{command}' timed out after {duration:?}")]
    Timeout { command: String, duration: Duration },

    #[error("'{command}' failed: {output}")]
    CommandFailed { command: String, output: String },

    #[error("Unexpected output from '{command}': {output}")]
    UnexpectedOutput { command: String, output: String },
}

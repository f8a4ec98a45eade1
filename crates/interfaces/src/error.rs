//! Interface-level error type.

use thiserror::Error;

/// Errors returned by an interface's `run` method.
#[derive(Debug, Error)]
pub enum InterfaceError {
    /// A required input port was absent or had the wrong shape.
    #[error("missing or invalid input port '{0}'")]
    MissingInput(String),

    /// The external program could not be spawned at all.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The external program ran but exited with a nonzero status.
    #[error("'{program}' exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    /// Filesystem error while preparing inputs or collecting outputs.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A sidecar or config file could not be parsed.
    #[error("parse error in {path}: {message}")]
    Parse { path: String, message: String },
}

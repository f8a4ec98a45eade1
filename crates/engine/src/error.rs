//! Engine-level error types.

use thiserror::Error;

use interfaces::InterfaceError;

/// Errors produced by the workflow engine (validation + execution).
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Validation errors ------

    /// Two or more nodes share the same name.
    #[error("duplicate node name: '{0}'")]
    DuplicateNodeName(String),

    /// An edge references a node name that doesn't exist in the workflow.
    #[error("edge references unknown node '{node}' ({side} side)")]
    UnknownNodeReference { node: String, side: &'static str },

    /// Topological sort detected a cycle.
    #[error("workflow graph contains a cycle")]
    CycleDetected,

    // ------ Execution errors ------

    /// An upstream node finished without producing a port an edge needs.
    #[error("node '{node}' produced no output port '{port}'")]
    MissingUpstreamOutput { node: String, port: String },

    /// A node's interface failed; the run is aborted.
    #[error("node '{node}' failed: {source}")]
    NodeFailed {
        node: String,
        #[source]
        source: InterfaceError,
    },

    /// A worker task panicked or was cancelled.
    #[error("worker task for node '{node}' aborted: {message}")]
    TaskAborted { node: String, message: String },

    /// Filesystem error while preparing node directories or cache files.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A cached node result could not be read or written.
    #[error("cache serialization error: {0}")]
    Cache(#[from] serde_json::Error),
}

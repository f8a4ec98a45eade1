//! The `Interface` trait — the contract every workflow node must fulfil.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::InterfaceError;

/// Named input/output ports of a node. Values are file paths (strings),
/// lists of paths, or parsed metadata objects.
pub type PortMap = HashMap<String, Value>;

/// Per-node context passed to every interface during execution.
///
/// Defined here (in the interfaces crate) so both the engine and individual
/// interface implementations can import it without a circular dependency.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Fully-qualified node name (workflow prefix included).
    pub node_name: String,
    /// Scratch directory reserved for this node; already exists.
    pub node_dir: PathBuf,
}

/// The core interface trait.
///
/// `run` receives the resolved input ports (static inputs merged with
/// upstream outputs) and returns the node's output ports.
#[async_trait]
pub trait Interface: Send + Sync {
    async fn run(&self, inputs: &PortMap, ctx: &RunContext) -> Result<PortMap, InterfaceError>;
}

/// Pull a string-valued (path) port out of the input map.
pub fn path_input<'a>(inputs: &'a PortMap, port: &str) -> Result<&'a str, InterfaceError> {
    inputs
        .get(port)
        .and_then(Value::as_str)
        .ok_or_else(|| InterfaceError::MissingInput(port.to_owned()))
}

/// Pull a list-of-paths port; a bare string is treated as a one-element list.
pub fn path_list_input(inputs: &PortMap, port: &str) -> Result<Vec<String>, InterfaceError> {
    match inputs.get(port) {
        Some(Value::String(s)) => Ok(vec![s.clone()]),
        Some(Value::Array(items)) => {
            let paths: Option<Vec<String>> = items
                .iter()
                .map(|v| v.as_str().map(str::to_owned))
                .collect();
            paths.ok_or_else(|| InterfaceError::MissingInput(port.to_owned()))
        }
        _ => Err(InterfaceError::MissingInput(port.to_owned())),
    }
}

/// Absolute path of an output file inside the node's scratch directory.
pub fn out_path(node_dir: &Path, file_name: &str) -> String {
    node_dir.join(file_name).to_string_lossy().into_owned()
}

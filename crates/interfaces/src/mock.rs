//! `MockInterface` — a test double for `Interface`.
//!
//! Useful in engine and pipeline tests where running the real neuroimaging
//! binaries is either unavailable or irrelevant.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::traits::{Interface, PortMap, RunContext};
use crate::InterfaceError;

/// Behaviour injected into `MockInterface` at construction time.
pub enum MockBehaviour {
    /// Succeed with a fixed set of output ports.
    ReturnPorts(PortMap),
    /// Fail with a command error carrying the given message.
    Fail(String),
}

/// A mock interface that records every call it receives and returns a
/// programmer-specified result.
pub struct MockInterface {
    /// Label used in test assertions.
    pub name: String,
    pub behaviour: MockBehaviour,
    /// All input maps seen by this interface (in call order).
    pub calls: Arc<Mutex<Vec<PortMap>>>,
}

impl MockInterface {
    /// Create a mock that always succeeds with the given output ports.
    pub fn returning<I, S>(name: impl Into<String>, ports: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            behaviour: MockBehaviour::ReturnPorts(
                ports.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            ),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that always fails.
    pub fn failing(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            behaviour: MockBehaviour::Fail(msg.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of times this interface has been executed.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Inputs received on the `n`-th call.
    pub fn inputs_seen(&self, n: usize) -> PortMap {
        self.calls.lock().unwrap()[n].clone()
    }
}

#[async_trait]
impl Interface for MockInterface {
    async fn run(&self, inputs: &PortMap, _ctx: &RunContext) -> Result<PortMap, InterfaceError> {
        self.calls.lock().unwrap().push(inputs.clone());

        match &self.behaviour {
            MockBehaviour::ReturnPorts(ports) => Ok(ports.clone()),
            MockBehaviour::Fail(msg) => Err(InterfaceError::CommandFailed {
                program: self.name.clone(),
                status: "exit status: 1".to_owned(),
                stderr: msg.clone(),
            }),
        }
    }
}

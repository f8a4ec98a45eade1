//! Workflow execution.
//!
//! `WorkflowExecutor` is the orchestrator:
//! 1. Validates the DAG and produces a topological ordering.
//! 2. Resolves each node's inputs from upstream outputs via the edges.
//! 3. Dispatches ready nodes onto worker tasks, bounded by the plugin's
//!    process count.
//! 4. Caches completed node results under the node's working directory and
//!    skips nodes whose cached result is still valid.
//! 5. Writes a crash dump and aborts the run when a node fails.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

use interfaces::{Interface, PortMap, RunContext};

use crate::dag::validate_dag;
use crate::models::{Selector, Workflow};
use crate::EngineError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Scheduling plugin, mirroring the settings surface of the run command.
#[derive(Debug, Clone, PartialEq)]
pub enum Plugin {
    /// Run nodes one at a time.
    Linear,
    /// Run up to `n_procs` nodes concurrently.
    MultiProc {
        n_procs: usize,
        /// Soft memory ceiling, advisory only; recorded in the run log.
        memory_gb: Option<f64>,
    },
}

/// Tuning knobs for the executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub plugin: Plugin,
    /// Fallback crash-dump directory for nodes that don't carry their own.
    pub crashdump_dir: Option<PathBuf>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            plugin: Plugin::Linear,
            crashdump_dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Output of a completed run
// ---------------------------------------------------------------------------

/// The result of running a full workflow.
#[derive(Debug, Default)]
pub struct ExecutionReport {
    /// Nodes that actually executed, in completion order.
    pub executed: Vec<String>,
    /// Nodes satisfied from a previous run's cached result.
    pub cached: Vec<String>,
}

/// What a node writes into `result.json` on success. A later run replays the
/// outputs when the recorded inputs match and the output files still exist.
#[derive(Debug, Serialize, Deserialize)]
struct CachedResult {
    inputs: PortMap,
    outputs: PortMap,
}

// ---------------------------------------------------------------------------
// WorkflowExecutor
// ---------------------------------------------------------------------------

/// Stateless orchestrator that runs a single workflow graph.
pub struct WorkflowExecutor {
    config: ExecutorConfig,
}

impl WorkflowExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Run the workflow, placing per-node scratch directories under
    /// `<work_dir>/<workflow name>/<node name>`.
    ///
    /// # Errors
    /// Returns `EngineError` for validation failures, node failures, or
    /// filesystem problems. The first node failure aborts scheduling;
    /// already-running nodes are drained before the error is returned.
    #[instrument(skip(self, workflow), fields(workflow = %workflow.name))]
    pub async fn run(
        &self,
        workflow: &Workflow,
        work_dir: &Path,
    ) -> Result<ExecutionReport, EngineError> {
        let order = validate_dag(workflow)?;
        info!(nodes = order.len(), "DAG validated");

        let n_procs = match self.config.plugin {
            Plugin::Linear => 1,
            Plugin::MultiProc { n_procs, memory_gb } => {
                if let Some(gb) = memory_gb {
                    info!(memory_gb = gb, "memory ceiling requested");
                }
                n_procs.max(1)
            }
        };
        let semaphore = Arc::new(Semaphore::new(n_procs));

        // Edge index and dependency bookkeeping.
        let mut in_edges: HashMap<&str, Vec<&crate::models::Edge>> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut pending_deps: HashMap<&str, usize> = HashMap::new();
        for name in &order {
            pending_deps.insert(name.as_str(), 0);
        }
        for edge in &workflow.edges {
            in_edges.entry(edge.to.as_str()).or_default().push(edge);
            dependents
                .entry(edge.from.as_str())
                .or_default()
                .push(edge.to.as_str());
            *pending_deps.entry(edge.to.as_str()).or_insert(0) += 1;
        }

        let mut ready: VecDeque<String> = order
            .iter()
            .filter(|n| pending_deps[n.as_str()] == 0)
            .cloned()
            .collect();

        let mut outputs: HashMap<String, PortMap> = HashMap::new();
        let mut report = ExecutionReport::default();
        let mut failure: Option<EngineError> = None;

        type Outcome = (String, Result<(PortMap, bool), EngineError>);
        let mut tasks: JoinSet<Outcome> = JoinSet::new();

        loop {
            while failure.is_none() {
                let Some(name) = ready.pop_front() else { break };

                let node = workflow
                    .node(&name)
                    .expect("validated workflow contains every sorted node");
                let inputs = resolve_inputs(in_edges.get(name.as_str()), &node.inputs, &outputs)?;

                let node_dir = work_dir.join(&workflow.name).join(&name);
                std::fs::create_dir_all(&node_dir)?;

                let crashdump = node
                    .crashdump_dir
                    .clone()
                    .or_else(|| self.config.crashdump_dir.clone());

                let interface = Arc::clone(&node.interface);
                let sem = Arc::clone(&semaphore);
                let task_name = name.clone();
                tasks.spawn(async move {
                    // The semaphore is never closed, so acquisition only
                    // waits for a free worker slot.
                    let _permit = sem
                        .acquire_owned()
                        .await
                        .expect("executor semaphore closed");
                    let result =
                        run_node(&task_name, interface, inputs, node_dir, crashdump).await;
                    (task_name, result)
                });
            }

            let Some(joined) = tasks.join_next().await else { break };

            match joined {
                Ok((name, Ok((node_outputs, was_cached)))) => {
                    if was_cached {
                        info!(node = %name, "cached result reused");
                        report.cached.push(name.clone());
                    } else {
                        info!(node = %name, "node finished");
                        report.executed.push(name.clone());
                    }

                    for dep in dependents.get(name.as_str()).into_iter().flatten() {
                        let remaining = pending_deps
                            .get_mut(dep)
                            .expect("dependent is a known node");
                        *remaining -= 1;
                        if *remaining == 0 {
                            ready.push_back((*dep).to_owned());
                        }
                    }
                    outputs.insert(name, node_outputs);
                }
                Ok((name, Err(e))) => {
                    error!(node = %name, error = %e, "node failed, aborting run");
                    failure.get_or_insert(e);
                }
                Err(join_err) => {
                    warn!(error = %join_err, "worker task aborted");
                    failure.get_or_insert(EngineError::TaskAborted {
                        node: "<unknown>".to_owned(),
                        message: join_err.to_string(),
                    });
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}

// ---------------------------------------------------------------------------
// Input resolution
// ---------------------------------------------------------------------------

fn resolve_inputs(
    edges: Option<&Vec<&crate::models::Edge>>,
    static_inputs: &PortMap,
    outputs: &HashMap<String, PortMap>,
) -> Result<PortMap, EngineError> {
    let mut inputs = static_inputs.clone();

    for edge in edges.into_iter().flatten() {
        let upstream = outputs
            .get(&edge.from)
            .and_then(|ports| ports.get(&edge.from_port))
            .ok_or_else(|| EngineError::MissingUpstreamOutput {
                node: edge.from.clone(),
                port: edge.from_port.clone(),
            })?;

        let value = match (edge.selector, upstream) {
            (Selector::First, Value::Array(items)) => items
                .first()
                .cloned()
                .ok_or_else(|| EngineError::MissingUpstreamOutput {
                    node: edge.from.clone(),
                    port: edge.from_port.clone(),
                })?,
            _ => upstream.clone(),
        };

        inputs.insert(edge.to_port.clone(), value);
    }

    Ok(inputs)
}

// ---------------------------------------------------------------------------
// Single-node execution with caching and crash dumps
// ---------------------------------------------------------------------------

async fn run_node(
    name: &str,
    interface: Arc<dyn Interface>,
    inputs: PortMap,
    node_dir: PathBuf,
    crashdump_dir: Option<PathBuf>,
) -> Result<(PortMap, bool), EngineError> {
    let result_path = node_dir.join("result.json");

    if result_path.exists() {
        let raw = tokio::fs::read_to_string(&result_path).await?;
        if let Ok(cached) = serde_json::from_str::<CachedResult>(&raw) {
            if cached.inputs == inputs && outputs_intact(&cached.outputs) {
                return Ok((cached.outputs, true));
            }
        }
        // Stale or unreadable cache: fall through and re-run.
    }

    let ctx = RunContext {
        node_name: name.to_owned(),
        node_dir: node_dir.clone(),
    };

    match interface.run(&inputs, &ctx).await {
        Ok(node_outputs) => {
            let cached = CachedResult {
                inputs,
                outputs: node_outputs.clone(),
            };
            tokio::fs::write(&result_path, serde_json::to_vec_pretty(&cached)?).await?;
            Ok((node_outputs, false))
        }
        Err(e) => {
            if let Some(dir) = &crashdump_dir {
                if let Err(dump_err) = write_crash_dump(dir, name, &e, &inputs).await {
                    warn!(node = %name, error = %dump_err, "failed to write crash dump");
                }
            }
            Err(EngineError::NodeFailed {
                node: name.to_owned(),
                source: e,
            })
        }
    }
}

/// Every path-valued output recorded in the cache must still exist on disk.
fn outputs_intact(outputs: &PortMap) -> bool {
    outputs.values().all(|value| match value {
        Value::String(path) => Path::new(path).exists(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .all(|path| Path::new(path).exists()),
        _ => true,
    })
}

async fn write_crash_dump(
    dir: &Path,
    node: &str,
    error: &interfaces::InterfaceError,
    inputs: &PortMap,
) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    let path = dir.join(format!("crash-{stamp}-{node}.txt"));
    let body = format!(
        "node: {node}\nerror: {error}\ninputs: {}\n",
        serde_json::to_string_pretty(inputs).unwrap_or_else(|_| "<unserializable>".to_owned()),
    );
    tokio::fs::write(path, body).await
}

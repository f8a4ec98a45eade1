//! `engine` crate — the workflow graph model, DAG validation, and the
//! executor that schedules nodes across worker tasks.

pub mod dag;
pub mod error;
pub mod executor;
pub mod graphviz;
pub mod models;

pub use dag::validate_dag;
pub use error::EngineError;
pub use executor::{ExecutionReport, ExecutorConfig, Plugin, WorkflowExecutor};
pub use graphviz::write_graph;
pub use models::{Edge, Node, Selector, Workflow};

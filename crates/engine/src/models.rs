//! Core domain models for the workflow engine.
//!
//! A [`Workflow`] is a named bag of nodes plus port-level edges. Nodes own
//! their [`Interface`] behind an `Arc` so the executor can move clones into
//! worker tasks.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use interfaces::{Interface, PortMap};

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A single step in the workflow graph.
pub struct Node {
    /// Unique name within this workflow (referenced by edges). Merging a
    /// sub-workflow prefixes it with the sub-workflow's label.
    pub name: String,
    /// The command wrapper (or test double) this node executes.
    pub interface: Arc<dyn Interface>,
    /// Static inputs set at graph-construction time; upstream outputs are
    /// merged on top of these at execution time.
    pub inputs: PortMap,
    /// Where this node's crash dump goes on failure; falls back to the
    /// executor's global crashdump directory when unset.
    pub crashdump_dir: Option<PathBuf>,
}

impl Node {
    pub fn new(name: impl Into<String>, interface: Arc<dyn Interface>) -> Self {
        Self {
            name: name.into(),
            interface,
            inputs: PortMap::new(),
            crashdump_dir: None,
        }
    }

    /// Builder-style static input.
    pub fn with_input(mut self, port: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(port.into(), value.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

/// How a port value is transformed when it crosses an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// Pass the value through unchanged.
    All,
    /// Take the first element of a list-valued port.
    First,
}

/// Directed edge: output port of one node feeds an input port of another.
#[derive(Debug, Clone)]
pub struct Edge {
    pub from: String,
    pub from_port: String,
    pub to: String,
    pub to_port: String,
    pub selector: Selector,
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// A complete workflow graph.
pub struct Workflow {
    pub name: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    /// Crash dumps for this workflow's nodes land here (propagated onto
    /// nodes when the workflow is merged into a parent).
    pub crashdump_dir: Option<PathBuf>,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            crashdump_dir: None,
        }
    }

    pub fn add_node(&mut self, node: Node) -> &mut Self {
        self.nodes.push(node);
        self
    }

    /// Declare that `from`'s output port feeds `to`'s input port.
    pub fn connect(&mut self, from: &str, from_port: &str, to: &str, to_port: &str) -> &mut Self {
        self.edges.push(Edge {
            from: from.to_owned(),
            from_port: from_port.to_owned(),
            to: to.to_owned(),
            to_port: to_port.to_owned(),
            selector: Selector::All,
        });
        self
    }

    /// Like [`Workflow::connect`], but takes the first element when the
    /// upstream port is list-valued.
    pub fn connect_first(
        &mut self,
        from: &str,
        from_port: &str,
        to: &str,
        to_port: &str,
    ) -> &mut Self {
        self.edges.push(Edge {
            from: from.to_owned(),
            from_port: from_port.to_owned(),
            to: to.to_owned(),
            to_port: to_port.to_owned(),
            selector: Selector::First,
        });
        self
    }

    /// Flatten `sub` into this workflow under `prefix`.
    ///
    /// Node names and edge endpoints become `<prefix>.<name>`; the
    /// sub-workflow's crashdump directory is stamped onto every merged node
    /// that doesn't already carry one.
    pub fn merge(&mut self, prefix: &str, sub: Workflow) -> &mut Self {
        let crashdump = sub.crashdump_dir;
        for mut node in sub.nodes {
            node.name = format!("{prefix}.{}", node.name);
            if node.crashdump_dir.is_none() {
                node.crashdump_dir = crashdump.clone();
            }
            self.nodes.push(node);
        }
        for edge in sub.edges {
            self.edges.push(Edge {
                from: format!("{prefix}.{}", edge.from),
                to: format!("{prefix}.{}", edge.to),
                ..edge
            });
        }
        self
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interfaces::mock::MockInterface;
    use serde_json::json;

    fn mock(name: &str) -> Node {
        Node::new(name, Arc::new(MockInterface::returning(name, [("out", json!(1))])))
    }

    #[test]
    fn merge_prefixes_nodes_and_edges() {
        let mut sub = Workflow::new("inner");
        sub.add_node(mock("a")).add_node(mock("b"));
        sub.connect("a", "out", "b", "in_file");
        sub.crashdump_dir = Some(PathBuf::from("/log/sub-01"));

        let mut parent = Workflow::new("outer");
        parent.merge("sub01", sub);

        assert!(parent.node("sub01.a").is_some());
        assert_eq!(parent.edges[0].from, "sub01.a");
        assert_eq!(parent.edges[0].to, "sub01.b");
        assert_eq!(
            parent.node("sub01.b").unwrap().crashdump_dir,
            Some(PathBuf::from("/log/sub-01"))
        );
    }

    #[test]
    fn with_input_sets_static_port() {
        let node = mock("a").with_input("in_file", "/d/x.nii.gz");
        assert_eq!(node.inputs["in_file"], "/d/x.nii.gz");
    }
}

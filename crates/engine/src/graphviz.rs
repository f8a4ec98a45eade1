//! Graphviz rendering of a workflow graph (`--write-graph`).

use std::path::Path;

use crate::models::Workflow;
use crate::EngineError;

/// Render the workflow as a Graphviz `digraph`, edges labelled
/// `from_port -> to_port`.
pub fn to_dot(workflow: &Workflow) -> String {
    let mut dot = String::new();
    dot.push_str(&format!("digraph \"{}\" {{\n", workflow.name));
    dot.push_str("  rankdir=TB;\n");

    for node in &workflow.nodes {
        dot.push_str(&format!("  \"{}\";\n", node.name));
    }
    for edge in &workflow.edges {
        dot.push_str(&format!(
            "  \"{}\" -> \"{}\" [label=\"{} -> {}\"];\n",
            edge.from, edge.to, edge.from_port, edge.to_port
        ));
    }

    dot.push_str("}\n");
    dot
}

/// Write the DOT rendering to `path`.
pub fn write_graph(workflow: &Workflow, path: &Path) -> Result<(), EngineError> {
    std::fs::write(path, to_dot(workflow))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Node;
    use interfaces::mock::MockInterface;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn dot_lists_nodes_and_labelled_edges() {
        let mut wf = Workflow::new("demo");
        wf.add_node(Node::new(
            "a",
            Arc::new(MockInterface::returning("a", [("out_file", json!("/x"))])),
        ));
        wf.add_node(Node::new(
            "b",
            Arc::new(MockInterface::returning("b", [("out_file", json!("/y"))])),
        ));
        wf.connect("a", "out_file", "b", "in_file");

        let dot = to_dot(&wf);
        assert!(dot.starts_with("digraph \"demo\""));
        assert!(dot.contains("\"a\";"));
        assert!(dot.contains("\"a\" -> \"b\" [label=\"out_file -> in_file\"];"));
    }
}

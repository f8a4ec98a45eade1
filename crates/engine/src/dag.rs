//! DAG validation — run this before rendering or executing a workflow.
//!
//! Rules enforced:
//! 1. Node names must be unique within the workflow.
//! 2. Every edge must reference valid node names (both `from` and `to`).
//! 3. The directed graph must be acyclic (topological sort must succeed).
//!
//! Returns a topologically-sorted list of node names on success.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::{models::Workflow, EngineError};

/// Validate the workflow's DAG and return nodes in topological execution order.
///
/// # Errors
/// - [`EngineError::DuplicateNodeName`] if two nodes share a name.
/// - [`EngineError::UnknownNodeReference`] if an edge references a missing node.
/// - [`EngineError::CycleDetected`] if the graph is not acyclic.
pub fn validate_dag(workflow: &Workflow) -> Result<Vec<String>, EngineError> {
    let mut seen: HashSet<&str> = HashSet::new();
    for node in &workflow.nodes {
        if !seen.insert(node.name.as_str()) {
            return Err(EngineError::DuplicateNodeName(node.name.clone()));
        }
    }

    let node_set: HashSet<&str> = workflow.nodes.iter().map(|n| n.name.as_str()).collect();

    for edge in &workflow.edges {
        if !node_set.contains(edge.from.as_str()) {
            return Err(EngineError::UnknownNodeReference {
                node: edge.from.clone(),
                side: "from",
            });
        }
        if !node_set.contains(edge.to.as_str()) {
            return Err(EngineError::UnknownNodeReference {
                node: edge.to.clone(),
                side: "to",
            });
        }
    }

    // Kahn's algorithm. Adjacency and in-degree are seeded from the node
    // declaration order so that ties resolve deterministically.
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut in_degree: HashMap<&str, usize> = HashMap::new();

    for node in &workflow.nodes {
        adjacency.entry(node.name.as_str()).or_default();
        in_degree.entry(node.name.as_str()).or_insert(0);
    }

    for edge in &workflow.edges {
        adjacency
            .entry(edge.from.as_str())
            .or_default()
            .push(edge.to.as_str());
        *in_degree.entry(edge.to.as_str()).or_insert(0) += 1;
    }

    let mut queue: VecDeque<&str> = workflow
        .nodes
        .iter()
        .map(|n| n.name.as_str())
        .filter(|name| in_degree[name] == 0)
        .collect();

    let mut sorted: Vec<String> = Vec::with_capacity(workflow.nodes.len());

    while let Some(name) = queue.pop_front() {
        sorted.push(name.to_owned());

        if let Some(neighbours) = adjacency.get(name) {
            for &neighbour in neighbours {
                let deg = in_degree.entry(neighbour).or_insert(0);
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(neighbour);
                }
            }
        }
    }

    // If we didn't visit every node the graph contains a cycle.
    if sorted.len() != workflow.nodes.len() {
        return Err(EngineError::CycleDetected);
    }

    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Node;
    use interfaces::mock::MockInterface;
    use serde_json::json;
    use std::sync::Arc;

    fn make_node(name: &str) -> Node {
        Node::new(
            name,
            Arc::new(MockInterface::returning(name, [("out_file", json!("/x"))])),
        )
    }

    fn make_workflow(names: &[&str], edges: &[(&str, &str)]) -> Workflow {
        let mut wf = Workflow::new("test");
        for name in names {
            wf.add_node(make_node(name));
        }
        for (from, to) in edges {
            wf.connect(from, "out_file", to, "in_file");
        }
        wf
    }

    #[test]
    fn valid_linear_dag_returns_sorted_order() {
        let wf = make_workflow(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let sorted = validate_dag(&wf).expect("should be valid");
        assert_eq!(sorted, vec!["a", "b", "c"]);
    }

    #[test]
    fn valid_diamond_dag() {
        //   a
        //  / \
        // b   c
        //  \ /
        //   d
        let wf = make_workflow(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        );
        let sorted = validate_dag(&wf).expect("should be valid");
        assert_eq!(sorted.first().unwrap(), "a");
        assert_eq!(sorted.last().unwrap(), "d");
        assert_eq!(sorted.len(), 4);
    }

    #[test]
    fn duplicate_node_name_is_rejected() {
        let wf = make_workflow(&["a", "a"], &[]);
        assert!(matches!(
            validate_dag(&wf),
            Err(EngineError::DuplicateNodeName(name)) if name == "a"
        ));
    }

    #[test]
    fn edge_referencing_missing_node_is_rejected() {
        let wf = make_workflow(&["a"], &[("a", "ghost")]);
        assert!(matches!(
            validate_dag(&wf),
            Err(EngineError::UnknownNodeReference { node, .. }) if node == "ghost"
        ));
    }

    #[test]
    fn cycle_is_detected() {
        let wf = make_workflow(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);
        assert!(matches!(validate_dag(&wf), Err(EngineError::CycleDetected)));
    }

    #[test]
    fn single_node_no_edges_is_valid() {
        let wf = make_workflow(&["solo"], &[]);
        assert_eq!(validate_dag(&wf).unwrap(), vec!["solo"]);
    }
}

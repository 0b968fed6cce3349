// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! DAG (Directed Acyclic Graph) builder for step dependencies
//!
//! Builds and validates the dependency graph of a workflow and produces a
//! deterministic topological ordering: Kahn's algorithm, emitting
//! zero-in-degree steps in lexicographic id order.

use std::collections::{BTreeSet, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use super::definition::WorkflowDefinition;
use crate::errors::StacflowError;

/// Builder for step dependency DAGs
pub struct DagBuilder {
    graph: DiGraph<usize, ()>,
    id_to_index: HashMap<String, NodeIndex>,
    index_to_id: HashMap<NodeIndex, String>,
}

impl DagBuilder {
    /// Create a new DAG builder
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            id_to_index: HashMap::new(),
            index_to_id: HashMap::new(),
        }
    }

    /// Build a DAG from a workflow definition.
    ///
    /// Fails on undeclared dependencies before cycle detection runs, and
    /// on cycles, naming the steps still queued.
    pub fn build(workflow: &WorkflowDefinition) -> Result<Self, StacflowError> {
        let mut builder = Self::new();

        // Add all steps as nodes
        for (idx, step) in workflow.steps.iter().enumerate() {
            let node = builder.graph.add_node(idx);
            builder.id_to_index.insert(step.id.clone(), node);
            builder.index_to_id.insert(node, step.id.clone());
        }

        // Add dependency edges
        for step in &workflow.steps {
            let step_node = builder.id_to_index[&step.id];

            for dep_id in &step.depends_on {
                let dep_node = builder.id_to_index.get(dep_id).ok_or_else(|| {
                    StacflowError::UnknownDependency {
                        step: step.id.clone(),
                        dependency: dep_id.clone(),
                    }
                })?;

                if !builder.graph.contains_edge(*dep_node, step_node) {
                    builder.graph.add_edge(*dep_node, step_node, ());
                }
            }
        }

        // Validate no cycles
        builder.topological_order()?;

        Ok(builder)
    }

    /// Topologically sorted step ids.
    ///
    /// Deterministic: among the steps whose dependencies are all emitted,
    /// the lexicographically smallest id goes next.
    pub fn topological_order(&self) -> Result<Vec<String>, StacflowError> {
        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|n| (n, self.graph.neighbors_directed(n, Direction::Incoming).count()))
            .collect();

        let mut ready: BTreeSet<String> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(node, _)| self.index_to_id[node].clone())
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());

        while let Some(id) = ready.pop_first() {
            let node = self.id_to_index[&id];
            order.push(id);

            for successor in self.graph.neighbors_directed(node, Direction::Outgoing) {
                let degree = in_degree
                    .get_mut(&successor)
                    .expect("successor seen during in-degree scan");
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(self.index_to_id[&successor].clone());
                }
            }
        }

        if order.len() < self.graph.node_count() {
            let mut stuck: Vec<String> = self
                .index_to_id
                .values()
                .filter(|id| !order.contains(*id))
                .cloned()
                .collect();
            stuck.sort();
            return Err(StacflowError::CircularDependency { steps: stuck });
        }

        Ok(order)
    }

    /// Direct dependencies of a step (steps that must run before it)
    pub fn dependencies(&self, step_id: &str) -> Option<Vec<String>> {
        let node = self.id_to_index.get(step_id)?;
        let mut deps: Vec<String> = self
            .graph
            .neighbors_directed(*node, Direction::Incoming)
            .map(|n| self.index_to_id[&n].clone())
            .collect();
        deps.sort();
        Some(deps)
    }

    /// Direct dependents of a step (steps that depend on it)
    pub fn dependents(&self, step_id: &str) -> Option<Vec<String>> {
        let node = self.id_to_index.get(step_id)?;
        let mut deps: Vec<String> = self
            .graph
            .neighbors_directed(*node, Direction::Outgoing)
            .map(|n| self.index_to_id[&n].clone())
            .collect();
        deps.sort();
        Some(deps)
    }

    /// Check if step A depends (directly or transitively) on step B
    pub fn depends_on(&self, step_a: &str, step_b: &str) -> bool {
        let Some(node_a) = self.id_to_index.get(step_a) else {
            return false;
        };
        let Some(node_b) = self.id_to_index.get(step_b) else {
            return false;
        };

        petgraph::algo::has_path_connecting(&self.graph, *node_b, *node_a, None)
    }

    /// Generate a Mermaid diagram of the DAG
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        let mut ids: Vec<&String> = self.id_to_index.keys().collect();
        ids.sort();
        for id in ids {
            out.push_str(&format!("    {}[{}]\n", id, id));
        }

        for edge in self.graph.edge_indices() {
            let (from, to) = self.graph.edge_endpoints(edge).expect("edge has endpoints");
            out.push_str(&format!(
                "    {} --> {}\n",
                self.index_to_id[&from], self.index_to_id[&to]
            ));
        }

        out
    }

    /// Generate a DOT diagram of the DAG
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph workflow {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for edge in self.graph.edge_indices() {
            let (from, to) = self.graph.edge_endpoints(edge).expect("edge has endpoints");
            out.push_str(&format!(
                "    \"{}\" -> \"{}\";\n",
                self.index_to_id[&from], self.index_to_id[&to]
            ));
        }

        // Isolated nodes don't appear in any edge
        let mut ids: Vec<(&String, &NodeIndex)> = self.id_to_index.iter().collect();
        ids.sort();
        for (id, node) in ids {
            if self.graph.neighbors_undirected(*node).count() == 0 {
                out.push_str(&format!("    \"{}\";\n", id));
            }
        }

        out.push_str("}\n");
        out
    }

    /// Generate a text representation of the execution order
    pub fn to_text(&self, workflow: &WorkflowDefinition) -> Result<String, StacflowError> {
        let order = self.topological_order()?;
        let mut out = String::new();

        for (i, id) in order.iter().enumerate() {
            let step = workflow.get_step(id).expect("ordered id exists in workflow");
            let deps = self.dependencies(id).unwrap_or_default();

            out.push_str(&format!("{}. {} ({})", i + 1, step.id, step.module));

            if !deps.is_empty() {
                out.push_str(&format!(" [depends: {}]", deps.join(", ")));
            }

            out.push('\n');
        }

        Ok(out)
    }
}

impl Default for DagBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::definition::StepDefinition;

    fn make_test_workflow(steps: Vec<(&str, Vec<&str>)>) -> WorkflowDefinition {
        WorkflowDefinition {
            name: "test".into(),
            description: None,
            version: "1.0".into(),
            strategy: Default::default(),
            settings: Default::default(),
            resume_from_checkpoint: true,
            steps: steps
                .into_iter()
                .map(|(id, deps)| StepDefinition {
                    id: id.into(),
                    module: "StaticSourceModule".into(),
                    config: Default::default(),
                    depends_on: deps.into_iter().map(String::from).collect(),
                    log_level: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_linear_dag() {
        let workflow = make_test_workflow(vec![
            ("a", vec![]),
            ("b", vec!["a"]),
            ("c", vec!["b"]),
        ]);

        let dag = DagBuilder::build(&workflow).unwrap();
        let order = dag.topological_order().unwrap();

        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_order_is_a_permutation_respecting_dependencies() {
        let workflow = make_test_workflow(vec![
            ("write", vec!["validate"]),
            ("validate", vec!["fetch"]),
            ("enrich", vec!["fetch"]),
            ("fetch", vec![]),
        ]);

        let dag = DagBuilder::build(&workflow).unwrap();
        let order = dag.topological_order().unwrap();

        assert_eq!(order.len(), 4);
        for step in ["write", "validate", "enrich", "fetch"] {
            assert!(order.contains(&step.to_string()));
        }

        let pos = |id: &str| order.iter().position(|s| s == id).unwrap();
        assert!(pos("fetch") < pos("validate"));
        assert!(pos("fetch") < pos("enrich"));
        assert!(pos("validate") < pos("write"));
    }

    #[test]
    fn test_diamond_order_is_deterministic() {
        let workflow = make_test_workflow(vec![
            ("a", vec![]),
            ("c", vec!["a"]),
            ("b", vec!["a"]),
            ("d", vec!["b", "c"]),
        ]);

        let dag = DagBuilder::build(&workflow).unwrap();
        let order = dag.topological_order().unwrap();

        // Zero-in-degree ties break lexicographically
        assert_eq!(order, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_circular_dependency_names_both_steps() {
        let workflow = make_test_workflow(vec![("x", vec!["y"]), ("y", vec!["x"])]);

        let result = DagBuilder::build(&workflow);
        let Err(StacflowError::CircularDependency { steps }) = result else {
            panic!("expected circular dependency error");
        };
        assert_eq!(steps, vec!["x", "y"]);
    }

    #[test]
    fn test_unknown_dependency() {
        let workflow = make_test_workflow(vec![("a", vec!["nonexistent"])]);

        let result = DagBuilder::build(&workflow);
        assert!(matches!(result, Err(StacflowError::UnknownDependency { .. })));
    }

    #[test]
    fn test_depends_on_check() {
        let workflow = make_test_workflow(vec![
            ("a", vec![]),
            ("b", vec!["a"]),
            ("c", vec!["b"]),
        ]);

        let dag = DagBuilder::build(&workflow).unwrap();

        assert!(dag.depends_on("c", "a")); // transitive
        assert!(dag.depends_on("c", "b")); // direct
        assert!(!dag.depends_on("a", "c")); // reverse
    }

    #[test]
    fn test_mermaid_output() {
        let workflow = make_test_workflow(vec![("a", vec![]), ("b", vec!["a"])]);

        let dag = DagBuilder::build(&workflow).unwrap();
        let mermaid = dag.to_mermaid();

        assert!(mermaid.contains("graph TD"));
        assert!(mermaid.contains("a --> b"));
    }

    #[test]
    fn test_dot_output_includes_isolated_nodes() {
        let workflow = make_test_workflow(vec![("a", vec![]), ("b", vec![])]);

        let dag = DagBuilder::build(&workflow).unwrap();
        let dot = dag.to_dot();

        assert!(dot.contains("\"a\";"));
        assert!(dot.contains("\"b\";"));
    }
}

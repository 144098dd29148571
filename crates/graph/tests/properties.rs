//! Property-based tests for the graph analyses.
//!
//! These tests generate random directed graphs and check the laws that the
//! printing pipeline relies on: topological orders respect edges, and the
//! strongly-connected components partition the graph in condensation order.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Tests can panic

use clift_graph::{AdjacencyList, Graph};
use proptest::prelude::*;

/// Generates a vertex count together with an arbitrary edge list over it.
///
/// Self-loops are filtered out so that the acyclicity of the generated graph
/// is determined purely by the remaining edges.
fn digraph_strategy() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2..12usize).prop_flat_map(|n_vertices| {
        let edges = prop::collection::vec((0..n_vertices, 0..n_vertices), 0..40).prop_map(
            |pairs| {
                pairs
                    .into_iter()
                    .filter(|(src, dst)| src != dst)
                    .collect::<Vec<_>>()
            },
        );
        (Just(n_vertices), edges)
    })
}

/// Generates an acyclic graph by forcing every edge to point from a lower
/// vertex index to a higher one.
fn dag_strategy() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    digraph_strategy().prop_map(|(n_vertices, edges)| {
        let edges = edges
            .into_iter()
            .map(|(src, dst)| (src.min(dst), src.max(dst)))
            .collect();
        (n_vertices, edges)
    })
}

fn build(n_vertices: usize, edges: &[(usize, usize)]) -> Graph<(), AdjacencyList<()>> {
    let mut graph = Graph::from_vertices(vec![(); n_vertices]);
    for &(src, dst) in edges {
        graph.set_edge(src, dst, ());
    }
    graph
}

/// Computes the set of vertices reachable from `root` by breadth-first
/// search, used as an independent reachability oracle.
fn reachable(graph: &Graph<(), AdjacencyList<()>>, root: usize) -> Vec<bool> {
    let mut seen = vec![false; graph.n_vertices()];
    let mut queue = vec![root];
    seen[root] = true;
    while let Some(vertex) = queue.pop() {
        for successor in graph.successors(vertex) {
            if !seen[successor] {
                seen[successor] = true;
                queue.push(successor);
            }
        }
    }
    seen
}

proptest! {
    #[test]
    fn dags_are_acyclic((n_vertices, edges) in dag_strategy()) {
        let graph = build(n_vertices, &edges);
        prop_assert!(graph.is_acyclic());
    }

    #[test]
    fn topological_sort_respects_edges((n_vertices, edges) in dag_strategy()) {
        let graph = build(n_vertices, &edges);
        let order = graph.topological_sort().unwrap();

        prop_assert_eq!(order.len(), n_vertices);

        let mut position = vec![usize::MAX; n_vertices];
        for (rank, vertex) in order.iter().enumerate() {
            position[*vertex] = rank;
        }
        for &(src, dst) in &edges {
            prop_assert!(position[src] < position[dst]);
        }
    }

    #[test]
    fn components_partition_the_vertices((n_vertices, edges) in digraph_strategy()) {
        let graph = build(n_vertices, &edges);
        let components = graph.strongly_connected_components();

        let mut seen = vec![0usize; n_vertices];
        for component in &components {
            prop_assert!(!component.is_empty());
            for &vertex in component {
                seen[vertex] += 1;
            }
        }
        prop_assert!(seen.iter().all(|&count| count == 1));
    }

    #[test]
    fn components_are_mutually_reachable((n_vertices, edges) in digraph_strategy()) {
        let graph = build(n_vertices, &edges);

        for component in graph.strongly_connected_components() {
            let witness = reachable(&graph, component[0]);
            for &vertex in &component {
                prop_assert!(witness[vertex]);
                prop_assert!(reachable(&graph, vertex)[component[0]]);
            }
        }
    }

    #[test]
    fn component_order_is_a_condensation_order((n_vertices, edges) in digraph_strategy()) {
        let graph = build(n_vertices, &edges);
        let components = graph.strongly_connected_components();

        let mut component_of = vec![usize::MAX; n_vertices];
        for (index, component) in components.iter().enumerate() {
            for &vertex in component {
                component_of[vertex] = index;
            }
        }
        for &(src, dst) in &edges {
            prop_assert!(component_of[src] <= component_of[dst]);
        }
    }

    #[test]
    fn cyclic_graphs_fail_topological_sort((n_vertices, edges) in digraph_strategy()) {
        let graph = build(n_vertices, &edges);
        let has_multi_vertex_component = graph
            .strongly_connected_components()
            .iter()
            .any(|component| component.len() > 1);

        prop_assert_eq!(graph.topological_sort().is_err(), has_multi_vertex_component);
        prop_assert_eq!(graph.is_acyclic(), !has_multi_vertex_component);
    }
}

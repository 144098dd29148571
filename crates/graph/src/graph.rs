//! The directed graph container, together with the traversal analyses that
//! the lowering pipeline runs over element control flow.

use thiserror::Error;

use crate::store::{AdjacencyList, EdgeStore};

/// The result type for graph analyses that are only defined on a subset of
/// graphs.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by graph analyses.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// Emitted when an analysis that is only defined for acyclic graphs is
    /// run on a graph containing a cycle.
    #[error("The graph contains a cycle")]
    ContainsCycle,
}

/// A directed graph with vertices carrying `V` payloads and edges stored by
/// the strategy `S`.
///
/// Vertices are identified by their index in construction order. The graph
/// does not support vertex removal, which keeps indices stable for its whole
/// lifetime.
#[derive(Clone, Debug)]
pub struct Graph<V, S: EdgeStore> {
    vertices: Vec<V>,
    edges:    S,
}

/// The visitation states used by the cycle search.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum VisitState {
    Fresh,
    OnPath,
    Done,
}

impl<V, S: EdgeStore> Graph<V, S> {
    /// Creates a graph over the given vertex payloads with no edges.
    pub fn from_vertices(vertices: Vec<V>) -> Self {
        let edges = S::with_vertices(vertices.len());
        Self { vertices, edges }
    }

    /// Gets the number of vertices in the graph.
    #[must_use]
    pub fn n_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Gets the payload of the vertex numbered `vertex`.
    ///
    /// # Panics
    ///
    /// - If `vertex` is not a vertex of the graph.
    #[must_use]
    pub fn vertex(&self, vertex: usize) -> &V {
        &self.vertices[vertex]
    }

    /// Gets the payload of the vertex numbered `vertex` mutably.
    ///
    /// # Panics
    ///
    /// - If `vertex` is not a vertex of the graph.
    pub fn vertex_mut(&mut self, vertex: usize) -> &mut V {
        &mut self.vertices[vertex]
    }

    /// Sets the edge from `src` to `dst` to carry `weight`, replacing any
    /// weight previously set for that pair.
    ///
    /// # Panics
    ///
    /// - If `src` or `dst` is not a vertex of the graph.
    pub fn set_edge(&mut self, src: usize, dst: usize, weight: S::Weight) {
        self.edges.set_edge(src, dst, weight);
    }

    /// Gets the weight of the edge from `src` to `dst`, or [`None`] if no
    /// such edge has been set.
    ///
    /// # Panics
    ///
    /// - If `src` or `dst` is not a vertex of the graph.
    #[must_use]
    pub fn edge(&self, src: usize, dst: usize) -> Option<&S::Weight> {
        self.edges.edge(src, dst)
    }

    /// Gets the weight of the edge from `src` to `dst` mutably, or [`None`]
    /// if no such edge has been set.
    ///
    /// # Panics
    ///
    /// - If `src` or `dst` is not a vertex of the graph.
    pub fn edge_mut(&mut self, src: usize, dst: usize) -> Option<&mut S::Weight> {
        self.edges.edge_mut(src, dst)
    }

    /// Checks whether an edge from `src` to `dst` has been set.
    ///
    /// # Panics
    ///
    /// - If `src` or `dst` is not a vertex of the graph.
    #[must_use]
    pub fn has_edge(&self, src: usize, dst: usize) -> bool {
        self.edges.has_edge(src, dst)
    }

    /// Iterates over the direct successors of `src`.
    ///
    /// # Panics
    ///
    /// - If `src` is not a vertex of the graph.
    pub fn successors(&self, src: usize) -> impl Iterator<Item = usize> + '_ {
        self.edges.successors(src)
    }

    /// Iterates over all edges in the graph as `(src, dst, weight)` triples.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, &S::Weight)> + '_ {
        self.edges.edges()
    }

    /// Checks whether the graph contains no directed cycle.
    #[must_use]
    pub fn is_acyclic(&self) -> bool {
        let mut state = vec![VisitState::Fresh; self.n_vertices()];
        for vertex in 0..self.n_vertices() {
            if state[vertex] == VisitState::Fresh && self.cycle_search(vertex, &mut state) {
                return false;
            }
        }
        true
    }

    /// Checks whether any directed cycle is reachable from `root`.
    ///
    /// # Panics
    ///
    /// - If `root` is not a vertex of the graph.
    #[must_use]
    pub fn has_cycle_from(&self, root: usize) -> bool {
        let mut state = vec![VisitState::Fresh; self.n_vertices()];
        self.cycle_search(root, &mut state)
    }

    /// Searches for a cycle reachable from `vertex`, distinguishing vertices
    /// on the current search path from vertices whose subtree has already
    /// been exhausted.
    fn cycle_search(&self, vertex: usize, state: &mut [VisitState]) -> bool {
        match state[vertex] {
            VisitState::OnPath => return true,
            VisitState::Done => return false,
            VisitState::Fresh => (),
        }
        state[vertex] = VisitState::OnPath;
        for successor in self.edges.successors(vertex) {
            if self.cycle_search(successor, state) {
                return true;
            }
        }
        state[vertex] = VisitState::Done;
        false
    }

    /// Computes a topological order of the graph's vertices, such that every
    /// edge points from an earlier vertex in the order to a later one.
    ///
    /// The order is deterministic for a given construction order of the
    /// graph's vertices and edges.
    ///
    /// # Errors
    ///
    /// - [`Error::ContainsCycle`] if the graph contains a cycle, as no
    ///   topological order exists for it.
    pub fn topological_sort(&self) -> Result<Vec<usize>> {
        if !self.is_acyclic() {
            return Err(Error::ContainsCycle);
        }

        let mut visited = vec![false; self.n_vertices()];
        let mut order = Vec::with_capacity(self.n_vertices());
        for vertex in 0..self.n_vertices() {
            if !visited[vertex] {
                self.post_order(vertex, &mut visited, &mut order);
            }
        }
        order.reverse();

        Ok(order)
    }

    /// Appends the vertices reachable from `vertex` to `order` in post-order.
    fn post_order(&self, vertex: usize, visited: &mut [bool], order: &mut Vec<usize>) {
        visited[vertex] = true;
        for successor in self.edges.successors(vertex) {
            if !visited[successor] {
                self.post_order(successor, visited, order);
            }
        }
        order.push(vertex);
    }

    /// Computes the strongly-connected components of the graph.
    ///
    /// Every vertex appears in exactly one component, and two vertices share
    /// a component exactly when each is reachable from the other. Components
    /// are returned in an order compatible with the condensation of the
    /// graph: whenever an edge runs between two distinct components, the
    /// component of its source precedes the component of its destination.
    #[must_use]
    pub fn strongly_connected_components(&self) -> Vec<Vec<usize>> {
        let n_vertices = self.n_vertices();

        let mut visited = vec![false; n_vertices];
        let mut finish_order = Vec::with_capacity(n_vertices);
        for vertex in 0..n_vertices {
            if !visited[vertex] {
                self.post_order(vertex, &mut visited, &mut finish_order);
            }
        }

        let mut reversed: AdjacencyList<()> = AdjacencyList::with_vertices(n_vertices);
        for (src, dst, _) in self.edges.edges() {
            reversed.set_edge(dst, src, ());
        }

        let mut assigned = vec![false; n_vertices];
        let mut components = Vec::new();
        for &vertex in finish_order.iter().rev() {
            if assigned[vertex] {
                continue;
            }
            let mut component = Vec::new();
            collect_component(&reversed, vertex, &mut assigned, &mut component);
            components.push(component);
        }

        components
    }
}

/// Collects the vertices reachable from `vertex` in the reversed graph that
/// have not been assigned to an earlier component.
fn collect_component(
    reversed: &AdjacencyList<()>,
    vertex: usize,
    assigned: &mut [bool],
    component: &mut Vec<usize>,
) {
    assigned[vertex] = true;
    component.push(vertex);
    for successor in reversed.successors(vertex) {
        if !assigned[successor] {
            collect_component(reversed, successor, assigned, component);
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use crate::{
        graph::{Error, Graph},
        store::{AdjacencyList, AdjacencyMatrix},
    };

    /// Builds the diamond `a -> b`, `a -> c`, `b -> d`, `c -> d`.
    fn diamond() -> Graph<&'static str, AdjacencyList<()>> {
        let mut graph = Graph::from_vertices(vec!["a", "b", "c", "d"]);
        graph.set_edge(0, 1, ());
        graph.set_edge(0, 2, ());
        graph.set_edge(1, 3, ());
        graph.set_edge(2, 3, ());
        graph
    }

    #[test]
    fn diamond_is_acyclic() {
        let graph = diamond();

        assert!(graph.is_acyclic());
        assert!(!graph.has_cycle_from(0));
    }

    #[test]
    fn back_edge_makes_graph_cyclic() {
        let mut graph = diamond();
        graph.set_edge(3, 0, ());

        assert!(!graph.is_acyclic());
        assert!(graph.has_cycle_from(0));
    }

    #[test]
    fn cycle_is_only_found_when_reachable() {
        // 0 -> 1, and a separate cycle 2 <-> 3.
        let mut graph: Graph<(), AdjacencyList<()>> = Graph::from_vertices(vec![(); 4]);
        graph.set_edge(0, 1, ());
        graph.set_edge(2, 3, ());
        graph.set_edge(3, 2, ());

        assert!(!graph.has_cycle_from(0));
        assert!(graph.has_cycle_from(2));
        assert!(!graph.is_acyclic());
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let mut graph: Graph<(), AdjacencyList<()>> = Graph::from_vertices(vec![(); 2]);
        graph.set_edge(1, 1, ());

        assert!(!graph.is_acyclic());
        assert!(graph.has_cycle_from(1));
    }

    #[test]
    fn topological_sort_orders_edge_sources_first() -> anyhow::Result<()> {
        let graph = diamond();
        let order = graph.topological_sort()?;

        let mut position = vec![0; graph.n_vertices()];
        for (rank, vertex) in order.iter().enumerate() {
            position[*vertex] = rank;
        }
        for (src, dst, _) in graph.edges() {
            assert!(position[src] < position[dst]);
        }

        Ok(())
    }

    #[test]
    fn topological_sort_rejects_cyclic_graphs() {
        let mut graph = diamond();
        graph.set_edge(3, 1, ());

        assert_eq!(graph.topological_sort(), Err(Error::ContainsCycle));
    }

    #[test]
    fn topological_sort_works_on_matrix_storage() -> anyhow::Result<()> {
        let mut graph: Graph<(), AdjacencyMatrix<()>> = Graph::from_vertices(vec![(); 3]);
        graph.set_edge(2, 1, ());
        graph.set_edge(1, 0, ());

        assert_eq!(graph.topological_sort()?, vec![2, 1, 0]);

        Ok(())
    }

    #[test]
    fn components_group_mutually_reachable_vertices() {
        // The cycle 0 -> 1 -> 2 -> 0 with a tail 2 -> 3.
        let mut graph: Graph<(), AdjacencyList<()>> = Graph::from_vertices(vec![(); 4]);
        graph.set_edge(0, 1, ());
        graph.set_edge(1, 2, ());
        graph.set_edge(2, 0, ());
        graph.set_edge(2, 3, ());

        let mut components = graph.strongly_connected_components();
        for component in &mut components {
            component.sort_unstable();
        }

        assert_eq!(components, vec![vec![0, 1, 2], vec![3]]);
    }

    #[test]
    fn component_order_follows_condensation_edges() {
        // Two cycles with a bridge: {0, 1} -> {2, 3}.
        let mut graph: Graph<(), AdjacencyList<()>> = Graph::from_vertices(vec![(); 4]);
        graph.set_edge(0, 1, ());
        graph.set_edge(1, 0, ());
        graph.set_edge(2, 3, ());
        graph.set_edge(3, 2, ());
        graph.set_edge(1, 2, ());

        let components = graph.strongly_connected_components();

        assert_eq!(components.len(), 2);
        assert!(components[0].contains(&0));
        assert!(components[1].contains(&2));
    }

    #[test]
    fn acyclic_graph_has_singleton_components() {
        let graph = diamond();
        let components = graph.strongly_connected_components();

        assert_eq!(components.len(), graph.n_vertices());
        assert!(components.iter().all(|component| component.len() == 1));
    }

    // Properties

    /// Generates a vertex count together with an arbitrary edge list over it.
    fn arbitrary_graph() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
        (1usize..10).prop_flat_map(|n_vertices| {
            let edges = prop::collection::vec((0..n_vertices, 0..n_vertices), 0..30);
            (Just(n_vertices), edges)
        })
    }

    fn build(n_vertices: usize, edges: &[(usize, usize)]) -> Graph<(), AdjacencyList<()>> {
        let mut graph = Graph::from_vertices(vec![(); n_vertices]);
        for &(src, dst) in edges {
            graph.set_edge(src, dst, ());
        }
        graph
    }

    /// Checks whether `to` is reachable from `from` along directed edges.
    fn reaches(graph: &Graph<(), AdjacencyList<()>>, from: usize, to: usize) -> bool {
        let mut seen = vec![false; graph.n_vertices()];
        let mut work = vec![from];
        while let Some(vertex) = work.pop() {
            if vertex == to {
                return true;
            }
            if seen[vertex] {
                continue;
            }
            seen[vertex] = true;
            work.extend(graph.successors(vertex));
        }
        false
    }

    fn component_index(components: &[Vec<usize>], n_vertices: usize) -> Vec<usize> {
        let mut index = vec![0; n_vertices];
        for (position, component) in components.iter().enumerate() {
            for &vertex in component {
                index[vertex] = position;
            }
        }
        index
    }

    proptest! {
        #[test]
        fn sort_succeeds_exactly_on_acyclic_graphs(
            (n_vertices, edges) in arbitrary_graph()
        ) {
            let graph = build(n_vertices, &edges);
            match graph.topological_sort() {
                Ok(order) => {
                    prop_assert!(graph.is_acyclic());
                    prop_assert_eq!(order.len(), n_vertices);

                    let mut position = vec![0; n_vertices];
                    for (rank, vertex) in order.iter().enumerate() {
                        position[*vertex] = rank;
                    }
                    for (src, dst, _) in graph.edges() {
                        prop_assert!(position[src] < position[dst]);
                    }
                }
                Err(Error::ContainsCycle) => prop_assert!(!graph.is_acyclic()),
            }
        }

        #[test]
        fn components_partition_the_vertices(
            (n_vertices, edges) in arbitrary_graph()
        ) {
            let graph = build(n_vertices, &edges);
            let components = graph.strongly_connected_components();

            let mut seen: Vec<usize> = components.iter().flatten().copied().collect();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..n_vertices).collect::<Vec<_>>());
        }

        #[test]
        fn components_are_the_mutual_reachability_classes(
            (n_vertices, edges) in arbitrary_graph()
        ) {
            let graph = build(n_vertices, &edges);
            let components = graph.strongly_connected_components();
            let index = component_index(&components, n_vertices);

            for a in 0..n_vertices {
                for b in 0..n_vertices {
                    let mutual = reaches(&graph, a, b) && reaches(&graph, b, a);
                    prop_assert_eq!(index[a] == index[b], mutual);
                }
            }
        }

        #[test]
        fn component_order_is_compatible_with_the_condensation(
            (n_vertices, edges) in arbitrary_graph()
        ) {
            let graph = build(n_vertices, &edges);
            let components = graph.strongly_connected_components();
            let index = component_index(&components, n_vertices);

            for (src, dst, _) in graph.edges() {
                if index[src] != index[dst] {
                    prop_assert!(index[src] < index[dst]);
                }
            }
        }
    }
}

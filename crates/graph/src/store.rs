//! Edge storage strategies for the directed [`Graph`](crate::graph::Graph)
//! container.

use std::iter;

/// The storage strategy for the edges of a directed graph whose vertices are
/// identified by index.
///
/// Implementations decide how edge weights are laid out in memory, and with
/// that the cost of the basic queries. Setting an edge twice for the same
/// vertex pair replaces the weight in place rather than duplicating the edge.
pub trait EdgeStore {
    /// The weight carried by each edge in the store.
    type Weight;

    /// Creates an empty store covering `n_vertices` vertices.
    fn with_vertices(n_vertices: usize) -> Self;

    /// Sets the edge from `src` to `dst` to carry `weight`, replacing any
    /// weight previously set for that pair.
    ///
    /// # Panics
    ///
    /// - If `src` or `dst` is not a vertex of the store.
    fn set_edge(&mut self, src: usize, dst: usize, weight: Self::Weight);

    /// Gets a reference to the weight of the edge from `src` to `dst`, or
    /// [`None`] if no such edge has been set.
    ///
    /// # Panics
    ///
    /// - If `src` or `dst` is not a vertex of the store.
    fn edge(&self, src: usize, dst: usize) -> Option<&Self::Weight>;

    /// Gets a mutable reference to the weight of the edge from `src` to
    /// `dst`, or [`None`] if no such edge has been set.
    ///
    /// # Panics
    ///
    /// - If `src` or `dst` is not a vertex of the store.
    fn edge_mut(&mut self, src: usize, dst: usize) -> Option<&mut Self::Weight>;

    /// Checks whether an edge from `src` to `dst` has been set.
    ///
    /// # Panics
    ///
    /// - If `src` or `dst` is not a vertex of the store.
    fn has_edge(&self, src: usize, dst: usize) -> bool {
        self.edge(src, dst).is_some()
    }

    /// Iterates over the direct successors of `src` in a deterministic order
    /// fixed by the implementation.
    ///
    /// # Panics
    ///
    /// - If `src` is not a vertex of the store.
    fn successors(&self, src: usize) -> impl Iterator<Item = usize> + '_;

    /// Iterates over all edges in the store as `(src, dst, weight)` triples.
    fn edges(&self) -> impl Iterator<Item = (usize, usize, &Self::Weight)> + '_;
}

/// Edge storage as a per-vertex list of outgoing edges.
///
/// Queries walk the out-edge list of the source vertex, making them linear in
/// its out-degree. Successors are yielded in the order their edges were first
/// set, which keeps traversals over sparse control-flow graphs deterministic.
#[derive(Clone, Debug)]
pub struct AdjacencyList<E> {
    rows: Vec<Vec<(usize, E)>>,
}

impl<E> AdjacencyList<E> {
    fn check_vertex(&self, vertex: usize) {
        assert!(
            vertex < self.rows.len(),
            "vertex {vertex} does not exist in the store"
        );
    }
}

impl<E> EdgeStore for AdjacencyList<E> {
    type Weight = E;

    fn with_vertices(n_vertices: usize) -> Self {
        Self {
            rows: iter::repeat_with(Vec::new).take(n_vertices).collect(),
        }
    }

    fn set_edge(&mut self, src: usize, dst: usize, weight: E) {
        self.check_vertex(src);
        self.check_vertex(dst);
        let row = &mut self.rows[src];
        if let Some((_, existing)) = row.iter_mut().find(|(d, _)| *d == dst) {
            *existing = weight;
        } else {
            row.push((dst, weight));
        }
    }

    fn edge(&self, src: usize, dst: usize) -> Option<&E> {
        self.check_vertex(src);
        self.check_vertex(dst);
        self.rows[src].iter().find(|(d, _)| *d == dst).map(|(_, w)| w)
    }

    fn edge_mut(&mut self, src: usize, dst: usize) -> Option<&mut E> {
        self.check_vertex(src);
        self.check_vertex(dst);
        self.rows[src].iter_mut().find(|(d, _)| *d == dst).map(|(_, w)| w)
    }

    fn successors(&self, src: usize) -> impl Iterator<Item = usize> + '_ {
        self.check_vertex(src);
        self.rows[src].iter().map(|(dst, _)| *dst)
    }

    fn edges(&self) -> impl Iterator<Item = (usize, usize, &E)> + '_ {
        self.rows.iter().enumerate().flat_map(|(src, row)| {
            row.iter().map(move |(dst, weight)| (src, *dst, weight))
        })
    }
}

/// Edge storage as a dense matrix of optional weights.
///
/// Queries index directly into the matrix, making them constant time at the
/// cost of a cell for every vertex pair. Successors are yielded in ascending
/// vertex order.
#[derive(Clone, Debug)]
pub struct AdjacencyMatrix<E> {
    n_vertices: usize,
    cells:      Vec<Option<E>>,
}

impl<E> AdjacencyMatrix<E> {
    fn cell_index(&self, src: usize, dst: usize) -> usize {
        assert!(
            src < self.n_vertices,
            "vertex {src} does not exist in the store"
        );
        assert!(
            dst < self.n_vertices,
            "vertex {dst} does not exist in the store"
        );
        src * self.n_vertices + dst
    }
}

impl<E> EdgeStore for AdjacencyMatrix<E> {
    type Weight = E;

    fn with_vertices(n_vertices: usize) -> Self {
        Self {
            n_vertices,
            cells: iter::repeat_with(|| None)
                .take(n_vertices * n_vertices)
                .collect(),
        }
    }

    fn set_edge(&mut self, src: usize, dst: usize, weight: E) {
        let index = self.cell_index(src, dst);
        self.cells[index] = Some(weight);
    }

    fn edge(&self, src: usize, dst: usize) -> Option<&E> {
        self.cells[self.cell_index(src, dst)].as_ref()
    }

    fn edge_mut(&mut self, src: usize, dst: usize) -> Option<&mut E> {
        let index = self.cell_index(src, dst);
        self.cells[index].as_mut()
    }

    fn successors(&self, src: usize) -> impl Iterator<Item = usize> + '_ {
        let base = self.cell_index(src, 0);
        (0..self.n_vertices).filter(move |dst| self.cells[base + dst].is_some())
    }

    fn edges(&self) -> impl Iterator<Item = (usize, usize, &E)> + '_ {
        self.cells.iter().enumerate().filter_map(|(index, cell)| {
            cell.as_ref()
                .map(|weight| (index / self.n_vertices, index % self.n_vertices, weight))
        })
    }
}

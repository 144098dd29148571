//! A small directed graph library used to analyze the control flow of
//! packet-processing elements.
//!
//! The container is generic over its edge storage so that sparse graphs can
//! use per-vertex adjacency lists while dense graphs, such as the
//! condensation built during printing, can use a flat adjacency matrix.

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming
#![allow(clippy::multiple_crate_versions)] // Enforced by our dependencies

pub mod graph;
pub mod store;

pub use graph::Graph;
pub use store::{AdjacencyList, AdjacencyMatrix, EdgeStore};

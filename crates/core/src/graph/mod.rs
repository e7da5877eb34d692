pub mod digraph;

pub use digraph::DiGraph;

//! Vertex layout construction.

pub mod vertex;

pub use vertex::{VertexArrangement, VertexLayout, VertexLayoutSpec, build_vertex_layout};

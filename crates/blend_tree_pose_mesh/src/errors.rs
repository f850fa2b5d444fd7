use thiserror::Error;

/// Errors produced while building a [`PoseMesh`](crate::pose_mesh::PoseMesh).
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PoseMeshError {
    #[error("Could not find bone named: {0}")]
    MissingBone(String),
    #[error("Could not find animation named: {0}")]
    MissingAnimation(String),
    #[error("Triangle {triangle} references vertex {index}, but the mesh has {vertex_count} vertices")]
    TriangleIndexOutOfRange {
        triangle: usize,
        index: usize,
        vertex_count: usize,
    },
    #[error("Triangle {triangle} uses the same vertex more than once")]
    DegenerateTriangle { triangle: usize },
    #[error("Pose mesh {0} has no triangles")]
    NoTriangles(String),
}

pub type PoseMeshResult<T> = Result<T, PoseMeshError>;

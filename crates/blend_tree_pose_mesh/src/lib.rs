//! Directional pose blending.
//!
//! A [`PoseMesh`] triangulates the terminal poses of a set of animations by the direction an
//! effector bone (a head, a gun hand) points to in each of them. Locating a desired direction on
//! the mesh yields a [`TargetTriangle`], whose barycentric weights blend three poses into one
//! that points the effector in that direction.
//!
//! [`PoseMesh`]: pose_mesh::PoseMesh
//! [`TargetTriangle`]: pose_mesh::TargetTriangle

pub mod celestial;
pub mod controller;
pub mod database;
pub mod errors;
pub mod geometry;
pub mod pose_mesh;
pub mod utility;

pub mod prelude {
    pub use super::celestial::{celestial_coordinates, direction_from_celestial};
    pub use super::controller::{PoseControl, PoseController};
    pub use super::database::PoseMeshDatabase;
    pub use super::errors::{PoseMeshError, PoseMeshResult};
    pub use super::pose_mesh::{
        PoseMesh, PoseMeshData, PoseMeshTriangle, PoseMeshVertex, SilhouetteEdge, TargetTriangle,
    };
    pub use super::utility::PoseMeshUtility;
}

use crate::{
    celestial::celestial_coordinates,
    errors::{PoseMeshError, PoseMeshResult},
    geometry::{Barycentric2D, Edge, triangle_contains},
};
use blend_tree_core::collaborators::{AnimationId, BoneId, PoseSampler};
use bevy::{
    log::warn,
    math::{Vec2, Vec3},
    platform::collections::HashMap,
};
use serde::{Deserialize, Serialize};

fn default_forward() -> Vec3 {
    Vec3::Y
}

/// Serialized description of a pose mesh.
///
/// `triangles` index into `animations`. The same animation may be listed more than once;
/// duplicates resolve to a single vertex.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseMeshData {
    pub name: String,
    pub effector_bone: String,
    pub root_bone: String,
    #[serde(default = "default_forward")]
    pub effector_forward_axis: Vec3,
    #[serde(default = "default_forward")]
    pub bind_pose_forward: Vec3,
    pub animations: Vec<String>,
    pub triangles: Vec<[usize; 3]>,
}

/// A sampled pose: where the effector points at the end of one animation.
#[derive(Clone, Debug, PartialEq)]
pub struct PoseMeshVertex {
    animation: AnimationId,
    animation_name: String,
    direction: Vec3,
    /// `(azimuth, elevation)`.
    position: Vec2,
}

impl PoseMeshVertex {
    pub fn animation(&self) -> AnimationId {
        self.animation
    }

    pub fn animation_name(&self) -> &str {
        &self.animation_name
    }

    /// Effector forward direction in model space.
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn azimuth(&self) -> f32 {
        self.position.x
    }

    pub fn elevation(&self) -> f32 {
        self.position.y
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PoseMeshTriangle {
    vertices: [usize; 3],
    barycentric: Barycentric2D,
}

impl PoseMeshTriangle {
    /// Indices into [`PoseMesh::vertices`].
    pub fn vertices(&self) -> [usize; 3] {
        self.vertices
    }

    pub fn barycentric(&self) -> &Barycentric2D {
        &self.barycentric
    }
}

/// Boundary edge of the mesh together with the triangle it belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SilhouetteEdge {
    pub vertices: [usize; 2],
    pub triangle: usize,
}

/// Result of locating a direction on a pose mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetTriangle {
    pub triangle_id: usize,
    /// Azimuth actually reachable on the mesh: the query itself when inside, otherwise the
    /// nearest point on the boundary.
    pub azimuth: f32,
    pub elevation: f32,
    pub is_inside: bool,
}

impl TargetTriangle {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.azimuth, self.elevation)
    }
}

/// Directional blend space for one effector bone.
///
/// Each vertex is the terminal pose of an animation, placed at the azimuth and elevation the
/// effector points to in that pose. Blending the three animations of the triangle containing a
/// desired direction with barycentric weights points the effector in that direction.
#[derive(Clone, Debug)]
pub struct PoseMesh {
    name: String,
    effector: BoneId,
    root: BoneId,
    effector_forward_axis: Vec3,
    bind_pose_forward: Vec3,
    vertices: Vec<PoseMeshVertex>,
    triangles: Vec<PoseMeshTriangle>,
    silhouette: Vec<SilhouetteEdge>,
}

impl PoseMesh {
    /// Builds the mesh by sampling the terminal pose of every animation on `sampler`. The
    /// skeleton is returned to its bind pose afterwards.
    pub fn new(data: &PoseMeshData, sampler: &mut dyn PoseSampler) -> PoseMeshResult<Self> {
        let effector = sampler
            .bone_id(&data.effector_bone)
            .ok_or_else(|| PoseMeshError::MissingBone(data.effector_bone.clone()))?;
        let root = sampler
            .bone_id(&data.root_bone)
            .ok_or_else(|| PoseMeshError::MissingBone(data.root_bone.clone()))?;

        let mut animations: Vec<(AnimationId, &str)> = Vec::new();
        let mut name_to_vertex = Vec::with_capacity(data.animations.len());
        for name in &data.animations {
            let id = sampler
                .animation_id(name)
                .ok_or_else(|| PoseMeshError::MissingAnimation(name.clone()))?;
            let vertex = match animations.iter().position(|(existing, _)| *existing == id) {
                Some(vertex) => vertex,
                None => {
                    animations.push((id, name));
                    animations.len() - 1
                }
            };
            name_to_vertex.push(vertex);
        }

        if data.triangles.is_empty() {
            return Err(PoseMeshError::NoTriangles(data.name.clone()));
        }
        let triangle_vertices = data
            .triangles
            .iter()
            .enumerate()
            .map(|(triangle, indices)| {
                let mut vertices = [0; 3];
                for (slot, index) in indices.iter().enumerate() {
                    vertices[slot] = *name_to_vertex.get(*index).ok_or(
                        PoseMeshError::TriangleIndexOutOfRange {
                            triangle,
                            index: *index,
                            vertex_count: name_to_vertex.len(),
                        },
                    )?;
                }
                let [a, b, c] = vertices;
                if a == b || b == c || c == a {
                    return Err(PoseMeshError::DegenerateTriangle { triangle });
                }
                Ok(vertices)
            })
            .collect::<PoseMeshResult<Vec<_>>>()?;

        let vertices = animations
            .into_iter()
            .map(|(animation, name)| {
                sampler.apply_terminal_pose(animation);
                let direction = sampler.bone_absolute_rotation(effector) * data.effector_forward_axis;
                let forward = sampler.bone_absolute_rotation(root) * data.bind_pose_forward;
                let (azimuth, elevation) = celestial_coordinates(direction, forward);
                PoseMeshVertex {
                    animation,
                    animation_name: name.to_string(),
                    direction,
                    position: Vec2::new(azimuth, elevation),
                }
            })
            .collect::<Vec<_>>();
        sampler.reset_pose();

        let triangles = triangle_vertices
            .into_iter()
            .enumerate()
            .map(|(id, indices)| {
                let [p, q, r] = indices.map(|i| vertices[i].position);
                let barycentric = Barycentric2D::new(p, q, r);
                if barycentric.is_degenerate() {
                    warn!(
                        "Triangle {id} of pose mesh {:?} has collinear vertices, it is left out of target lookups",
                        data.name
                    );
                }
                PoseMeshTriangle {
                    vertices: indices,
                    barycentric,
                }
            })
            .collect::<Vec<_>>();

        let silhouette = Self::find_silhouette(&triangles);

        Ok(Self {
            name: data.name.clone(),
            effector,
            root,
            effector_forward_axis: data.effector_forward_axis,
            bind_pose_forward: data.bind_pose_forward,
            vertices,
            triangles,
            silhouette,
        })
    }

    /// Edges used by exactly one triangle, in triangle order. Collinear triangles cover no
    /// area and take no part in the tally.
    fn find_silhouette(triangles: &[PoseMeshTriangle]) -> Vec<SilhouetteEdge> {
        let edges_of = |[a, b, c]: [usize; 3]| [(a, b), (b, c), (c, a)];
        let solid = || {
            triangles
                .iter()
                .enumerate()
                .filter(|(_, triangle)| !triangle.barycentric.is_degenerate())
        };

        let mut tally: HashMap<(usize, usize), u32> = HashMap::default();
        for (_, triangle) in solid() {
            for edge in edges_of(triangle.vertices) {
                *tally.entry(edge).or_default() += 1;
            }
        }

        let count = |edge: &(usize, usize)| tally.get(edge).copied().unwrap_or(0);
        solid()
            .flat_map(|(id, triangle)| {
                edges_of(triangle.vertices)
                    .into_iter()
                    .map(move |edge| (id, edge))
            })
            .filter(|(_, (a, b))| count(&(*a, *b)) + count(&(*b, *a)) == 1)
            .map(|(triangle, (a, b))| SilhouetteEdge {
                vertices: [a, b],
                triangle,
            })
            .collect()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn effector(&self) -> BoneId {
        self.effector
    }

    pub fn root(&self) -> BoneId {
        self.root
    }

    pub fn effector_forward_axis(&self) -> Vec3 {
        self.effector_forward_axis
    }

    pub fn bind_pose_forward(&self) -> Vec3 {
        self.bind_pose_forward
    }

    pub fn vertices(&self) -> &[PoseMeshVertex] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[PoseMeshTriangle] {
        &self.triangles
    }

    pub fn silhouette(&self) -> &[SilhouetteEdge] {
        &self.silhouette
    }

    pub fn barycentric(&self, triangle: usize) -> Option<&Barycentric2D> {
        self.triangles.get(triangle).map(PoseMeshTriangle::barycentric)
    }

    fn triangle_positions(&self, triangle: &PoseMeshTriangle) -> [Vec2; 3] {
        triangle.vertices.map(|i| self.vertices[i].position)
    }

    /// Finds the triangle covering `(azimuth, elevation)`.
    ///
    /// Outside the mesh, the point is clamped to the nearest boundary edge. A closed mesh
    /// without boundary clamps to the nearest edge of any triangle. Collinear triangles never
    /// contain the point.
    pub fn target_triangle(&self, azimuth: f32, elevation: f32) -> TargetTriangle {
        let point = Vec2::new(azimuth, elevation);

        let containing = self.triangles.iter().position(|triangle| {
            !triangle.barycentric.is_degenerate()
                && triangle_contains(point, self.triangle_positions(triangle))
        });
        if let Some(triangle_id) = containing {
            return TargetTriangle {
                triangle_id,
                azimuth,
                elevation,
                is_inside: true,
            };
        }

        let candidates: Vec<([usize; 2], usize)> = if self.silhouette.is_empty() {
            self.triangles
                .iter()
                .enumerate()
                .flat_map(|(id, triangle)| {
                    let [a, b, c] = triangle.vertices;
                    [([a, b], id), ([b, c], id), ([c, a], id)]
                })
                .collect()
        } else {
            self.silhouette
                .iter()
                .map(|edge| (edge.vertices, edge.triangle))
                .collect()
        };

        let mut nearest: Option<(Vec2, f32, usize)> = None;
        for ([a, b], triangle) in candidates {
            let edge = Edge::new(self.vertices[a].position, self.vertices[b].position);
            let closest = edge.closest_point_to(point);
            let distance = closest.distance_squared(point);
            if nearest.is_none_or(|(_, best, _)| distance < best) {
                nearest = Some((closest, distance, triangle));
            }
        }

        let (closest, _, triangle_id) = nearest.unwrap_or((point, 0., 0));
        TargetTriangle {
            triangle_id,
            azimuth: closest.x,
            elevation: closest.y,
            is_inside: false,
        }
    }

    /// Animation weights that reproduce `target` on its triangle.
    ///
    /// Barycentric coordinates are clamped to be non-negative and renormalized. Collinear
    /// triangles give the whole weight to the vertex nearest the target.
    pub fn blend_weights(&self, target: &TargetTriangle) -> Option<[(AnimationId, f32); 3]> {
        let triangle = self.triangles.get(target.triangle_id)?;
        let point = target.position();
        let positions = self.triangle_positions(triangle);

        let weights = match triangle.barycentric.coordinates(point) {
            Some(coords) => {
                let clamped = coords.max(Vec3::ZERO);
                let sum = clamped.element_sum();
                if sum > 0. {
                    (clamped / sum).to_array()
                } else {
                    nearest_vertex_weights(point, positions)
                }
            }
            None => nearest_vertex_weights(point, positions),
        };

        let [a, b, c] = triangle.vertices;
        Some([
            (self.vertices[a].animation, weights[0]),
            (self.vertices[b].animation, weights[1]),
            (self.vertices[c].animation, weights[2]),
        ])
    }
}

fn nearest_vertex_weights(point: Vec2, positions: [Vec2; 3]) -> [f32; 3] {
    let mut nearest = 0;
    for (i, position) in positions.iter().enumerate() {
        if position.distance_squared(point) < positions[nearest].distance_squared(point) {
            nearest = i;
        }
    }
    let mut weights = [0.; 3];
    weights[nearest] = 1.;
    weights
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use blend_tree_core::collaborators::SkeletonQuery;
    use bevy::math::Quat;

    const EPSILON: f32 = 1e-5;

    /// Skeleton whose effector bone takes a fixed rotation at the end of each animation.
    #[derive(Default)]
    pub(crate) struct ScriptedSkeleton {
        pub bones: Vec<String>,
        pub animations: Vec<(String, AnimationId, Quat)>,
        pub pose: Option<AnimationId>,
        pub resets: usize,
    }

    impl ScriptedSkeleton {
        pub(crate) fn head() -> Self {
            let mut skeleton = Self {
                bones: vec!["root".into(), "head".into()],
                ..Default::default()
            };
            for (i, (name, rotation)) in [
                ("center", Quat::IDENTITY),
                ("left", Quat::from_rotation_z(0.5)),
                ("up", Quat::from_rotation_x(0.5)),
                ("right", Quat::from_rotation_z(-0.5)),
                ("down", Quat::from_rotation_x(-0.5)),
            ]
            .into_iter()
            .enumerate()
            {
                skeleton
                    .animations
                    .push((name.into(), AnimationId(i as u32), rotation));
            }
            skeleton
        }
    }

    impl SkeletonQuery for ScriptedSkeleton {
        fn bone_id(&self, name: &str) -> Option<BoneId> {
            self.bones
                .iter()
                .position(|bone| bone == name)
                .map(|i| BoneId(i as u32))
        }

        fn animation_id(&self, name: &str) -> Option<AnimationId> {
            self.animations
                .iter()
                .find(|(animation, _, _)| animation == name)
                .map(|(_, id, _)| *id)
        }

        fn bone_absolute_rotation(&self, bone: BoneId) -> Quat {
            if bone != BoneId(1) {
                return Quat::IDENTITY;
            }
            self.pose
                .and_then(|pose| self.animations.iter().find(|(_, id, _)| *id == pose))
                .map_or(Quat::IDENTITY, |(_, _, rotation)| *rotation)
        }
    }

    impl PoseSampler for ScriptedSkeleton {
        fn apply_terminal_pose(&mut self, animation: AnimationId) {
            self.pose = Some(animation);
        }

        fn reset_pose(&mut self) {
            self.pose = None;
            self.resets += 1;
        }
    }

    /// A diamond around the center pose, split in four triangles.
    pub(crate) fn head_mesh_data() -> PoseMeshData {
        PoseMeshData {
            name: "head".into(),
            effector_bone: "head".into(),
            root_bone: "root".into(),
            effector_forward_axis: Vec3::Y,
            bind_pose_forward: Vec3::Y,
            animations: ["center", "left", "up", "right", "down"]
                .map(String::from)
                .to_vec(),
            triangles: vec![[0, 1, 2], [0, 2, 3], [0, 3, 4], [0, 4, 1]],
        }
    }

    pub(crate) fn head_mesh() -> PoseMesh {
        PoseMesh::new(&head_mesh_data(), &mut ScriptedSkeleton::head()).unwrap()
    }

    #[test]
    fn test_vertices_are_sampled() {
        let mut skeleton = ScriptedSkeleton::head();
        let mesh = PoseMesh::new(&head_mesh_data(), &mut skeleton).unwrap();

        assert_eq!(skeleton.resets, 1);
        assert_eq!(skeleton.pose, None);
        assert_eq!(mesh.vertices().len(), 5);

        let expected = [(0., 0.), (0.5, 0.), (0., 0.5), (-0.5, 0.), (0., -0.5)];
        for (vertex, (az, el)) in mesh.vertices().iter().zip(expected) {
            assert!((vertex.azimuth() - az).abs() < EPSILON, "{vertex:?}");
            assert!((vertex.elevation() - el).abs() < EPSILON, "{vertex:?}");
        }
    }

    #[test]
    fn test_silhouette() {
        let mesh = head_mesh();
        let silhouette = mesh.silhouette();

        assert_eq!(
            silhouette,
            &[
                SilhouetteEdge {
                    vertices: [1, 2],
                    triangle: 0
                },
                SilhouetteEdge {
                    vertices: [2, 3],
                    triangle: 1
                },
                SilhouetteEdge {
                    vertices: [3, 4],
                    triangle: 2
                },
                SilhouetteEdge {
                    vertices: [4, 1],
                    triangle: 3
                },
            ]
        );

        for edge in silhouette {
            let [a, b] = edge.vertices;
            let uses = mesh
                .triangles()
                .iter()
                .filter(|triangle| {
                    let vertices = triangle.vertices();
                    vertices.contains(&a) && vertices.contains(&b)
                })
                .count();
            assert_eq!(uses, 1);
        }
    }

    #[test]
    fn test_target_inside() {
        let mesh = head_mesh();
        let target = mesh.target_triangle(0.1, 0.1);
        assert_eq!(
            target,
            TargetTriangle {
                triangle_id: 0,
                azimuth: 0.1,
                elevation: 0.1,
                is_inside: true
            }
        );

        let target = mesh.target_triangle(-0.1, -0.2);
        assert!(target.is_inside);
        assert_eq!(target.triangle_id, 2);
    }

    #[test]
    fn test_target_outside_clamps_to_silhouette() {
        let mesh = head_mesh();
        let target = mesh.target_triangle(1., 1.);
        assert!(!target.is_inside);
        assert_eq!(target.triangle_id, 0);
        assert!((target.azimuth - 0.25).abs() < EPSILON);
        assert!((target.elevation - 0.25).abs() < EPSILON);

        let target = mesh.target_triangle(0., -2.);
        assert!(!target.is_inside);
        assert!(target.azimuth.abs() < EPSILON);
        assert!((target.elevation + 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_blend_weights() {
        let mesh = head_mesh();
        let target = mesh.target_triangle(0.25, 0.);
        let weights = mesh.blend_weights(&target).unwrap();

        assert_eq!(weights.map(|(id, _)| id), [0, 1, 2].map(AnimationId));
        let expected = [0.5, 0.5, 0.];
        for ((_, weight), expected) in weights.iter().zip(expected) {
            assert!((weight - expected).abs() < EPSILON, "{weights:?}");
        }
    }

    #[test]
    fn test_collinear_triangle_is_ignored() {
        let mut skeleton = ScriptedSkeleton::head();
        skeleton
            .animations
            .push(("far_left".into(), AnimationId(5), Quat::from_rotation_z(1.)));
        let mut data = head_mesh_data();
        data.animations.push("far_left".into());
        data.triangles.insert(0, [0, 1, 5]);

        let mesh = PoseMesh::new(&data, &mut skeleton).unwrap();
        assert!(mesh.barycentric(0).unwrap().is_degenerate());
        assert!(mesh.silhouette().iter().all(|edge| edge.triangle != 0));
        assert_eq!(mesh.silhouette().len(), 4);

        let target = mesh.target_triangle(0., -3.);
        assert!(!target.is_inside);
        assert_eq!(target.triangle_id, 3);
        assert!(target.azimuth.abs() < EPSILON);
        assert!((target.elevation + 0.5).abs() < EPSILON);

        let target = mesh.target_triangle(0.75, 0.);
        assert!(!target.is_inside);
        assert!((target.azimuth - 0.5).abs() < EPSILON);

        let target = mesh.target_triangle(0.1, 0.1);
        assert!(target.is_inside);
        assert_eq!(target.triangle_id, 1);
    }

    #[test]
    fn test_duplicate_animations_share_a_vertex() {
        let mut skeleton = ScriptedSkeleton::head();
        skeleton
            .animations
            .push(("left_again".into(), AnimationId(1), Quat::IDENTITY));
        let mut data = head_mesh_data();
        data.animations.push("left_again".into());
        data.triangles.push([0, 2, 5]);

        let mesh = PoseMesh::new(&data, &mut skeleton).unwrap();
        assert_eq!(mesh.vertices().len(), 5);
        assert_eq!(mesh.triangles()[4].vertices(), [0, 2, 1]);

        data.triangles.push([1, 5, 2]);
        assert_eq!(
            PoseMesh::new(&data, &mut skeleton).unwrap_err(),
            PoseMeshError::DegenerateTriangle { triangle: 5 }
        );
    }

    #[test]
    fn test_construction_errors() {
        let mut skeleton = ScriptedSkeleton::head();

        let mut data = head_mesh_data();
        data.effector_bone = "neck".into();
        assert_eq!(
            PoseMesh::new(&data, &mut skeleton).unwrap_err(),
            PoseMeshError::MissingBone("neck".into())
        );

        let mut data = head_mesh_data();
        data.animations.push("nod".into());
        assert_eq!(
            PoseMesh::new(&data, &mut skeleton).unwrap_err(),
            PoseMeshError::MissingAnimation("nod".into())
        );

        let mut data = head_mesh_data();
        data.triangles.push([0, 1, 9]);
        assert_eq!(
            PoseMesh::new(&data, &mut skeleton).unwrap_err(),
            PoseMeshError::TriangleIndexOutOfRange {
                triangle: 4,
                index: 9,
                vertex_count: 5
            }
        );

        let mut data = head_mesh_data();
        data.triangles.clear();
        assert_eq!(
            PoseMesh::new(&data, &mut skeleton).unwrap_err(),
            PoseMeshError::NoTriangles("head".into())
        );

        assert_eq!(skeleton.resets, 0);
    }
}

use crate::pose_mesh::{PoseMesh, TargetTriangle};
use blend_tree_core::collaborators::ModelDriver;
use bevy::log::warn;

/// Drives a model from pose mesh queries.
#[derive(Clone, Copy, Debug, Default)]
pub struct PoseMeshUtility;

impl PoseMeshUtility {
    /// Plays the three poses of the target triangle with their barycentric weights and fades
    /// out every other pose of the mesh, all over `blend_time` seconds.
    pub fn blend_poses(
        mesh: &PoseMesh,
        model: &mut dyn ModelDriver,
        target: &TargetTriangle,
        blend_time: f32,
    ) {
        let Some(weights) = mesh.blend_weights(target) else {
            warn!(
                "Pose mesh {:?} has no triangle {}, clearing its poses",
                mesh.name(),
                target.triangle_id
            );
            Self::clear_poses(mesh, model, blend_time);
            return;
        };

        for vertex in mesh.vertices() {
            let animation = vertex.animation();
            match weights.iter().find(|(id, _)| *id == animation) {
                Some((_, weight)) => model.play_cycle(animation, *weight, blend_time),
                None => model.clear_cycle(animation, blend_time),
            }
        }
    }

    pub fn clear_poses(mesh: &PoseMesh, model: &mut dyn ModelDriver, delay: f32) {
        for vertex in mesh.vertices() {
            model.clear_cycle(vertex.animation(), delay);
        }
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::pose_mesh::test::head_mesh;
    use blend_tree_core::collaborators::AnimationId;

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub(crate) enum Call {
        Play(AnimationId, f32),
        Clear(AnimationId),
    }

    #[derive(Default)]
    pub(crate) struct RecordingModel {
        pub calls: Vec<Call>,
    }

    impl RecordingModel {
        pub(crate) fn weight_of(&self, animation: AnimationId) -> Option<f32> {
            self.calls.iter().rev().find_map(|call| match call {
                Call::Play(id, weight) if *id == animation => Some(*weight),
                _ => None,
            })
        }
    }

    impl ModelDriver for RecordingModel {
        fn play_cycle(&mut self, animation: AnimationId, weight: f32, _delay: f32) {
            self.calls.push(Call::Play(animation, weight));
        }

        fn clear_cycle(&mut self, animation: AnimationId, _delay: f32) {
            self.calls.push(Call::Clear(animation));
        }
    }

    #[test]
    fn test_blend_poses() {
        let mesh = head_mesh();
        let mut model = RecordingModel::default();
        let target = mesh.target_triangle(0.1, 0.1);

        PoseMeshUtility::blend_poses(&mesh, &mut model, &target, 0.3);

        assert_eq!(model.calls.len(), 5);
        let total: f32 = (0..3).filter_map(|i| model.weight_of(AnimationId(i))).sum();
        assert!((total - 1.).abs() < 1e-5);
        assert!(model.calls.contains(&Call::Clear(AnimationId(3))));
        assert!(model.calls.contains(&Call::Clear(AnimationId(4))));
    }

    #[test]
    fn test_clear_poses() {
        let mesh = head_mesh();
        let mut model = RecordingModel::default();
        PoseMeshUtility::clear_poses(&mesh, &mut model, 0.);
        assert_eq!(
            model.calls,
            (0..5).map(|i| Call::Clear(AnimationId(i))).collect::<Vec<_>>()
        );
    }
}

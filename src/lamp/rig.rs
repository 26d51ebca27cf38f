// Lamp joint hierarchy

use super::pose::Pose;
use crate::math::Transform;
use crate::scene::{JointSpec, LightId, ModelId, NodeId, SceneGraph};
use glam::Vec3;

/// Drawables the lamp is made of.
#[derive(Debug, Clone, Copy)]
pub struct RigParts {
    pub base: ModelId,
    pub joint: ModelId,
    pub arm: ModelId,
    pub head: ModelId,
    pub ear: ModelId,
    pub tail: ModelId,
    pub bulb: LightId,
}

/// Lamp proportions, all derived from the table it stands on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LampDimensions {
    pub radius: f32,
    pub base_height: f32,
    pub joint_radius: f32,
    pub arm_radius: f32,
    pub lower_length: f32,
    pub upper_length: f32,
}

impl LampDimensions {
    pub fn for_table(width: f32, height: f32) -> Self {
        let radius = width * 0.1;
        let joint_radius = radius * 0.2;
        Self {
            radius,
            base_height: height * 0.06,
            joint_radius,
            arm_radius: joint_radius / 2.0,
            lower_length: height * 0.45,
            upper_length: height * 0.4,
        }
    }

    fn lower_offset(&self) -> Vec3 {
        Vec3::new(-self.radius / 4.0, self.base_height, 0.0)
    }

    fn upper_offset(&self) -> Vec3 {
        Vec3::new(0.0, self.lower_length, 0.0)
    }

    fn head_offset(&self) -> Vec3 {
        Vec3::new(0.0, self.upper_length, 0.0)
    }
}

/// The animated joints of a lamp inside a [`SceneGraph`].
#[derive(Debug, Clone)]
pub struct LampRig {
    origin: Vec3,
    dims: LampDimensions,
    placement: NodeId,
    base_yaw: NodeId,
    lower_pitch: NodeId,
    upper_pitch: NodeId,
    head_yaw: NodeId,
    head_pitch: NodeId,
    bulb: NodeId,
}

fn box_shape(size: Vec3, lift: f32) -> Transform {
    Transform::translation(Vec3::new(0.0, lift, 0.0)) * Transform::scale(size)
}

impl LampRig {
    /// Builds the lamp under `parent`, posed at `pose`.
    ///
    /// `origin` is where the base centre sits for table position (0, 0).
    pub fn build(
        graph: &mut SceneGraph,
        parent: NodeId,
        origin: Vec3,
        dims: LampDimensions,
        parts: RigParts,
        pose: &Pose,
    ) -> Self {
        let root = graph.group("lamp");
        graph.add_child(parent, root);

        let d = dims;
        let joint_size = d.joint_radius * 2.0;
        let arm = |length: f32| box_shape(Vec3::new(d.arm_radius * 2.0, length, d.arm_radius * 2.0), length / 2.0);

        // Everything from the base placement down to the head pitch rides the
        // same chain; decorations hang off individual joints afterwards.
        let spine = graph.build_chain(
            root,
            &[
                JointSpec::joint("placement", Transform::identity()),
                JointSpec::model(
                    "base",
                    Transform::identity(),
                    box_shape(Vec3::new(d.radius * 2.0, d.base_height, d.radius * 2.0), d.base_height / 2.0),
                    parts.base,
                ),
                JointSpec::model("lower joint", Transform::identity(), Transform::uniform_scale(joint_size), parts.joint),
                JointSpec::model("lower arm", Transform::identity(), arm(d.lower_length), parts.arm),
                JointSpec::model("upper joint", Transform::identity(), Transform::uniform_scale(joint_size), parts.joint),
                JointSpec::model("upper arm", Transform::identity(), arm(d.upper_length), parts.arm),
                JointSpec::model("head joint", Transform::identity(), Transform::uniform_scale(joint_size * 0.5), parts.joint),
                JointSpec::joint("head pitch", Transform::identity()),
            ],
        );
        let [placement, base, lower_joint, _, upper_joint, _, head_yaw, head_pitch] =
            [0, 1, 2, 3, 4, 5, 6, 7].map(|i| spine[i].joint);

        // Outer rim of the base.
        graph.add_part(
            base,
            JointSpec::model(
                "outer base",
                Transform::identity(),
                box_shape(
                    Vec3::new(d.radius * 2.0 + 0.01, d.base_height / 3.5, d.radius * 2.0 + 0.01),
                    d.base_height / 7.0,
                ),
                parts.base,
            ),
        );

        Self::build_tail(graph, upper_joint, parts.tail);
        let bulb = Self::build_head(graph, head_pitch, &d, &parts);

        let rig = Self {
            origin,
            dims,
            placement,
            base_yaw: base,
            lower_pitch: lower_joint,
            upper_pitch: upper_joint,
            head_yaw,
            head_pitch,
            bulb,
        };
        rig.apply(graph, pose, 0.0);
        rig
    }

    fn build_tail(graph: &mut SceneGraph, upper_joint: NodeId, tail: ModelId) {
        const WIDTH: f32 = 0.05;
        const LOWER: f32 = 0.2;
        graph.build_chain(
            upper_joint,
            &[
                JointSpec::model(
                    "lower tail",
                    Transform::rotation_z(45.0) * Transform::translation(Vec3::new(0.0, LOWER, 0.0)),
                    Transform::scale(Vec3::new(WIDTH, LOWER, LOWER / 2.0)),
                    tail,
                ),
                JointSpec::model(
                    "middle tail",
                    Transform::translation(Vec3::new(0.0, LOWER * 0.7, -LOWER * 0.3)),
                    Transform::scale(Vec3::new(WIDTH, LOWER * 1.4, LOWER * 0.7)),
                    tail,
                ),
                JointSpec::model(
                    "upper tail",
                    Transform::translation(Vec3::new(0.0, LOWER * 0.9, -LOWER * 0.4)),
                    Transform::scale(Vec3::new(WIDTH, LOWER * 1.8, LOWER * 0.9)),
                    tail,
                ),
            ],
        );
    }

    /// Back head, ears, front head and the bulb. Returns the bulb node.
    fn build_head(graph: &mut SceneGraph, head_pitch: NodeId, d: &LampDimensions, parts: &RigParts) -> NodeId {
        let back_radius = d.arm_radius * 3.0;
        let back_length = 0.8;
        let front_radius = d.arm_radius * 3.5;
        let front_length = 0.75;

        // The head opens along its local -Y; the quarter turn points that at +X.
        let head = graph.build_chain(
            head_pitch,
            &[
                JointSpec::model(
                    "back head",
                    Transform::translation(Vec3::new(0.0, d.joint_radius / 2.0, 0.0)) * Transform::rotation_z(90.0),
                    Transform::scale(Vec3::new(back_radius * 2.0, back_length, back_radius * 2.0)),
                    parts.head,
                ),
                JointSpec::model(
                    "front head",
                    Transform::translation(Vec3::new(0.0, -back_length / 2.0 - front_length / 2.0, 0.0)),
                    Transform::scale(Vec3::new(front_radius * 2.0, front_length, front_radius * 2.0)),
                    parts.head,
                ),
                JointSpec::light(
                    "light bulb",
                    Transform::translation(Vec3::new(0.0, -front_length / 2.0, 0.0)),
                    Transform::identity(),
                    parts.bulb,
                ),
            ],
        );

        let ear_size = Vec3::new(d.arm_radius * 1.6, 0.6, d.arm_radius * 1.6);
        for (name, side, tilt) in [("left ear", -1.0, -20.0), ("right ear", 1.0, 20.0)] {
            graph.add_part(
                head[0].joint,
                JointSpec::model(
                    name,
                    Transform::rotation_z(-10.0)
                        * Transform::rotation_x(tilt)
                        * Transform::translation(Vec3::new(0.0, back_length / 2.0, side * back_radius / 1.5)),
                    box_shape(ear_size, ear_size.y / 2.0),
                    parts.ear,
                ),
            );
        }

        head[2].drawable.unwrap_or(head[2].joint)
    }

    /// Writes the pose into the joint nodes as fresh transforms.
    pub fn apply(&self, graph: &mut SceneGraph, pose: &Pose, elevation: f32) {
        let d = &self.dims;
        let offset = Vec3::new(pose.position.x, elevation, pose.position.y);
        graph.set_local(self.placement, Transform::translation(self.origin + offset));
        graph.set_local(self.base_yaw, Transform::rotation_y(pose.base_yaw));
        graph.set_local(
            self.lower_pitch,
            Transform::translation(d.lower_offset()) * Transform::rotation_z(pose.lower_pitch),
        );
        graph.set_local(
            self.upper_pitch,
            Transform::translation(d.upper_offset()) * Transform::rotation_z(pose.upper_pitch),
        );
        graph.set_local(
            self.head_yaw,
            Transform::translation(d.head_offset()) * Transform::rotation_y(pose.head_yaw),
        );
        graph.set_local(self.head_pitch, Transform::rotation_z(pose.head_pitch));
    }

    /// Transform node carrying the base position on the table.
    #[cfg(test)]
    pub fn placement(&self) -> NodeId {
        self.placement
    }

    pub fn bulb(&self) -> NodeId {
        self.bulb
    }

    #[cfg(test)]
    pub fn dimensions(&self) -> LampDimensions {
        self.dims
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lamp::config::LampConfig;
    use glam::Vec2;

    fn parts() -> RigParts {
        RigParts {
            base: ModelId(0),
            joint: ModelId(1),
            arm: ModelId(2),
            head: ModelId(3),
            ear: ModelId(4),
            tail: ModelId(5),
            bulb: LightId(0),
        }
    }

    fn rig(pose: &Pose) -> (SceneGraph, NodeId, LampRig) {
        let mut graph = SceneGraph::new();
        let root = graph.group("scene");
        let rig = LampRig::build(
            &mut graph,
            root,
            Vec3::new(0.0, 4.0, 0.0),
            LampDimensions::for_table(13.58, 7.8),
            parts(),
            pose,
        );
        (graph, root, rig)
    }

    #[test]
    fn rest_pose_holds_the_bulb_above_and_ahead_of_the_base() {
        let config = LampConfig::default();
        let pose = Pose::rest(&config, Vec2::ZERO);
        let (mut graph, root, rig) = rig(&pose);
        graph.propagate(root, Transform::identity());

        let bulb = graph.world(rig.bulb()).translation_vec();
        assert!(bulb.y > 4.0 + rig.dimensions().lower_length * 0.5);
        assert!(bulb.x > 0.0);
    }

    #[test]
    fn placement_follows_position_and_elevation() {
        let config = LampConfig::default();
        let mut pose = Pose::rest(&config, Vec2::ZERO);
        let (mut graph, root, rig) = rig(&pose);

        pose.position = Vec2::new(2.0, -1.0);
        rig.apply(&mut graph, &pose, 0.5);
        graph.propagate(root, Transform::identity());

        let placement = graph.world(rig.placement).translation_vec();
        assert!(placement.abs_diff_eq(Vec3::new(2.0, 4.5, -1.0), 1e-6));
    }

    #[test]
    fn base_yaw_swings_the_bulb_around_the_base() {
        let config = LampConfig::default();
        let mut pose = Pose::rest(&config, Vec2::ZERO);
        let (mut graph, root, rig) = rig(&pose);
        graph.propagate(root, Transform::identity());
        let ahead = graph.world(rig.bulb()).translation_vec();

        pose.base_yaw = 90.0;
        rig.apply(&mut graph, &pose, 0.0);
        graph.propagate(root, Transform::identity());
        let turned = graph.world(rig.bulb()).translation_vec();

        // Positive yaw turns +X toward -Z.
        assert!(turned.z < -ahead.x * 0.5);
        assert!((turned.y - ahead.y).abs() < 1e-4);
    }

    #[test]
    fn only_joint_nodes_change_when_posing() {
        let config = LampConfig::default();
        let pose = Pose::rest(&config, Vec2::ZERO);
        let (mut graph, _, rig) = rig(&pose);
        let nodes = graph.len();
        let posed = Pose {
            lower_pitch: -40.0,
            head_yaw: 30.0,
            ..pose
        };
        rig.apply(&mut graph, &posed, 0.0);
        assert_eq!(graph.len(), nodes);
        assert_eq!(graph.local(rig.head_pitch), Transform::rotation_z(posed.head_pitch));
    }
}

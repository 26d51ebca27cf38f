// Static room, table and window layout

use crate::lamp::{Accessory, LampConfig, LampDimensions, RigParts, TableBounds};
use crate::math::Transform;
use crate::scene::{JointSpec, LightId, ModelId, NodeId, SceneGraph};
use glam::{Vec2, Vec3};

pub const FLOOR: ModelId = ModelId(0);
pub const WALL: ModelId = ModelId(1);
pub const TABLE: ModelId = ModelId(2);
pub const DRAWER: ModelId = ModelId(3);
pub const HANDLE: ModelId = ModelId(4);
pub const LAMP_BODY: ModelId = ModelId(5);
pub const LAMP_JOINT: ModelId = ModelId(6);
pub const LAMP_EAR: ModelId = ModelId(7);
pub const LAMP_TAIL: ModelId = ModelId(8);
pub const POT: ModelId = ModelId(9);
pub const CACTUS: ModelId = ModelId(10);
pub const PIGGY: ModelId = ModelId(11);
pub const WINDOW_FRAME: ModelId = ModelId(12);
pub const GLASS: ModelId = ModelId(13);

pub const LAMP_BULB: LightId = LightId(0);

/// Flat colour a model is shaded with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub color: [f32; 3],
    pub alpha: f32,
}

impl Material {
    const fn opaque(r: f32, g: f32, b: f32) -> Self {
        Self {
            color: [r, g, b],
            alpha: 1.0,
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.alpha < 1.0
    }
}

// Indexed by model id.
const MATERIALS: [Material; 14] = [
    Material::opaque(0.55, 0.42, 0.30),
    Material::opaque(0.86, 0.83, 0.76),
    Material::opaque(0.45, 0.28, 0.16),
    Material::opaque(0.52, 0.33, 0.19),
    Material::opaque(0.75, 0.75, 0.78),
    Material::opaque(0.20, 0.45, 0.70),
    Material::opaque(0.15, 0.15, 0.17),
    Material::opaque(0.85, 0.30, 0.25),
    Material::opaque(0.95, 0.75, 0.20),
    Material::opaque(0.70, 0.38, 0.25),
    Material::opaque(0.25, 0.55, 0.25),
    Material::opaque(0.95, 0.65, 0.70),
    Material::opaque(0.92, 0.92, 0.90),
    Material {
        color: [0.70, 0.85, 0.95],
        alpha: 0.3,
    },
];

const MISSING: Material = Material::opaque(1.0, 0.0, 1.0);

pub fn material(model: ModelId) -> Material {
    MATERIALS.get(model.0 as usize).copied().unwrap_or(MISSING)
}

/// Drawables the lamp rig is built from.
pub const LAMP_PARTS: RigParts = RigParts {
    base: LAMP_BODY,
    joint: LAMP_JOINT,
    arm: LAMP_BODY,
    head: LAMP_BODY,
    ear: LAMP_EAR,
    tail: LAMP_TAIL,
    bulb: LAMP_BULB,
};

const WALL_THICKNESS: f32 = 0.4;
const FRAME: f32 = WALL_THICKNESS / 4.0;

// Fractions of the room.
const TABLE_RATIO: Vec3 = Vec3::new(0.679, 0.39, 0.286);
const WINDOW_RATIO: Vec2 = Vec2::new(0.45, 0.39);
const WINDOW_SILL: f32 = WINDOW_RATIO.y + 0.1;

// Fractions of the table.
const DRAWER_RATIO: Vec2 = Vec2::new(0.331, 0.6);
const TOP_DRAWER_RATIO: f32 = 0.4;

/// Distance from the table's left edge to the lamp's home spot.
const LAMP_INSET: f32 = 2.0;

/// The ceiling light circles the room at this share of its width.
const LIGHT_ORBIT_RATIO: f32 = 0.25;
/// Degrees per second.
const LIGHT_ORBIT_SPEED: f32 = 50.0;

fn block(name: &str, center: Vec3, size: Vec3, model: ModelId) -> JointSpec<'_> {
    JointSpec::model(name, Transform::translation(center), Transform::scale(size), model)
}

/// Where everything stands.
///
/// The lamp works in table coordinates: `(x, z)` relative to the centre of
/// the table top, with the origin returned by [`Layout::lamp_origin`].
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub room: Vec3,
    /// Table width, height and depth.
    pub table: Vec3,
    pub cactus_pot: Accessory,
    pub piggy_bank: Accessory,
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(Vec3::splat(20.0))
    }
}

impl Layout {
    pub fn new(room: Vec3) -> Self {
        let table = room * TABLE_RATIO;
        Self {
            room,
            table,
            cactus_pot: Accessory {
                center: Vec2::new(table.x * 0.3, -table.z * 0.15),
                radius: 0.5,
            },
            piggy_bank: Accessory {
                center: Vec2::new(table.x * 0.05, table.z * 0.1),
                radius: 0.6,
            },
        }
    }

    /// Tables stand against the back wall.
    fn table_z(&self) -> f32 {
        -(self.room.z - self.table.z) / 2.0
    }

    /// World position of the centre of the table top surface.
    pub fn lamp_origin(&self) -> Vec3 {
        Vec3::new(0.0, self.table.y + FRAME / 2.0, self.table_z())
    }

    pub fn lamp_home(&self) -> Vec2 {
        Vec2::new(-self.table.x / 2.0 + LAMP_INSET, 0.0)
    }

    pub fn lamp_dimensions(&self) -> LampDimensions {
        LampDimensions::for_table(self.table.x, self.table.y)
    }

    pub fn table_bounds(&self) -> TableBounds {
        let half = Vec2::new(self.table.x, self.table.z) / 2.0;
        TableBounds {
            min: -half,
            max: half,
            accessories: vec![self.cactus_pot, self.piggy_bank],
        }
    }

    /// Default lamp tunables fitted to this table.
    pub fn lamp_config(&self) -> LampConfig {
        LampConfig::default().with_table(
            self.table_bounds(),
            self.lamp_home(),
            self.lamp_dimensions().radius,
        )
    }

    /// Ceiling light position `seconds` after start; it keeps circling the
    /// middle of the room.
    pub fn world_light_position(&self, seconds: f32) -> Vec3 {
        let radius = self.room.x * LIGHT_ORBIT_RATIO;
        let angle = (seconds * LIGHT_ORBIT_SPEED).to_radians();
        Vec3::new(radius * angle.sin(), self.room.y - WALL_THICKNESS, radius * angle.cos())
    }

    /// Window opening in the back wall as (width, bottom, top).
    fn window_opening(&self) -> (f32, f32, f32) {
        let bottom = self.room.y * WINDOW_SILL;
        (self.room.x * WINDOW_RATIO.x, bottom, bottom + self.room.y * WINDOW_RATIO.y)
    }

    /// Floor, walls, table and the things standing on it.
    pub fn build_furniture(&self, graph: &mut SceneGraph, parent: NodeId) {
        self.build_room(graph, parent);
        let top = self.build_table(graph, parent);
        self.build_accessories(graph, top);
    }

    fn build_room(&self, graph: &mut SceneGraph, parent: NodeId) {
        let r = self.room;
        let t = WALL_THICKNESS;
        let room = graph.group("room");
        graph.add_child(parent, room);

        graph.add_part(room, block("floor", Vec3::new(0.0, -t / 2.0, 0.0), Vec3::new(r.x, t, r.z), FLOOR));
        for (name, side) in [("left wall", -1.0), ("right wall", 1.0)] {
            graph.add_part(
                room,
                block(name, Vec3::new(side * (r.x + t) / 2.0, r.y / 2.0, 0.0), Vec3::new(t, r.y, r.z), WALL),
            );
        }

        // The back wall is four slabs around the window opening.
        let back = graph
            .add_part(room, JointSpec::joint("back wall", Transform::translation(Vec3::new(0.0, 0.0, -(r.z + t) / 2.0))))
            .joint;
        let (width, bottom, top) = self.window_opening();
        let side = (r.x - width) / 2.0;
        let middle = (bottom + top) / 2.0;
        graph.add_part(back, block("wall below window", Vec3::new(0.0, bottom / 2.0, 0.0), Vec3::new(r.x, bottom, t), WALL));
        graph.add_part(
            back,
            block("wall above window", Vec3::new(0.0, (top + r.y) / 2.0, 0.0), Vec3::new(r.x, r.y - top, t), WALL),
        );
        for (name, sign) in [("wall left of window", -1.0), ("wall right of window", 1.0)] {
            graph.add_part(
                back,
                block(name, Vec3::new(sign * (width + side) / 2.0, middle, 0.0), Vec3::new(side, top - bottom, t), WALL),
            );
        }
    }

    /// Returns the table top joint accessories stand on.
    fn build_table(&self, graph: &mut SceneGraph, parent: NodeId) -> NodeId {
        let Vec3 { x: w, y: h, z: d } = self.table;
        let chain = graph.build_chain(
            parent,
            &[
                JointSpec::joint("table", Transform::translation(Vec3::new(0.0, 0.0, self.table_z()))),
                JointSpec::model(
                    "table top",
                    Transform::translation(Vec3::new(0.0, h, 0.0)),
                    Transform::scale(Vec3::new(w + FRAME, FRAME, d)),
                    TABLE,
                ),
            ],
        );
        let (table, top) = (chain[0].joint, chain[1].joint);

        for (name, side) in [("left leg", -1.0), ("right leg", 1.0)] {
            graph.add_part(table, block(name, Vec3::new(side * w / 2.0, h / 2.0, 0.0), Vec3::new(FRAME, h, d), TABLE));
        }

        let drawer_w = w * DRAWER_RATIO.x;
        let drawer_h = h * DRAWER_RATIO.y;
        let drawer_d = d - FRAME;
        graph.add_part(
            top,
            block(
                "back support",
                Vec3::new(0.0, -drawer_h / 2.0, -(d - FRAME) / 2.0),
                Vec3::new(w - FRAME, drawer_h, FRAME),
                TABLE,
            ),
        );

        // Drawers hang below the top on the right, top drawer first.
        let x = (w - drawer_w - FRAME) / 2.0;
        let upper_h = drawer_h * TOP_DRAWER_RATIO;
        let lower_h = drawer_h - upper_h;
        let handle = Vec3::new(FRAME / 2.0, drawer_h * 0.15, FRAME / 2.0);
        let front = d / 2.0 + handle.z;
        let drawers = graph.build_chain(
            top,
            &[
                JointSpec::model(
                    "top drawer",
                    Transform::translation(Vec3::new(x, -(FRAME + upper_h) / 2.0, FRAME / 2.0)),
                    Transform::scale(Vec3::new(drawer_w, upper_h, drawer_d)),
                    DRAWER,
                ),
                JointSpec::model(
                    "bottom drawer",
                    Transform::translation(Vec3::new(0.0, -(upper_h + lower_h) / 2.0, 0.0)),
                    Transform::scale(Vec3::new(drawer_w, lower_h, drawer_d)),
                    DRAWER,
                ),
            ],
        );
        for (link, name) in drawers.iter().zip(["top handle", "bottom handle"]) {
            graph.add_part(link.joint, block(name, Vec3::new(-drawer_w / 2.5, 0.0, front), handle, HANDLE));
        }

        top
    }

    fn build_accessories(&self, graph: &mut SceneGraph, top: NodeId) {
        let surface = FRAME / 2.0;

        let pot = self.cactus_pot;
        let pot_height = pot.radius * 1.6;
        graph.build_chain(
            top,
            &[
                JointSpec::model(
                    "cactus pot",
                    Transform::translation(Vec3::new(pot.center.x, surface, pot.center.y)),
                    Transform::translation(Vec3::new(0.0, pot_height / 2.0, 0.0))
                        * Transform::scale(Vec3::new(pot.radius * 2.0, pot_height, pot.radius * 2.0)),
                    POT,
                ),
                JointSpec::model(
                    "cactus",
                    Transform::translation(Vec3::new(0.0, pot_height, 0.0)),
                    Transform::translation(Vec3::new(0.0, pot_height * 0.75, 0.0))
                        * Transform::scale(Vec3::new(pot.radius, pot_height * 1.5, pot.radius)),
                    CACTUS,
                ),
            ],
        );

        let pig = self.piggy_bank;
        let body = Vec3::new(pig.radius * 2.0, pig.radius * 1.2, pig.radius * 1.4);
        let piggy = graph
            .add_part(
                top,
                JointSpec::model(
                    "piggy bank",
                    Transform::translation(Vec3::new(pig.center.x, surface + body.y / 2.0, pig.center.y)),
                    Transform::scale(body),
                    PIGGY,
                ),
            )
            .joint;
        graph.add_part(
            piggy,
            block("nose", Vec3::new(body.x / 2.0, 0.0, 0.0), Vec3::splat(pig.radius * 0.4), PIGGY),
        );
    }

    /// Window frame and glass. Built after everything else so the glass is
    /// blended over the rest of the scene.
    pub fn build_window(&self, graph: &mut SceneGraph, parent: NodeId) {
        let (width, bottom, top) = self.window_opening();
        let height = top - bottom;
        let window = graph
            .add_part(
                parent,
                JointSpec::joint(
                    "window",
                    Transform::translation(Vec3::new(0.0, bottom, -(self.room.z + WALL_THICKNESS) / 2.0)),
                ),
            )
            .joint;

        let bar = Vec3::new(width, FRAME, FRAME);
        for (name, y) in [("window bottom bar", FRAME / 2.0), ("window top bar", height - FRAME / 2.0)] {
            graph.add_part(window, block(name, Vec3::new(0.0, y, 0.0), bar, WINDOW_FRAME));
        }
        let post = Vec3::new(FRAME, height - 2.0 * FRAME, FRAME);
        for (name, x) in [
            ("window left post", -(width - FRAME) / 2.0),
            ("window middle post", 0.0),
            ("window right post", (width - FRAME) / 2.0),
        ] {
            graph.add_part(window, block(name, Vec3::new(x, height / 2.0, 0.0), post, WINDOW_FRAME));
        }

        let pane = Vec3::new(width / 2.0 - 1.5 * FRAME, height - 2.0 * FRAME, FRAME / 4.0);
        for (name, sign) in [("left glass", -1.0), ("right glass", 1.0)] {
            graph.add_part(window, block(name, Vec3::new(sign * width / 4.0, height / 2.0, 0.0), pane, GLASS));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lamp::jump::sample_destination;
    use crate::scene::DrawTarget;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[derive(Default)]
    struct Models(Vec<(ModelId, Transform)>);

    impl DrawTarget for Models {
        fn draw_model(&mut self, model: ModelId, world: Transform) {
            self.0.push((model, world));
        }
        fn set_light_position(&mut self, _: LightId, _: Vec3) {}
        fn set_light_direction(&mut self, _: LightId, _: Vec3) {}
        fn draw_light(&mut self, _: LightId, _: Transform) {}
    }

    fn built(layout: &Layout) -> Models {
        let mut graph = SceneGraph::new();
        let root = graph.group("scene");
        layout.build_furniture(&mut graph, root);
        layout.build_window(&mut graph, root);
        graph.propagate(root, Transform::identity());
        let mut models = Models::default();
        graph.draw(root, &mut models);
        models
    }

    #[test]
    fn table_matches_room_ratios() {
        let layout = Layout::default();
        assert!(layout.table.abs_diff_eq(Vec3::new(13.58, 7.8, 5.72), 1e-4));
        assert!(layout.lamp_origin().y > layout.table.y);
    }

    #[test]
    fn lamp_config_fits_the_table() {
        let layout = Layout::default();
        let config = layout.lamp_config();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.home, layout.lamp_home());
        assert_eq!(config.table.accessories.len(), 2);

        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..200 {
            let target = sample_destination(&mut rng, config.home, &config).expect("room to land");
            assert!(target.x.abs() <= layout.table.x / 2.0 && target.y.abs() <= layout.table.z / 2.0);
        }
    }

    #[test]
    fn ceiling_light_circles_the_room() {
        let layout = Layout::default();
        let start = layout.world_light_position(0.0);
        assert!(start.abs_diff_eq(Vec3::new(0.0, 19.6, 5.0), 1e-5));

        let quarter = layout.world_light_position(90.0 / LIGHT_ORBIT_SPEED);
        assert!(quarter.abs_diff_eq(Vec3::new(5.0, 19.6, 0.0), 1e-4));

        let lap = 360.0 / LIGHT_ORBIT_SPEED;
        for step in 0..16 {
            let position = layout.world_light_position(step as f32 * 0.7);
            assert!((Vec2::new(position.x, position.z).length() - 5.0).abs() < 1e-4);
            assert!(position.abs_diff_eq(layout.world_light_position(step as f32 * 0.7 + lap), 1e-3));
        }
    }

    #[test]
    fn home_is_clear_of_the_accessories() {
        let layout = Layout::default();
        let home = layout.lamp_home();
        let radius = layout.lamp_dimensions().radius;
        for accessory in [layout.cactus_pot, layout.piggy_bank] {
            assert!(home.distance(accessory.center) > accessory.radius + radius);
        }
    }

    #[test]
    fn only_glass_is_transparent() {
        for id in 0..MATERIALS.len() as u32 {
            assert_eq!(material(ModelId(id)).is_transparent(), ModelId(id) == GLASS);
        }
        assert_eq!(material(ModelId(999)), MISSING);
    }

    #[test]
    fn glass_is_drawn_last() {
        let models = built(&Layout::default());
        let first_glass = models.0.iter().position(|(id, _)| *id == GLASS).expect("glass drawn");
        assert_eq!(models.0.len() - first_glass, 2);
        assert!(models.0[first_glass..].iter().all(|(id, _)| *id == GLASS));
    }

    #[test]
    fn table_top_sits_at_table_height_against_the_back_wall() {
        let layout = Layout::default();
        let models = built(&layout);
        let (_, top) = models.0.iter().find(|(id, _)| *id == TABLE).expect("table top drawn");
        let centre = top.translation_vec();
        assert!(centre.abs_diff_eq(Vec3::new(0.0, layout.table.y, layout.table_z()), 1e-5));
        assert!(centre.z - layout.table.z / 2.0 >= -layout.room.z / 2.0 - 1e-4);
    }
}

// The animated scene: room, table and lamp

use crate::error::Result;
use crate::lamp::pose::Pose;
use crate::lamp::{LampAnimator, LampControl, LampRig};
use crate::math::Transform;
use crate::room::{Layout, LAMP_PARTS};
use crate::scene::{DrawTarget, NodeId, SceneGraph};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;

pub struct World {
    graph: SceneGraph,
    root: NodeId,
    layout: Layout,
    animator: LampAnimator,
}

impl World {
    pub fn new(layout: Layout) -> Result<Self> {
        Self::with_rng(layout, StdRng::from_entropy())
    }

    pub fn with_rng(layout: Layout, rng: StdRng) -> Result<Self> {
        let config = layout.lamp_config();
        config.validate()?;

        let mut graph = SceneGraph::new();
        let root = graph.group("Anilamp scene");
        layout.build_furniture(&mut graph, root);
        let rig = LampRig::build(
            &mut graph,
            root,
            layout.lamp_origin(),
            layout.lamp_dimensions(),
            LAMP_PARTS,
            &Pose::rest(&config, config.home),
        );
        layout.build_window(&mut graph, root);
        graph.propagate(root, Transform::identity());

        log::debug!("lamp bulb at {}", graph.world(rig.bulb()).translation_vec());
        let animator = LampAnimator::with_rng(config, rig, rng)?;
        log::info!("scene built with {} nodes", graph.len());
        log::debug!("scene graph:\n{}", graph.dump(root, false));

        Ok(Self {
            graph,
            root,
            layout,
            animator,
        })
    }

    /// Advances the lamp to `now` and refreshes every world transform.
    pub fn update(&mut self, now: Instant) {
        self.animator.update(now, &mut self.graph);
        self.graph.propagate(self.root, Transform::identity());
    }

    pub fn draw<T: DrawTarget + ?Sized>(&self, target: &mut T) {
        self.graph.draw(self.root, target);
    }

    pub fn controls(&mut self) -> &mut dyn LampControl {
        &mut self.animator
    }

    pub fn animator(&self) -> &LampAnimator {
        &self.animator
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    #[cfg(test)]
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }
}

// Scene graph for Anilamp

use crate::math::Transform;
use glam::Vec3;
use std::fmt::Write;

/// Handle to a node stored in a [`SceneGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Opaque reference to an external mesh + material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelId(pub u32);

/// Opaque reference to an external light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LightId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    /// Pure container.
    Group,
    /// Applies a local matrix before propagating to children.
    Transform(Transform),
    Model(ModelId),
    Light(LightId),
}

/// What a drawable node hangs off its transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    Model(ModelId),
    Light(LightId),
}

impl From<Attachment> for NodeKind {
    fn from(attachment: Attachment) -> Self {
        match attachment {
            Attachment::Model(id) => NodeKind::Model(id),
            Attachment::Light(id) => NodeKind::Light(id),
        }
    }
}

/// The renderer side of a draw traversal.
///
/// Lights get their position and direction pushed before they are drawn.
pub trait DrawTarget {
    fn draw_model(&mut self, model: ModelId, world: Transform);
    fn set_light_position(&mut self, light: LightId, position: Vec3);
    fn set_light_direction(&mut self, light: LightId, direction: Vec3);
    fn draw_light(&mut self, light: LightId, world: Transform);
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub kind: NodeKind,
    children: Vec<NodeId>,
    world: Transform,
    #[cfg(debug_assertions)]
    attached: bool,
}

/// One link of a declarative joint chain.
///
/// `local` is the joint itself and is inherited by every later link. `shape`
/// only sizes the attachment hanging off the joint and is not inherited.
#[derive(Debug, Clone, Copy)]
pub struct JointSpec<'a> {
    pub name: &'a str,
    pub local: Transform,
    pub shape: Transform,
    pub attachment: Option<Attachment>,
}

impl<'a> JointSpec<'a> {
    /// A bare joint with nothing drawn at it.
    pub fn joint(name: &'a str, local: Transform) -> Self {
        Self {
            name,
            local,
            shape: Transform::IDENTITY,
            attachment: None,
        }
    }

    pub fn model(name: &'a str, local: Transform, shape: Transform, model: ModelId) -> Self {
        Self {
            name,
            local,
            shape,
            attachment: Some(Attachment::Model(model)),
        }
    }

    pub fn light(name: &'a str, local: Transform, shape: Transform, light: LightId) -> Self {
        Self {
            name,
            local,
            shape,
            attachment: Some(Attachment::Light(light)),
        }
    }
}

/// Node ids created for one [`JointSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainLinks {
    pub group: NodeId,
    pub joint: NodeId,
    pub drawable: Option<NodeId>,
}

/// Arena-backed scene tree.
///
/// Children are kept in insertion order, which is also draw order. The graph
/// does not check for cycles; callers build trees top-down.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
}

impl SceneGraph {
    /// Creates a new, empty graph.
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn add_node(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(SceneNode {
            name: name.into(),
            kind,
            children: Vec::new(),
            world: Transform::IDENTITY,
            #[cfg(debug_assertions)]
            attached: false,
        });
        id
    }

    pub fn group(&mut self, name: impl Into<String>) -> NodeId {
        self.add_node(name, NodeKind::Group)
    }

    pub fn transform(&mut self, name: impl Into<String>, local: Transform) -> NodeId {
        self.add_node(name, NodeKind::Transform(local))
    }

    #[cfg(test)]
    pub fn model(&mut self, name: impl Into<String>, model: ModelId) -> NodeId {
        self.add_node(name, NodeKind::Model(model))
    }

    /// Appends `child` to the end of `parent`'s children.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        #[cfg(debug_assertions)]
        {
            let node = &mut self.nodes[child.0];
            debug_assert!(!node.attached, "node '{}' already has a parent", node.name);
            node.attached = true;
        }
        self.nodes[parent.0].children.push(child);
    }

    #[cfg(test)]
    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.0]
    }

    #[cfg(test)]
    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    #[cfg(test)]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn world(&self, id: NodeId) -> Transform {
        self.nodes[id.0].world
    }

    /// The node's own matrix; identity for anything but a Transform node.
    #[cfg(test)]
    pub fn local(&self, id: NodeId) -> Transform {
        match self.nodes[id.0].kind {
            NodeKind::Transform(local) => local,
            _ => Transform::IDENTITY,
        }
    }

    /// Replaces a Transform node's local matrix.
    pub fn set_local(&mut self, id: NodeId, local: Transform) {
        let node = &mut self.nodes[id.0];
        match &mut node.kind {
            NodeKind::Transform(current) => *current = local,
            _ => log::warn!("set_local on non-transform node '{}'", node.name),
        }
    }

    /// Recomputes world transforms for `id` and everything below it.
    pub fn propagate(&mut self, id: NodeId, parent_world: Transform) {
        let node = &mut self.nodes[id.0];
        let world = match node.kind {
            NodeKind::Transform(local) => parent_world * local,
            _ => parent_world,
        };
        node.world = world;

        // Children are walked by index so the arena can be borrowed mutably.
        for i in 0..self.nodes[id.0].children.len() {
            let child = self.nodes[id.0].children[i];
            self.propagate(child, world);
        }
    }

    /// Walks the tree in child-insertion order, handing drawables to `target`.
    pub fn draw<T: DrawTarget + ?Sized>(&self, id: NodeId, target: &mut T) {
        let node = &self.nodes[id.0];
        let world = node.world;
        match node.kind {
            NodeKind::Model(model) => target.draw_model(model, world),
            NodeKind::Light(light) => {
                target.set_light_position(light, world.translation_vec());
                target.set_light_direction(light, world.rotation_vec());
                target.draw_light(light, world);
            }
            NodeKind::Group | NodeKind::Transform(_) => {}
        }

        for &child in &node.children {
            self.draw(child, target);
        }
    }

    /// Wires a joint chain from data.
    ///
    /// Every `JointSpec` becomes a group holding the joint transform; an attachment
    /// gets its own shape transform and drawable under the joint. The first
    /// group hangs off `parent` and each later one off the previous joint.
    pub fn build_chain(&mut self, parent: NodeId, specs: &[JointSpec<'_>]) -> Vec<ChainLinks> {
        let mut links = Vec::with_capacity(specs.len());
        let mut anchor = parent;
        for spec in specs {
            let group = self.group(spec.name);
            let joint = self.transform(format!("{} joint", spec.name), spec.local);
            self.add_child(anchor, group);
            self.add_child(group, joint);

            let drawable = spec.attachment.map(|attachment| {
                let shape = self.transform(format!("{} transform", spec.name), spec.shape);
                let node = self.add_node(format!("{} node", spec.name), attachment.into());
                self.add_child(joint, shape);
                self.add_child(shape, node);
                node
            });

            links.push(ChainLinks {
                group,
                joint,
                drawable,
            });
            anchor = joint;
        }
        links
    }

    /// Hangs a single link off `parent`.
    pub fn add_part(&mut self, parent: NodeId, spec: JointSpec<'_>) -> ChainLinks {
        let links = self.build_chain(parent, &[spec]);
        links[0]
    }

    /// Indented listing of the subtree, optionally with world matrices.
    pub fn dump(&self, id: NodeId, in_full: bool) -> String {
        let mut out = String::new();
        self.dump_into(&mut out, id, 0, in_full);
        out
    }

    fn dump_into(&self, out: &mut String, id: NodeId, indent: usize, in_full: bool) {
        let node = &self.nodes[id.0];
        let _ = writeln!(out, "{indent} {:width$}Name: {}", "", node.name, width = indent * 2);
        if in_full {
            let _ = writeln!(out, "worldTransform\n{:?}", node.world.matrix());
            if let NodeKind::Transform(local) = node.kind {
                let _ = writeln!(out, "transform node:\n{:?}", local.matrix());
            }
        }
        for &child in &node.children {
            self.dump_into(out, child, indent + 1, in_full);
        }
    }
}

//! Scene graph and hierarchical scene organization.
//!
//! A [`Scene`] owns a list of root nodes. Every node implements [`SceneNode`]
//! and carries a [`NodeCore`] with its name, visibility, transforms and
//! children. Geometry is kept on the CPU and uploaded on the first
//! [`SceneNode::write_to_buffers`] call after creation or after the GPU
//! resources were released.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crate::{
    data_structures::{
        instance::Instance,
        model::{Geometry, GpuMesh, LineVertex, Side},
        texture::TextureAtlas,
    },
    render::{Instanced, Render},
};

static NEXT_SCENE_ID: AtomicU64 = AtomicU64::new(1);

/// State shared by all node kinds.
#[derive(Default)]
pub struct NodeCore {
    pub name: String,
    pub visible: bool,
    /// Tag of the renderer that added the node to a scene.
    pub render_type: Option<String>,
    pub local: Instance,
    pub world: Instance,
    pub children: Vec<Box<dyn SceneNode>>,
}

impl NodeCore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            ..Default::default()
        }
    }
}

pub trait SceneNode {
    fn core(&self) -> &NodeCore;
    fn core_mut(&mut self) -> &mut NodeCore;

    fn name(&self) -> &str {
        &self.core().name
    }
    fn is_visible(&self) -> bool {
        self.core().visible
    }
    fn set_visible(&mut self, visible: bool) {
        self.core_mut().visible = visible;
    }
    fn render_type(&self) -> Option<&str> {
        self.core().render_type.as_deref()
    }
    fn set_render_type(&mut self, render_type: Option<&str>) {
        self.core_mut().render_type = render_type.map(str::to_string);
    }
    fn get_local_transform(&self) -> &Instance {
        &self.core().local
    }
    fn get_local_transform_mut(&mut self) -> &mut Instance {
        &mut self.core_mut().local
    }
    fn get_world_transform(&self) -> &Instance {
        &self.core().world
    }
    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.core().children
    }
    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.core_mut().children
    }
    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.core_mut().children.push(child);
    }

    fn update_world_transforms(&mut self, parent: &Instance) {
        let core = self.core_mut();
        core.world = parent * &core.local;
        let world = core.world.clone();
        for child in core.children.iter_mut() {
            child.update_world_transforms(&world);
        }
    }

    fn write_to_buffers(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        self.get_children_mut()
            .iter_mut()
            .for_each(|child| child.write_to_buffers(device, queue));
    }

    /// Renders of this node and its children, hidden nodes hide their subtree.
    fn get_render(&self) -> Vec<Render<'_>> {
        if !self.is_visible() {
            return Vec::new();
        }
        self.get_children()
            .iter()
            .flat_map(|child| child.get_render())
            .collect()
    }

    /// Drops GPU buffers but keeps the CPU geometry so they can be re-uploaded.
    fn release_gpu(&mut self) {
        self.get_children_mut()
            .iter_mut()
            .for_each(|child| child.release_gpu());
    }

    /// Destroys GPU buffers and recursively removes all children.
    fn dispose(&mut self) {
        self.release_gpu();
        for mut child in self.get_children_mut().drain(..) {
            child.dispose();
        }
    }

    fn as_mesh(&self) -> Option<&MeshNode> {
        None
    }

    /// Colour of an ambient light node.
    fn ambient_color(&self) -> Option<[f32; 3]> {
        None
    }
}

/// A node without geometry, used as pivot.
pub struct GroupNode {
    core: NodeCore,
}

impl GroupNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: NodeCore::new(name),
        }
    }

    pub fn with_position(name: impl Into<String>, x: f32, y: f32, z: f32) -> Self {
        let mut node = Self::new(name);
        node.core.local = Instance::from_translation(x, y, z);
        node
    }
}

impl SceneNode for GroupNode {
    fn core(&self) -> &NodeCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }
}

/// How a mesh samples its atlas.
#[derive(Clone, Debug)]
pub struct MeshMaterial {
    pub atlas: Arc<TextureAtlas>,
    pub transparent: bool,
    pub side: Side,
    /// Fragments with a lower alpha are discarded.
    pub alpha_test: f32,
}

impl MeshMaterial {
    pub fn new(atlas: Arc<TextureAtlas>, transparent: bool) -> Self {
        Self {
            atlas,
            transparent,
            side: if transparent { Side::Double } else { Side::Front },
            alpha_test: 0.5,
        }
    }
}

/// A textured mesh.
pub struct MeshNode {
    core: NodeCore,
    geometry: Geometry,
    material: MeshMaterial,
    gpu: Option<GpuMesh>,
}

impl MeshNode {
    pub fn new(name: impl Into<String>, geometry: Geometry, material: MeshMaterial) -> Self {
        Self {
            core: NodeCore::new(name),
            geometry,
            material,
            gpu: None,
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn material(&self) -> &MeshMaterial {
        &self.material
    }

    pub fn is_uploaded(&self) -> bool {
        self.gpu.is_some()
    }
}

impl SceneNode for MeshNode {
    fn core(&self) -> &NodeCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn write_to_buffers(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        let raw = self.core.world.to_raw();
        match &self.gpu {
            Some(gpu) => queue.write_buffer(&gpu.instance_buffer, 0, bytemuck::cast_slice(&[raw])),
            None => {
                self.gpu = Some(GpuMesh::new(
                    device,
                    &self.core.name,
                    &self.geometry.vertices,
                    Some(&self.geometry.indices),
                    raw,
                ))
            }
        }
        self.core
            .children
            .iter_mut()
            .for_each(|child| child.write_to_buffers(device, queue));
    }

    fn get_render(&self) -> Vec<Render<'_>> {
        if !self.core.visible {
            return Vec::new();
        }
        let own = self.gpu.as_ref().map(|mesh| {
            let instanced = Instanced {
                mesh,
                atlas: &self.material.atlas,
            };
            if self.material.transparent {
                Render::Transparent(instanced)
            } else {
                Render::Default(instanced)
            }
        });
        self.core
            .children
            .iter()
            .flat_map(|child| child.get_render())
            .chain(own)
            .collect()
    }

    fn release_gpu(&mut self) {
        if let Some(gpu) = self.gpu.take() {
            gpu.destroy();
        }
        self.core
            .children
            .iter_mut()
            .for_each(|child| child.release_gpu());
    }

    fn as_mesh(&self) -> Option<&MeshNode> {
        Some(self)
    }
}

/// Unlit coloured line segments.
pub struct LineNode {
    core: NodeCore,
    vertices: Vec<LineVertex>,
    gpu: Option<GpuMesh>,
}

impl LineNode {
    pub fn new(name: impl Into<String>, vertices: Vec<LineVertex>) -> Self {
        Self {
            core: NodeCore::new(name),
            vertices,
            gpu: None,
        }
    }

    pub fn vertices(&self) -> &[LineVertex] {
        &self.vertices
    }
}

impl SceneNode for LineNode {
    fn core(&self) -> &NodeCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn write_to_buffers(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        let raw = self.core.world.to_raw();
        match &self.gpu {
            Some(gpu) => queue.write_buffer(&gpu.instance_buffer, 0, bytemuck::cast_slice(&[raw])),
            None => {
                self.gpu = Some(GpuMesh::new(
                    device,
                    &self.core.name,
                    &self.vertices,
                    None,
                    raw,
                ))
            }
        }
    }

    fn get_render(&self) -> Vec<Render<'_>> {
        match &self.gpu {
            Some(mesh) if self.core.visible => vec![Render::Lines(mesh)],
            _ => Vec::new(),
        }
    }

    fn release_gpu(&mut self) {
        if let Some(gpu) = self.gpu.take() {
            gpu.destroy();
        }
    }
}

/// Soft white light lighting every face evenly.
pub struct AmbientLightNode {
    core: NodeCore,
    color: u32,
}

impl AmbientLightNode {
    pub const DEFAULT_COLOR: u32 = 0xF0F0F0;

    pub fn new(color: u32) -> Self {
        Self {
            core: NodeCore::new("ambientLight"),
            color,
        }
    }
}

impl Default for AmbientLightNode {
    fn default() -> Self {
        Self::new(Self::DEFAULT_COLOR)
    }
}

impl SceneNode for AmbientLightNode {
    fn core(&self) -> &NodeCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn ambient_color(&self) -> Option<[f32; 3]> {
        let channel = |shift: u32| ((self.color >> shift) & 0xFF) as f32 / 255.0;
        Some([channel(16), channel(8), channel(0)])
    }
}

/// Root container of everything a renderer draws.
pub struct Scene {
    id: u64,
    children: Vec<Box<dyn SceneNode>>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            id: NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed),
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn add(&mut self, node: Box<dyn SceneNode>) {
        self.children.push(node);
    }

    pub fn children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Depth first search over the whole tree.
    pub fn get_object_by_name(&self, name: &str) -> Option<&dyn SceneNode> {
        find(&self.children, name)
    }

    pub fn get_object_by_name_mut(&mut self, name: &str) -> Option<&mut Box<dyn SceneNode>> {
        find_mut(&mut self.children, name)
    }

    /// Removes and disposes the first root node with the given name.
    pub fn remove_by_name(&mut self, name: &str) -> bool {
        match self.children.iter().position(|child| child.name() == name) {
            Some(idx) => {
                let mut node = self.children.remove(idx);
                node.dispose();
                true
            }
            None => false,
        }
    }

    /// Removes and disposes root nodes.
    ///
    /// With `render_type` only nodes tagged with it are considered, `keep`
    /// spares every node it returns `true` for. Returns the number of removed
    /// nodes.
    pub fn clear(
        &mut self,
        render_type: Option<&str>,
        keep: Option<&dyn Fn(&dyn SceneNode) -> bool>,
    ) -> usize {
        let before = self.children.len();
        let (removed, kept): (Vec<_>, Vec<_>) =
            self.children.drain(..).partition(|child| {
                let spared = keep.map(|keep| keep(child.as_ref())).unwrap_or(false);
                let matches_type = render_type
                    .map(|render_type| child.render_type() == Some(render_type))
                    .unwrap_or(true);
                !spared && matches_type
            });
        self.children = kept;
        for mut node in removed {
            node.dispose();
        }
        before - self.children.len()
    }

    pub fn update_world_transforms(&mut self) {
        let root = Instance::new();
        for child in self.children.iter_mut() {
            child.update_world_transforms(&root);
        }
    }

    pub fn write_to_buffers(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        for child in self.children.iter_mut() {
            child.write_to_buffers(device, queue);
        }
    }

    pub fn get_render(&self) -> Render<'_> {
        Render::Composed(
            self.children
                .iter()
                .map(|child| Render::Composed(child.get_render()))
                .collect(),
        )
    }

    pub fn release_gpu(&mut self) {
        for child in self.children.iter_mut() {
            child.release_gpu();
        }
    }

    /// Summed colour of all ambient lights, black when there is none.
    pub fn ambient_light(&self) -> [f32; 3] {
        self.children
            .iter()
            .filter_map(|child| child.ambient_color())
            .fold([0.0; 3], |acc, color| {
                [acc[0] + color[0], acc[1] + color[1], acc[2] + color[2]]
            })
    }

    /// Number of mesh nodes in the whole tree.
    pub fn mesh_count(&self) -> usize {
        fn count(nodes: &[Box<dyn SceneNode>]) -> usize {
            nodes
                .iter()
                .map(|node| node.as_mesh().map_or(0, |_| 1) + count(node.get_children()))
                .sum()
        }
        count(&self.children)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

fn find<'a>(nodes: &'a [Box<dyn SceneNode>], name: &str) -> Option<&'a dyn SceneNode> {
    for node in nodes {
        if node.name() == name {
            return Some(node.as_ref());
        }
        if let Some(found) = find(node.get_children(), name) {
            return Some(found);
        }
    }
    None
}

fn find_mut<'a>(
    nodes: &'a mut Vec<Box<dyn SceneNode>>,
    name: &str,
) -> Option<&'a mut Box<dyn SceneNode>> {
    for node in nodes.iter_mut() {
        if node.name() == name {
            return Some(node);
        }
        if let Some(found) = find_mut(node.get_children_mut(), name) {
            return Some(found);
        }
    }
    None
}

use std::{
    cell::RefCell,
    collections::HashMap,
    future::Future,
    io::Cursor,
    rc::Rc,
    sync::{Arc, Mutex},
};

use base64::Engine;
use image::{ImageFormat, Rgba, RgbaImage};
use skin_ngin::{
    backend::GraphicsBackend,
    camera::{Camera, Projection},
    config::Endpoints,
    data_structures::{
        scene_graph::{Scene, SceneNode},
        texture::TextureAtlas,
    },
    resources::SkinFetcher,
};

pub const SKIN_HOST: &str = "https://skins.test/";
pub const LOOKUP_HOST: &str = "https://lookup.test/?name=";
pub const MINESKIN_HOST: &str = "https://mineskin.test/";

/// What a [`RecordingBackend`] was asked to do.
#[derive(Debug, Default)]
pub struct BackendLog {
    pub size: (u32, u32),
    pub resizes: Vec<(u32, u32)>,
    pub renders: usize,
    /// Number of meshes in the scene for every rendered frame.
    pub meshes: Vec<usize>,
    pub releases: usize,
    pub restores: usize,
    pub disposed: bool,
}

/// A backend that draws nothing and records every call.
#[derive(Clone, Debug, Default)]
pub struct RecordingBackend {
    log: Rc<RefCell<BackendLog>>,
    pixels: Option<RgbaImage>,
}

impl RecordingBackend {
    pub fn new() -> (Self, Rc<RefCell<BackendLog>>) {
        let backend = Self::default();
        let log = backend.log.clone();
        (backend, log)
    }

    /// `read_pixels` will return `pixels` instead of a transparent frame.
    pub fn with_pixels(pixels: RgbaImage) -> (Self, Rc<RefCell<BackendLog>>) {
        let (mut backend, log) = Self::new();
        backend.pixels = Some(pixels);
        (backend, log)
    }
}

impl GraphicsBackend for RecordingBackend {
    fn size(&self) -> (u32, u32) {
        self.log.borrow().size
    }

    fn resize(&mut self, width: u32, height: u32) {
        let mut log = self.log.borrow_mut();
        log.size = (width, height);
        log.resizes.push((width, height));
    }

    fn render(
        &mut self,
        scene: &mut Scene,
        _camera: &Camera,
        _projection: &Projection,
    ) -> anyhow::Result<()> {
        let mut log = self.log.borrow_mut();
        log.renders += 1;
        log.meshes.push(scene.mesh_count());
        Ok(())
    }

    fn release_context(&mut self) {
        self.log.borrow_mut().releases += 1;
    }

    fn restore_context(&mut self) -> anyhow::Result<()> {
        self.log.borrow_mut().restores += 1;
        Ok(())
    }

    fn read_pixels(&mut self) -> impl Future<Output = anyhow::Result<RgbaImage>> {
        let (width, height) = self.size();
        let image = self
            .pixels
            .clone()
            .unwrap_or_else(|| RgbaImage::new(width, height));
        async move { Ok(image) }
    }

    fn dispose(&mut self) {
        self.log.borrow_mut().disposed = true;
    }
}

/// Serves textures and lookup responses from memory.
#[derive(Clone, Debug, Default)]
pub struct MapFetcher {
    bytes: Arc<HashMap<String, Vec<u8>>>,
    texts: Arc<HashMap<String, String>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bytes(mut self, url: &str, bytes: Vec<u8>) -> Self {
        Arc::make_mut(&mut self.bytes).insert(url.to_string(), bytes);
        self
    }

    pub fn with_text(mut self, url: &str, text: &str) -> Self {
        Arc::make_mut(&mut self.texts).insert(url.to_string(), text.to_string());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, url: &str) {
        self.requests.lock().unwrap().push(url.to_string());
    }
}

impl SkinFetcher for MapFetcher {
    fn fetch_bytes(&self, url: &str) -> impl Future<Output = anyhow::Result<Vec<u8>>> {
        self.record(url);
        let result = self
            .bytes
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("404 Not Found: {url}"));
        async move { result }
    }

    fn fetch_text(&self, url: &str) -> impl Future<Output = anyhow::Result<String>> {
        self.record(url);
        let result = self
            .texts
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("404 Not Found: {url}"));
        async move { result }
    }
}

pub fn test_endpoints() -> Endpoints {
    Endpoints {
        name_lookup: LOOKUP_HOST.to_string(),
        skin_host: SKIN_HOST.to_string(),
        mineskin_host: MINESKIN_HOST.to_string(),
    }
}

/// A fully opaque skin of the given height, with transparent slim arm columns
/// when `slim` is set.
pub fn skin_image(height: u32, slim: bool) -> RgbaImage {
    let mut image = RgbaImage::from_pixel(64, height, Rgba([120, 80, 40, 255]));
    if slim {
        for (x, y0) in [(46, 52), (54, 20)] {
            for y in y0..(y0 + 12).min(height) {
                image.put_pixel(x, y, Rgba([0, 0, 0, 0]));
            }
        }
    }
    image
}

pub fn cape_image() -> RgbaImage {
    RgbaImage::from_pixel(64, 32, Rgba([200, 0, 0, 255]))
}

pub fn atlas(height: u32, slim: bool) -> Arc<TextureAtlas> {
    Arc::new(TextureAtlas::new(skin_image(height, slim)))
}

pub fn png_bytes(image: &RgbaImage) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("Failed to encode test image");
    bytes.into_inner()
}

pub fn data_url(image: &RgbaImage) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png_bytes(image))
    )
}

/// Depth first search below `node`, `node` included.
pub fn find<'a>(node: &'a dyn SceneNode, name: &str) -> Option<&'a dyn SceneNode> {
    if node.name() == name {
        return Some(node);
    }
    node.get_children()
        .iter()
        .find_map(|child| find(child.as_ref(), name))
}

pub fn child_names(node: &dyn SceneNode) -> Vec<String> {
    node.get_children()
        .iter()
        .map(|child| child.name().to_string())
        .collect()
}

/// Extent of a mesh node's geometry along x, y and z.
pub fn mesh_extent(node: &dyn SceneNode) -> [f32; 3] {
    let mesh = node.as_mesh().expect("Not a mesh node");
    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];
    for vertex in &mesh.geometry().vertices {
        for axis in 0..3 {
            min[axis] = min[axis].min(vertex.position[axis]);
            max[axis] = max[axis].max(vertex.position[axis]);
        }
    }
    [max[0] - min[0], max[1] - min[1], max[2] - min[2]]
}

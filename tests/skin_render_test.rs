use std::cell::Cell;

use futures::executor::block_on;
use skin_ngin::{
    config::RenderOptions,
    data_structures::scene_graph::SceneNode,
    error::SkinError,
    renderer::{FrameOutcome, LifecycleState},
    skin::{
        SKIN_RENDER_TYPE, SkinRender,
        loader::{CapeSource, SkinSource, TextureDescriptor},
        model::PLAYER_MODEL_NAME,
    },
};

use crate::common::test_utils::{
    MapFetcher, RecordingBackend, cape_image, png_bytes, skin_image, test_endpoints,
};

mod common;

const SKIN_URL: &str = "https://textures.test/skin.png";
const OTHER_URL: &str = "https://textures.test/other.png";
const CAPE_URL: &str = "https://textures.test/cape.png";

fn options() -> RenderOptions {
    RenderOptions {
        endpoints: test_endpoints(),
        ..RenderOptions::skin_defaults()
    }
}

fn fetcher() -> MapFetcher {
    MapFetcher::new()
        .with_bytes(SKIN_URL, png_bytes(&skin_image(64, false)))
        .with_bytes(OTHER_URL, png_bytes(&skin_image(64, true)))
        .with_bytes(CAPE_URL, png_bytes(&cape_image()))
}

fn viewer() -> SkinRender<RecordingBackend, MapFetcher> {
    let mut viewer = SkinRender::new(options(), fetcher());
    let (backend, _log) = RecordingBackend::new();
    viewer.provide_backend(backend, (640, 480), None).unwrap();
    viewer
}

fn url(url: &str) -> TextureDescriptor {
    TextureDescriptor::parse(url).unwrap()
}

#[test]
fn rendering_builds_the_scene_on_first_load() {
    let mut viewer = viewer();
    assert_eq!(viewer.renderer().state(), LifecycleState::Uninitialized);
    assert!(viewer.has_pending_backend());

    let ready = Cell::new(false);
    let applied = block_on(viewer.render(url(SKIN_URL), |viewer| {
        ready.set(viewer.get_player_model().is_some());
    }))
    .unwrap();

    assert!(applied);
    assert!(ready.get());
    assert_eq!(viewer.renderer().state(), LifecycleState::Running);
    assert!(!viewer.has_pending_backend());
    assert_eq!(
        viewer.get_player_model().unwrap().render_type(),
        Some(SKIN_RENDER_TYPE)
    );
    assert_eq!(viewer.is_slim(), Some(false));
}

#[test]
fn backends_arriving_after_the_skin_start_the_scene() {
    let mut viewer = SkinRender::new(options(), fetcher());
    let loaded = block_on(viewer.load(url(SKIN_URL))).unwrap();
    assert!(viewer.apply(loaded).unwrap());
    assert_eq!(viewer.renderer().state(), LifecycleState::Uninitialized);

    let (backend, log) = RecordingBackend::new();
    viewer.provide_backend(backend, (320, 240), None).unwrap();
    assert_eq!(viewer.renderer().state(), LifecycleState::Running);
    assert_eq!(log.borrow().size, (320, 240));
}

#[test]
fn renders_replace_the_player() {
    let mut viewer = viewer();
    block_on(viewer.render(url(SKIN_URL), |_| ())).unwrap();
    block_on(viewer.render(url(OTHER_URL), |_| ())).unwrap();

    let players = viewer
        .renderer()
        .scene()
        .children()
        .iter()
        .filter(|node| node.name() == PLAYER_MODEL_NAME)
        .count();
    assert_eq!(players, 1);
    assert_eq!(viewer.is_slim(), Some(true));
}

#[test]
fn superseded_loads_are_discarded() {
    let mut viewer = viewer();
    let first = viewer.load(url(SKIN_URL));
    let second = viewer.load(url(OTHER_URL));

    let first = block_on(first).unwrap();
    let second = block_on(second).unwrap();
    assert!(!viewer.apply(first).unwrap());
    assert!(viewer.get_player_model().is_none());
    assert!(viewer.apply(second).unwrap());
    assert_eq!(viewer.is_slim(), Some(true));
}

#[test]
fn resetting_discards_loads_in_flight() {
    let mut viewer = viewer();
    block_on(viewer.render(url(SKIN_URL), |_| ())).unwrap();

    let pending = viewer.load(url(OTHER_URL));
    viewer.reset();
    assert!(viewer.get_player_model().is_none());
    assert!(!viewer.renderer().is_animating());
    assert_eq!(viewer.frame(0.016, |_| ()).unwrap(), FrameOutcome::Inactive);

    let stale = block_on(pending).unwrap();
    assert!(!viewer.apply(stale).unwrap());
    assert!(viewer.get_player_model().is_none());
}

#[test]
fn a_failing_skin_never_becomes_ready() {
    let mut viewer = viewer();
    let ready = Cell::new(false);
    let result = block_on(viewer.render(url("https://textures.test/missing.png"), |_| {
        ready.set(true)
    }));

    assert!(matches!(result, Err(SkinError::SkinLoad { .. })));
    assert!(!ready.get());
    assert_eq!(viewer.renderer().state(), LifecycleState::Uninitialized);
}

#[test]
fn a_failing_cape_still_becomes_ready() {
    let mut viewer = viewer();
    let descriptor = TextureDescriptor {
        cape: Some(CapeSource::Url("https://textures.test/no-cape.png".to_string())),
        ..TextureDescriptor::new(SkinSource::Url(SKIN_URL.to_string()))
    };
    let ready = Cell::new(false);
    block_on(viewer.render(descriptor, |_| ready.set(true))).unwrap();

    assert!(ready.get());
    assert!(viewer.get_model_by_name("capeGroup").is_none());
}

#[test]
fn capes_are_added_to_the_player() {
    let mut viewer = viewer();
    let descriptor = TextureDescriptor {
        cape: Some(CapeSource::Url(CAPE_URL.to_string())),
        ..TextureDescriptor::new(SkinSource::Url(SKIN_URL.to_string()))
    };
    block_on(viewer.render(descriptor, |_| ())).unwrap();
    assert!(viewer.get_model_by_name("cape").is_some());
}

#[test]
fn skin_parts_can_be_toggled() {
    let mut viewer = viewer();
    block_on(viewer.render(url(SKIN_URL), |_| ())).unwrap();

    assert!(viewer.toggle_skin_part("hat", false));
    assert!(!viewer.get_model_by_name("hat").unwrap().is_visible());
    assert!(viewer.toggle_skin_part("hat", true));
    assert!(viewer.get_model_by_name("hat").unwrap().is_visible());
    assert!(!viewer.toggle_skin_part("tail", false));
}

#[test]
fn frames_hand_the_player_to_the_callback() {
    let mut viewer = viewer();
    block_on(viewer.render(url(SKIN_URL), |_| ())).unwrap();

    let mut seen = None;
    let outcome = viewer
        .frame(0.016, |player| {
            let player = player.expect("player should exist");
            player
                .get_local_transform_mut()
                .rotate_y(skin_ngin::cgmath::Deg(10.0));
            seen = Some(player.name().to_string());
        })
        .unwrap();

    assert_eq!(outcome, FrameOutcome::Rendered);
    assert_eq!(seen.as_deref(), Some(PLAYER_MODEL_NAME));
}

#[test]
fn snapshots_are_data_urls() {
    let mut viewer = viewer();
    assert!(matches!(
        block_on(viewer.to_image(false, None)),
        Err(SkinError::NotInitialized)
    ));
    block_on(viewer.render(url(SKIN_URL), |_| ())).unwrap();
    let image = block_on(viewer.to_image(false, None)).unwrap();
    assert!(image.starts_with("data:image/png;base64,"));
}

#[test]
fn disposing_is_idempotent() {
    let mut viewer = viewer();
    block_on(viewer.render(url(SKIN_URL), |_| ())).unwrap();

    viewer.dispose();
    viewer.dispose();
    assert_eq!(viewer.renderer().state(), LifecycleState::Disposed);
    assert!(viewer.renderer().scene().is_empty());
    assert!(viewer.renderer().backend().is_none());

    let loaded = block_on(viewer.load(url(SKIN_URL))).unwrap();
    assert!(matches!(viewer.apply(loaded), Err(SkinError::Disposed)));
}

#[test]
fn disposing_tears_the_canvas_down_once() {
    let mut viewer = viewer();
    block_on(viewer.render(url(SKIN_URL), |_| ())).unwrap();
    let teardowns = std::rc::Rc::new(Cell::new(0));
    let counter = teardowns.clone();
    viewer
        .renderer_mut()
        .on_dispose(move || counter.set(counter.get() + 1));

    viewer.dispose();
    viewer.dispose();
    assert_eq!(teardowns.get(), 1);
}

#[test]
fn attached_viewers_leave_the_host_canvas_alone() {
    let (backend, _log) = RecordingBackend::new();
    let mut renderer = skin_ngin::renderer::Renderer::new(options(), "host");
    renderer.init_scene(backend, (640, 480), None).unwrap();
    let teardowns = std::rc::Rc::new(Cell::new(0));
    let counter = teardowns.clone();
    renderer.on_dispose(move || counter.set(counter.get() + 1));

    let mut viewer = SkinRender::attached(renderer, fetcher());
    block_on(viewer.render(url(SKIN_URL), |_| ())).unwrap();
    viewer.dispose();
    assert_eq!(teardowns.get(), 0);

    let mut renderer = viewer.into_renderer();
    renderer.dispose();
    assert_eq!(teardowns.get(), 1);
}

#[test]
fn attached_viewers_only_remove_their_own_nodes() {
    let (backend, _log) = RecordingBackend::new();
    let mut renderer = skin_ngin::renderer::Renderer::new(options(), "host");
    renderer.init_scene(backend, (640, 480), None).unwrap();

    let mut viewer = SkinRender::attached(renderer, fetcher());
    block_on(viewer.render(url(SKIN_URL), |_| ())).unwrap();
    assert!(viewer.renderer().is_animating());

    viewer.dispose();
    assert!(viewer.get_player_model().is_none());
    assert_eq!(viewer.renderer().state(), LifecycleState::Running);
    let mut renderer = viewer.into_renderer();
    assert!(renderer.scene().get_object_by_name("ambientLight").is_some());
    assert!(renderer.is_animating());
    assert_eq!(renderer.frame(0.016, |_| ()).unwrap(), FrameOutcome::Rendered);
}

#[test]
fn resetting_an_attached_viewer_keeps_the_host_animating() {
    let (backend, log) = RecordingBackend::new();
    let mut renderer = skin_ngin::renderer::Renderer::new(options(), "host");
    renderer.init_scene(backend, (640, 480), None).unwrap();

    let mut viewer = SkinRender::attached(renderer, fetcher());
    block_on(viewer.render(url(SKIN_URL), |_| ())).unwrap();

    viewer.reset();
    assert!(viewer.get_player_model().is_none());
    assert!(viewer.renderer().is_animating());
    let renders = log.borrow().renders;
    assert_eq!(
        viewer.renderer_mut().frame(0.016, |_| ()).unwrap(),
        FrameOutcome::Rendered
    );
    assert_eq!(log.borrow().renders, renders + 1);
}

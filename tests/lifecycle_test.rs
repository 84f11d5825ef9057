use std::{cell::Cell, rc::Rc};

use approx::assert_relative_eq;
use futures::executor::block_on;
use image::{Rgba, RgbaImage};
use skin_ngin::{
    config::{CameraKind, RenderOptions},
    data_structures::scene_graph::{AmbientLightNode, GroupNode, SceneNode},
    error::SkinError,
    renderer::{FrameOutcome, LifecycleState, Renderer},
    visibility::{self, Visibility},
};

use crate::common::test_utils::{BackendLog, RecordingBackend};

mod common;

const FRAME: f64 = 1.0 / 60.0;

fn running(options: RenderOptions) -> (Renderer<RecordingBackend>, Rc<std::cell::RefCell<BackendLog>>) {
    let (backend, log) = RecordingBackend::new();
    let mut renderer = Renderer::new(options, "test");
    renderer.init_scene(backend, (800, 600), None).unwrap();
    (renderer, log)
}

#[test]
fn init_builds_the_scene() {
    let (renderer, log) = running(RenderOptions::default());

    assert_eq!(renderer.state(), LifecycleState::Running);
    assert!(renderer.is_animating());
    assert_eq!(log.borrow().size, (800, 600));
    assert!(renderer.scene().get_object_by_name("ambientLight").is_some());
    assert!(renderer.scene().get_object_by_name("axesHelper").is_none());
    assert!(renderer.controls().is_some());
    assert!(renderer
        .canvas_id()
        .unwrap()
        .starts_with(&format!("skin-ngin-canvas-{}-", renderer.scene().id())));
}

#[test]
fn configured_canvas_sizes_win_over_the_viewport() {
    let options = RenderOptions::from_json(
        r#"{"canvas": {"width": 300}, "showAxes": true, "showGrid": true, "controls": {"enabled": false}}"#,
    )
    .unwrap();
    let (renderer, log) = running(options);

    assert_eq!(log.borrow().size, (300, 600));
    assert_relative_eq!(renderer.projection().unwrap().aspect(), 0.5);
    assert!(renderer.scene().get_object_by_name("axesHelper").is_some());
    assert!(renderer.scene().get_object_by_name("gridHelper").is_some());
    assert!(renderer.controls().is_none());
}

#[test]
fn init_twice_is_a_no_op() {
    let (mut renderer, log) = running(RenderOptions::default());
    let (other, other_log) = RecordingBackend::new();
    renderer.init_scene(other, (10, 10), None).unwrap();

    assert_eq!(log.borrow().size, (800, 600));
    assert!(other_log.borrow().resizes.is_empty());
    assert_eq!(renderer.scene().len(), 1);
}

#[test]
fn frames_render_the_scene() {
    let (mut renderer, log) = running(RenderOptions::default());
    let calls = Cell::new(0);

    let outcome = renderer.frame(FRAME, |_| calls.set(calls.get() + 1)).unwrap();
    assert_eq!(outcome, FrameOutcome::Rendered);
    assert_eq!(calls.get(), 1);
    assert_eq!(log.borrow().renders, 1);
}

#[test]
fn frames_before_init_do_nothing() {
    let mut renderer: Renderer<RecordingBackend> = Renderer::new(RenderOptions::default(), "test");
    assert_eq!(renderer.frame(FRAME, |_| ()).unwrap(), FrameOutcome::Inactive);
    assert!(matches!(
        block_on(renderer.to_image(false, None)),
        Err(SkinError::NotInitialized)
    ));
}

#[test]
fn frame_rate_limits_skip_frames() {
    let options = RenderOptions {
        frame_rate_limit: 10.0,
        ..RenderOptions::default()
    };
    let (mut renderer, log) = running(options);

    let frames = 600;
    let mut rendered = 0;
    for _ in 0..frames {
        if renderer.frame(FRAME, |_| ()).unwrap() == FrameOutcome::Rendered {
            rendered += 1;
        }
    }
    let expected = (frames as f64 * FRAME / 0.1).floor() as i64;
    assert!((rendered - expected).abs() <= 1, "rendered {rendered}, expected {expected}");
    assert_eq!(log.borrow().renders as i64, rendered);
}

#[test]
fn hidden_surfaces_pause() {
    let (sender, source) = visibility::channel();
    let (backend, log) = RecordingBackend::new();
    let mut renderer = Renderer::new(RenderOptions::default(), "test");
    renderer
        .init_scene(backend, (800, 600), Some(Box::new(source)))
        .unwrap();

    assert_eq!(renderer.frame(FRAME, |_| ()).unwrap(), FrameOutcome::Rendered);
    sender.send(Visibility::Hidden);
    assert_eq!(renderer.frame(FRAME, |_| ()).unwrap(), FrameOutcome::Paused);
    assert_eq!(renderer.state(), LifecycleState::Paused);
    assert_eq!(renderer.frame(FRAME, |_| ()).unwrap(), FrameOutcome::Paused);

    sender.send(Visibility::Visible);
    assert_eq!(renderer.frame(FRAME, |_| ()).unwrap(), FrameOutcome::Rendered);
    assert_eq!(renderer.state(), LifecycleState::Running);
    assert_eq!(log.borrow().renders, 2);
    assert_eq!(log.borrow().releases, 0);
}

#[test]
fn hidden_surfaces_keep_rendering_without_pause_hidden() {
    let options = RenderOptions {
        pause_hidden: false,
        ..RenderOptions::default()
    };
    let (mut renderer, _log) = running(options);
    renderer.set_visibility(Visibility::Hidden);
    assert_eq!(renderer.frame(FRAME, |_| ()).unwrap(), FrameOutcome::Rendered);
}

#[test]
fn visibility_is_ignored_without_pause_hidden() {
    let (sender, source) = visibility::channel();
    let (backend, log) = RecordingBackend::new();
    let options = RenderOptions {
        pause_hidden: false,
        force_context: true,
        ..RenderOptions::default()
    };
    let mut renderer = Renderer::new(options, "test");
    renderer
        .init_scene(backend, (800, 600), Some(Box::new(source)))
        .unwrap();

    assert!(!sender.send(Visibility::Hidden));
    renderer.set_visibility(Visibility::Hidden);
    assert!(renderer.is_on_screen());
    assert_eq!(renderer.frame(FRAME, |_| ()).unwrap(), FrameOutcome::Rendered);
    assert_eq!(log.borrow().releases, 0);
    assert_eq!(log.borrow().renders, 1);
}

#[test]
fn forced_contexts_are_released_while_hidden() {
    let options = RenderOptions {
        force_context: true,
        ..RenderOptions::default()
    };
    let (mut renderer, log) = running(options);

    renderer.set_visibility(Visibility::Hidden);
    renderer.set_visibility(Visibility::Hidden);
    assert_eq!(log.borrow().releases, 1);
    assert!(!renderer.is_on_screen());

    renderer.set_visibility(Visibility::Visible);
    assert_eq!(log.borrow().restores, 1);
    assert!(renderer.is_on_screen());
}

#[test]
fn resizing_keeps_the_aspect_ratio() {
    let (mut renderer, log) = running(RenderOptions::default());
    renderer.resize(1000, 500);

    assert_eq!(log.borrow().size, (1000, 500));
    assert_relative_eq!(renderer.projection().unwrap().aspect(), 2.0);
}

#[test]
fn orthographic_bounds_follow_the_size() {
    let mut options = RenderOptions::default();
    options.camera.kind = CameraKind::Orthographic;
    let (mut renderer, _log) = running(options);
    renderer.resize(400, 200);

    let (left, right, top, bottom) = renderer.projection().unwrap().bounds();
    assert_relative_eq!(left, -200.0);
    assert_relative_eq!(right, 200.0);
    assert_relative_eq!(top, 100.0);
    assert_relative_eq!(bottom, -100.0);
}

#[test]
fn added_nodes_carry_the_render_type() {
    let (mut renderer, _log) = running(RenderOptions::default());
    renderer.add_to_scene(Box::new(GroupNode::new("mine"))).unwrap();
    renderer.scene_mut().add(Box::new(GroupNode::new("foreign")));

    let mine = renderer.scene().get_object_by_name("mine").unwrap();
    assert_eq!(mine.render_type(), Some("test"));

    assert_eq!(renderer.clear_scene(true, None), 1);
    assert!(renderer.scene().get_object_by_name("foreign").is_some());
    assert!(renderer.scene().get_object_by_name("ambientLight").is_some());
}

#[test]
fn clearing_everything_restores_the_light() {
    let (mut renderer, _log) = running(RenderOptions::default());
    renderer.add_to_scene(Box::new(GroupNode::new("a"))).unwrap();
    renderer.add_to_scene(Box::new(GroupNode::new("b"))).unwrap();

    assert_eq!(renderer.clear_scene(false, None), 3);
    assert_eq!(renderer.scene().len(), 1);
    let light = renderer.scene().get_object_by_name("ambientLight").unwrap();
    assert!(light.ambient_color().is_some());
    assert_eq!(renderer.scene().ambient_light(), AmbientLightNode::default().ambient_color().unwrap());
}

#[test]
fn clearing_with_a_filter_spares_matches() {
    let (mut renderer, _log) = running(RenderOptions::default());
    renderer.add_to_scene(Box::new(GroupNode::new("keep"))).unwrap();
    renderer.add_to_scene(Box::new(GroupNode::new("drop"))).unwrap();

    let keep: &dyn Fn(&dyn SceneNode) -> bool = &|node| node.name() == "keep";
    assert_eq!(renderer.clear_scene(false, Some(keep)), 2);
    assert!(renderer.scene().get_object_by_name("keep").is_some());
}

#[test]
fn images_are_png_data_urls() {
    let mut pixels = RgbaImage::new(8, 8);
    pixels.put_pixel(2, 3, Rgba([255, 0, 0, 255]));
    pixels.put_pixel(4, 5, Rgba([0, 255, 0, 255]));
    let (backend, _log) = RecordingBackend::with_pixels(pixels);
    let mut renderer = Renderer::new(RenderOptions::default(), "test");
    renderer.init_scene(backend, (8, 8), None).unwrap();

    let url = block_on(renderer.to_image(true, None)).unwrap();
    assert!(url.starts_with("data:image/png;base64,"));
    let jpeg = block_on(renderer.to_image(false, Some("image/jpeg"))).unwrap();
    assert!(jpeg.starts_with("data:image/jpeg;base64,"));
}

#[test]
fn disposing_tears_everything_down() {
    let (mut renderer, log) = running(RenderOptions::default());
    renderer.add_to_scene(Box::new(GroupNode::new("player"))).unwrap();
    let hooks = Rc::new(Cell::new(0));
    let counter = hooks.clone();
    renderer.on_dispose(move || counter.set(counter.get() + 1));

    renderer.dispose();
    assert_eq!(renderer.state(), LifecycleState::Disposed);
    assert!(renderer.scene().is_empty());
    assert!(renderer.backend().is_none());
    assert!(!renderer.is_animating());
    assert!(log.borrow().disposed);
    assert_eq!(hooks.get(), 1);

    renderer.dispose();
    assert_eq!(hooks.get(), 1);
    assert_eq!(renderer.frame(FRAME, |_| ()).unwrap(), FrameOutcome::Inactive);
    assert!(matches!(
        renderer.add_to_scene(Box::new(GroupNode::new("late"))),
        Err(SkinError::Disposed)
    ));
    let (backend, _) = RecordingBackend::new();
    assert!(matches!(
        renderer.init_scene(backend, (1, 1), None),
        Err(SkinError::Disposed)
    ));
}

#[test]
fn disposing_before_init_is_fine() {
    let mut renderer: Renderer<RecordingBackend> = Renderer::new(RenderOptions::default(), "test");
    renderer.dispose();
    renderer.dispose();
    assert_eq!(renderer.state(), LifecycleState::Disposed);
}

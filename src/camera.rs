//! Camera, projection and orbit controls.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};
use winit::{
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::config::{CameraKind, CameraOptions, ControlsOptions};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

pub const PERSPECTIVE_FOVY: cgmath::Deg<f32> = cgmath::Deg(75.0);
pub const PERSPECTIVE_NEAR: f32 = 5.0;
pub const ORTHOGRAPHIC_NEAR: f32 = 1.0;
pub const FAR: f32 = 1000.0;

/// A camera looking at a fixed target.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new(position: Point3<f32>, target: Point3<f32>) -> Self {
        Self {
            position,
            target,
            up: Vector3::unit_y(),
        }
    }

    pub fn from_options(options: &CameraOptions) -> Self {
        Self::new(
            Point3::new(options.x, options.y, options.z),
            Point3::from(options.target),
        )
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }
}

/// Perspective or orthographic projection of a `width` x `height` surface.
#[derive(Clone, Debug, PartialEq)]
pub struct Projection {
    kind: CameraKind,
    width: f32,
    height: f32,
    zoom: f32,
}

impl Projection {
    pub fn new(kind: CameraKind, width: u32, height: u32, zoom: Option<f32>) -> Self {
        Self {
            kind,
            width: width.max(1) as f32,
            height: height.max(1) as f32,
            zoom: zoom.filter(|zoom| *zoom > 0.0).unwrap_or(1.0),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1) as f32;
        self.height = height.max(1) as f32;
    }

    pub fn kind(&self) -> CameraKind {
        self.kind
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }

    /// Left, right, top and bottom planes of the orthographic frustum.
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        let (half_w, half_h) = (self.width / 2.0, self.height / 2.0);
        (
            -half_w / self.zoom,
            half_w / self.zoom,
            half_h / self.zoom,
            -half_h / self.zoom,
        )
    }

    /// Vertical field of view after zooming.
    pub fn fovy(&self) -> Rad<f32> {
        let half: Rad<f32> = (PERSPECTIVE_FOVY / 2.0).into();
        Rad(2.0 * (half.0.tan() / self.zoom).atan())
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        let projection = match self.kind {
            CameraKind::Perspective => perspective(self.fovy(), self.aspect(), PERSPECTIVE_NEAR, FAR),
            CameraKind::Orthographic => {
                let (left, right, top, bottom) = self.bounds();
                cgmath::ortho(left, right, bottom, top, ORTHOGRAPHIC_NEAR, FAR)
            }
        };
        OPENGL_TO_WGPU_MATRIX * projection
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_position: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

const ROTATE_SPEED: f32 = 1.0;
const ZOOM_STEP: f32 = 0.95;
const KEY_PAN_PIXELS: f32 = 7.0;
const MIN_DISTANCE: f32 = 1.0;
const POLAR_EPSILON: f32 = 0.000_001;

/// Orbits the camera around its target.
///
/// Left drag rotates, right drag pans, the wheel zooms and the arrow keys pan.
/// Every gesture can be switched off through [`ControlsOptions`].
#[derive(Debug)]
pub struct OrbitControls {
    options: ControlsOptions,
    viewport: (f32, f32),
    rotating: bool,
    panning: bool,
    cursor: Option<(f64, f64)>,
    rotate_delta: (f32, f32),
    pan_delta: (f32, f32),
    zoom_scale: f32,
}

impl OrbitControls {
    pub fn new(options: ControlsOptions, width: u32, height: u32) -> Self {
        Self {
            options,
            viewport: (width.max(1) as f32, height.max(1) as f32),
            rotating: false,
            panning: false,
            cursor: None,
            rotate_delta: (0.0, 0.0),
            pan_delta: (0.0, 0.0),
            zoom_scale: 1.0,
        }
    }

    pub fn options(&self) -> &ControlsOptions {
        &self.options
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = (width.max(1) as f32, height.max(1) as f32);
    }

    /// Records input, returns whether the event was consumed.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        if !self.options.enabled {
            return false;
        }
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = *state == ElementState::Pressed;
                match button {
                    MouseButton::Left if self.options.rotate => self.rotating = pressed,
                    MouseButton::Right if self.options.pan => self.panning = pressed,
                    _ => return false,
                }
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                let previous = self.cursor.replace((position.x, position.y));
                let Some((x, y)) = previous else {
                    return false;
                };
                let (dx, dy) = ((position.x - x) as f32, (position.y - y) as f32);
                if self.rotating {
                    self.rotate(dx, dy);
                } else if self.panning {
                    self.pan(dx, dy);
                } else {
                    return false;
                }
                true
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } if self.options.zoom => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32 / 100.0,
                };
                self.zoom(steps);
                true
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } if self.options.keys && self.options.pan => {
                match key {
                    KeyCode::ArrowUp => self.pan(0.0, KEY_PAN_PIXELS),
                    KeyCode::ArrowDown => self.pan(0.0, -KEY_PAN_PIXELS),
                    KeyCode::ArrowLeft => self.pan(KEY_PAN_PIXELS, 0.0),
                    KeyCode::ArrowRight => self.pan(-KEY_PAN_PIXELS, 0.0),
                    _ => return false,
                }
                true
            }
            _ => false,
        }
    }

    /// Rotates by a drag of `dx`, `dy` pixels.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        if !self.options.rotate {
            return;
        }
        let height = self.viewport.1;
        self.rotate_delta.0 -= 2.0 * PI * dx / height * ROTATE_SPEED;
        self.rotate_delta.1 -= 2.0 * PI * dy / height * ROTATE_SPEED;
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        if !self.options.pan {
            return;
        }
        self.pan_delta.0 += dx;
        self.pan_delta.1 += dy;
    }

    /// Positive steps move the camera closer.
    pub fn zoom(&mut self, steps: f32) {
        if !self.options.zoom {
            return;
        }
        self.zoom_scale *= ZOOM_STEP.powf(steps);
    }

    /// Applies the recorded input to `camera`.
    pub fn update(&mut self, camera: &mut Camera, projection: &Projection) {
        let rotate = std::mem::take(&mut self.rotate_delta);
        let pan = std::mem::take(&mut self.pan_delta);
        let zoom = std::mem::replace(&mut self.zoom_scale, 1.0);
        if !self.options.enabled {
            return;
        }

        let offset = camera.position - camera.target;
        let radius = offset.magnitude();
        if radius <= f32::EPSILON {
            return;
        }

        if pan != (0.0, 0.0) {
            let forward = -offset.normalize();
            let right = forward.cross(camera.up).normalize();
            let up = right.cross(forward);
            let units_per_pixel = match projection.kind() {
                CameraKind::Perspective => {
                    2.0 * radius * (projection.fovy().0 / 2.0).tan() / self.viewport.1
                }
                CameraKind::Orthographic => {
                    let (left, right_plane, _, _) = projection.bounds();
                    (right_plane - left) / self.viewport.0
                }
            };
            let shift = right * (-pan.0 * units_per_pixel) + up * (pan.1 * units_per_pixel);
            camera.target += shift;
            camera.position += shift;
        }

        let mut theta = offset.x.atan2(offset.z) + rotate.0;
        let phi = ((offset.y / radius).clamp(-1.0, 1.0).acos() + rotate.1)
            .clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        if !theta.is_finite() {
            theta = 0.0;
        }
        let radius = (radius * zoom).max(MIN_DISTANCE);
        let offset = Vector3::new(
            radius * phi.sin() * theta.sin(),
            radius * phi.cos(),
            radius * phi.sin() * theta.cos(),
        );
        camera.position = camera.target + offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn perspective_aspect_follows_resize() {
        let mut projection = Projection::new(CameraKind::Perspective, 300, 300, None);
        assert_relative_eq!(projection.aspect(), 1.0);
        projection.resize(800, 400);
        assert_relative_eq!(projection.aspect(), 2.0);
    }

    #[test]
    fn orthographic_bounds_are_centered() {
        let projection = Projection::new(CameraKind::Orthographic, 400, 200, None);
        assert_eq!(projection.bounds(), (-200.0, 200.0, 100.0, -100.0));
    }

    #[test]
    fn zoom_moves_the_camera_closer() {
        let mut camera = Camera::new(Point3::new(0.0, 0.0, 20.0), Point3::new(0.0, 0.0, 0.0));
        let projection = Projection::new(CameraKind::Perspective, 100, 100, None);
        let mut controls = OrbitControls::new(ControlsOptions::default(), 100, 100);
        controls.zoom(1.0);
        controls.update(&mut camera, &projection);
        assert_relative_eq!((camera.position - camera.target).magnitude(), 19.0, epsilon = 1e-4);
    }

    #[test]
    fn disabled_controls_ignore_input() {
        let mut camera = Camera::new(Point3::new(0.0, 0.0, 20.0), Point3::new(0.0, 0.0, 0.0));
        let before = camera.clone();
        let projection = Projection::new(CameraKind::Perspective, 100, 100, None);
        let options = ControlsOptions {
            enabled: false,
            ..ControlsOptions::default()
        };
        let mut controls = OrbitControls::new(options, 100, 100);
        controls.zoom(3.0);
        controls.rotate(10.0, 0.0);
        controls.update(&mut camera, &projection);
        assert_eq!(camera, before);
    }
}

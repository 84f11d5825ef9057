//! Render options.
//!
//! Options are plain data deserialized from JS style option objects
//! (`{"camera": {"x": 20}, "pauseHidden": false}`). Every field has a default so
//! callers only pass what they want to change. Options are immutable once a
//! renderer has been created from them.

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    pub show_axes: bool,
    pub show_grid: bool,
    pub auto_resize: bool,
    pub controls: ControlsOptions,
    pub camera: CameraOptions,
    pub canvas: CanvasOptions,
    pub render: PostProcessingOptions,
    /// Frames per second, anything `<= 0` renders on every animation frame.
    pub frame_rate_limit: f64,
    pub enable_stats: bool,
    pub pause_hidden: bool,
    pub force_context: bool,
    pub endpoints: Endpoints,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_axes: false,
            show_grid: false,
            auto_resize: false,
            controls: ControlsOptions::default(),
            camera: CameraOptions::default(),
            canvas: CanvasOptions::default(),
            render: PostProcessingOptions::default(),
            frame_rate_limit: -1.0,
            enable_stats: false,
            pause_hidden: true,
            force_context: false,
            endpoints: Endpoints::default(),
        }
    }
}

impl RenderOptions {
    /// Base defaults with the skin renderer's own layer on top.
    pub fn skin_defaults() -> Self {
        Self {
            camera: CameraOptions {
                target: [0.0, 18.0, 0.0],
                ..CameraOptions::default()
            },
            ..Self::default()
        }
    }

    /// Parses a JS style option object.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Merges a partial option object onto `base`.
    ///
    /// Nested objects are merged key by key so `{"camera": {"x": 5}}` keeps the
    /// other camera fields of `base`.
    pub fn layered(base: &RenderOptions, json: &str) -> Result<Self> {
        let mut merged = serde_json::to_value(base)?;
        let overlay: serde_json::Value = serde_json::from_str(json)?;
        merge_json(&mut merged, overlay);
        Ok(serde_json::from_value(merged)?)
    }

    /// The minimum time between two rendered frames in seconds.
    pub fn frame_interval(&self) -> Option<f64> {
        (self.frame_rate_limit > 0.0).then(|| 1.0 / self.frame_rate_limit)
    }

    /// Configured canvas size, falling back to the viewport per axis.
    pub fn canvas_size(&self, viewport: (u32, u32)) -> (u32, u32) {
        (
            self.canvas.width.unwrap_or(viewport.0),
            self.canvas.height.unwrap_or(viewport.1),
        )
    }
}

fn merge_json(base: &mut serde_json::Value, overlay: serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base), serde_json::Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlsOptions {
    pub enabled: bool,
    pub zoom: bool,
    pub rotate: bool,
    pub pan: bool,
    pub keys: bool,
}

impl Default for ControlsOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            zoom: true,
            rotate: true,
            pan: true,
            keys: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraKind {
    #[default]
    Perspective,
    Orthographic,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CameraOptions {
    #[serde(rename = "type")]
    pub kind: CameraKind,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub zoom: Option<f32>,
    pub target: [f32; 3],
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            kind: CameraKind::Perspective,
            x: 20.0,
            y: 35.0,
            z: 20.0,
            zoom: None,
            target: [0.0, 0.0, 0.0],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CanvasOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostProcessingOptions {
    /// Render through an anti-aliased offscreen pass followed by a copy pass.
    pub postprocessing: bool,
}

/// Remote services used to resolve texture descriptors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Endpoints {
    /// Prefix the url encoded player name is appended to.
    pub name_lookup: String,
    /// Prefix a player identifier is appended to.
    pub skin_host: String,
    pub mineskin_host: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            name_lookup: "https://skinrender.ga/nameToUuid.php?name=".to_string(),
            skin_host: "https://crafatar.com/skins/".to_string(),
            mineskin_host: "https://api.mineskin.org/render/texture/".to_string(),
        }
    }
}

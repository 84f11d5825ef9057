//! Render pipelines.
//!
//! - `basic` opaque skin parts and the shared pipeline builder
//! - `transparent` alpha blended, double sided overlay layers
//! - `line` axes and grid helpers
//! - `light` ambient light uniform
//! - `postprocess` multisampled scene pass and copy-to-screen pass

pub mod basic;
pub mod light;
pub mod line;
pub mod postprocess;
pub mod transparent;

//! Raw document shapes as they appear on disk.
//!
//! Everything here is deliberately lenient: fields the format guide calls
//! required are still `Option`s, and vectors are untyped `Vec<f32>`, so that
//! a single sloppy bone does not fail the whole document at the serde layer.
//! Validation with real error values happens in [`crate::normalize`].

use serde::Deserialize;
use serde_json::{Map, Value};

/// Top-level model document. `format_version` is accepted and ignored.
///
/// The `minecraft:geometry` array is the modern shape; legacy documents keep
/// one `geometry.<name>` object per geometry at the top level, which lands in
/// `rest` (in document order, since `serde_json/preserve_order` is enabled).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawModelDocument {
    #[serde(default)]
    pub format_version: Option<String>,
    #[serde(rename = "minecraft:geometry", default)]
    pub geometry: Option<Vec<RawGeometryEntry>>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGeometryEntry {
    #[serde(default)]
    pub description: Option<RawDescription>,
    #[serde(default)]
    pub bones: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDescription {
    #[serde(default)]
    pub identifier: Option<String>,
    // Floats so that files authored as `64.0` still parse.
    #[serde(default)]
    pub texture_width: Option<f32>,
    #[serde(default)]
    pub texture_height: Option<f32>,
    #[serde(default)]
    pub visible_bounds_width: Option<f32>,
    #[serde(default)]
    pub visible_bounds_height: Option<f32>,
    #[serde(default)]
    pub visible_bounds_offset: Option<Vec<f32>>,
}

/// Body of a legacy `geometry.<name>` key. Texture sizes use the old
/// unseparated spellings and default to 64 when absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLegacyGeometry {
    #[serde(default)]
    pub texturewidth: Option<f32>,
    #[serde(default)]
    pub textureheight: Option<f32>,
    #[serde(default)]
    pub visible_bounds_width: Option<f32>,
    #[serde(default)]
    pub visible_bounds_height: Option<f32>,
    #[serde(default)]
    pub visible_bounds_offset: Option<Vec<f32>>,
    #[serde(default)]
    pub bones: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBone {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub pivot: Option<Vec<f32>>,
    #[serde(default)]
    pub rotation: Option<Vec<f32>>,
    #[serde(default)]
    pub mirror: Option<bool>,
    #[serde(default)]
    pub inflate: Option<f32>,
    #[serde(default, alias = "neverRender")]
    pub never_render: Option<bool>,
    #[serde(default)]
    pub cubes: Option<Vec<RawCube>>,
    #[serde(default)]
    pub locators: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCube {
    #[serde(default)]
    pub origin: Option<Vec<f32>>,
    #[serde(default)]
    pub size: Option<Vec<f32>>,
    #[serde(default)]
    pub uv: Option<RawCubeUv>,
    #[serde(default)]
    pub inflate: Option<f32>,
    #[serde(default)]
    pub mirror: Option<bool>,
}

/// A cube's `uv` field is either a bare `[u, v]` origin (canonical box
/// unwrap) or a map of per-face rectangles.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCubeUv {
    Simple([f32; 2]),
    PerFace(RawFaceUvMap),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFaceUvMap {
    #[serde(default)]
    pub north: Option<RawFaceUv>,
    #[serde(default)]
    pub south: Option<RawFaceUv>,
    #[serde(default)]
    pub east: Option<RawFaceUv>,
    #[serde(default)]
    pub west: Option<RawFaceUv>,
    #[serde(default)]
    pub up: Option<RawFaceUv>,
    #[serde(default)]
    pub down: Option<RawFaceUv>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFaceUv {
    pub uv: [f32; 2],
    /// Absent `uv_size` falls back to the face's projected pixel size.
    #[serde(default)]
    pub uv_size: Option<[f32; 2]>,
}

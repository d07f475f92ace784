//! Scene-graph compilation for normalized Bedrock geometry.
//!
//! Key constraints for this crate:
//! - Input is the canonical [`bg_format::Geometry`]; output is renderer
//!   agnostic (transforms + vertex attributes, no GPU types).
//! - Single-threaded, synchronous, pure; each compile allocates fresh output
//!   and holds no state between calls.
//! - Skeleton errors are fatal for the model; cube errors are isolated and
//!   collected per the partial-success policy.

use glam::Vec3;

pub mod compile;
pub mod cube_mesh;
pub mod skeleton;

pub use compile::*;
pub use cube_mesh::*;
pub use skeleton::*;

/// Uniform scale from authoring units (model pixels) to world units. Fixed
/// by the format; consumers apply it once to the assembled graph, the
/// compiler never bakes it into vertices.
pub const MODEL_SCALE: f32 = 1.0 / 16.0;

/// Convert an authoring-space point to scene space.
///
/// Authoring space is +Z-forward, the compiled scene is -Z-forward; the Z
/// negation here is the single handedness flip in the whole pipeline. Bone
/// pivots and cube offsets go through it; locators are left in authoring
/// space, so consumers placing attachments want this too.
pub fn to_scene(point: Vec3) -> Vec3 {
    Vec3::new(point.x, point.y, -point.z)
}

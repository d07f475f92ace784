//! Canonical geometry model, post-normalization.
//!
//! All values are immutable once built; a new model load produces a fresh
//! [`Geometry`] and discards the previous one. Bone parent links stay as
//! name references here and are resolved to indices by the scene crate.

use std::collections::BTreeMap;

use glam::{Vec2, Vec3};

#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub identifier: String,
    /// Texture atlas size in pixels. UV rectangles normalize against this.
    pub texture_width: u32,
    pub texture_height: u32,
    /// Descriptive culling/framing hint; carried through untouched.
    pub visible_bounds: Option<VisibleBounds>,
    pub bones: Vec<Bone>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisibleBounds {
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub offset: Option<Vec3>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    /// Name of the parent bone. Absent or dangling means root.
    pub parent: Option<String>,
    /// Rotation point in authoring space (+Y up, +Z forward), model pixels.
    pub pivot: Vec3,
    /// Euler angles in degrees, applied about `pivot`.
    pub rotation: Vec3,
    /// Inherited default for cubes that don't set their own `mirror`.
    pub mirror: Option<bool>,
    /// Inherited default for cubes that don't set their own `inflate`.
    pub inflate: Option<f32>,
    /// Authoring hint that this bone should not be drawn. Passthrough.
    pub never_render: bool,
    pub cubes: Vec<Cube>,
    /// Named attachment points in authoring space. Passthrough, untransformed.
    pub locators: BTreeMap<String, Vec3>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cube {
    /// Minimum corner, pre-inflate, in the *parent* bone's space.
    pub origin: Vec3,
    /// Extents in model pixels. Zero components are legal (flat cubes).
    /// `None` means the entry was authored without a size; the mesh compiler
    /// reports it as a malformed cube.
    pub size: Option<Vec3>,
    pub uv: Option<CubeUv>,
    pub inflate: Option<f32>,
    pub mirror: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CubeUv {
    /// Single atlas origin; implies the canonical six-face box unwrap.
    Simple(Vec2),
    PerFace(FaceUvMap),
}

/// Up to six independent face rectangles. A missing face keeps the mesh's
/// default coordinates for that face.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceUvMap {
    pub north: Option<FaceUv>,
    pub south: Option<FaceUv>,
    pub east: Option<FaceUv>,
    pub west: Option<FaceUv>,
    pub up: Option<FaceUv>,
    pub down: Option<FaceUv>,
}

impl FaceUvMap {
    pub fn is_empty(&self) -> bool {
        self.north.is_none()
            && self.south.is_none()
            && self.east.is_none()
            && self.west.is_none()
            && self.up.is_none()
            && self.down.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceUv {
    /// Rectangle origin in atlas pixels.
    pub origin: Vec2,
    /// Signed rectangle size; negative components flip the face horizontally
    /// or vertically. Absent means "the face's projected pixel size".
    pub size: Option<Vec2>,
}

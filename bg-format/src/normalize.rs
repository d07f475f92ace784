//! Normalization of raw model documents into canonical [`Geometry`] values.

use glam::{Vec2, Vec3};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::document::{
    RawBone, RawCube, RawCubeUv, RawFaceUv, RawFaceUvMap, RawLegacyGeometry, RawModelDocument,
};
use crate::geometry::{Bone, Cube, CubeUv, FaceUv, FaceUvMap, Geometry, VisibleBounds};

/// Prefix marking per-geometry top-level keys in legacy documents.
const LEGACY_GEOMETRY_PREFIX: &str = "geometry.";

/// Texture atlas size assumed when a document doesn't state one.
const DEFAULT_TEXTURE_SIZE: u32 = 64;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("no geometry found in model document")]
    NoGeometryFound,
    #[error("malformed bone entry at index {index}: {reason}")]
    MalformedBoneEntry { index: usize, reason: String },
}

/// Structured diagnostics produced while normalizing. Never fatal; returned
/// alongside the geometry instead of being logged as a side effect.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatNotice {
    /// The geometry array held more than one entry; only the first is used.
    ExtraGeometriesIgnored { count: usize },
    /// The document matched the legacy shape; `key` is the chosen entry.
    LegacyGeometryKey { key: String },
    /// `texture_width`/`texture_height` were absent and defaulted to 64.
    TextureSizeDefaulted,
    /// A locator value wasn't a 3-component vector and was dropped.
    LocatorSkipped { bone: String, locator: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedGeometry {
    pub geometry: Geometry,
    pub notices: Vec<FormatNotice>,
}

/// Normalize a raw document into one canonical geometry.
///
/// The two accepted shapes are tried in fixed priority order: the
/// `minecraft:geometry` array first (taking its first entry, which must carry
/// a description and a bone list), then the first legacy `geometry.*` key in
/// document order (which must carry a bone list). Pure function; no I/O.
pub fn normalize(doc: &RawModelDocument) -> Result<NormalizedGeometry, NormalizeError> {
    let mut notices = Vec::new();

    if let Some(list) = &doc.geometry
        && let Some(entry) = list.first()
        && let (Some(description), Some(bones)) = (&entry.description, &entry.bones)
    {
        if list.len() > 1 {
            notices.push(FormatNotice::ExtraGeometriesIgnored {
                count: list.len() - 1,
            });
        }
        if description.texture_width.is_none() || description.texture_height.is_none() {
            notices.push(FormatNotice::TextureSizeDefaulted);
        }
        let bones = normalize_bones(bones, &mut notices)?;
        let geometry = Geometry {
            identifier: description.identifier.clone().unwrap_or_default(),
            texture_width: texture_size(description.texture_width),
            texture_height: texture_size(description.texture_height),
            visible_bounds: visible_bounds(
                description.visible_bounds_width,
                description.visible_bounds_height,
                description.visible_bounds_offset.as_deref(),
            ),
            bones,
        };
        return Ok(NormalizedGeometry { geometry, notices });
    }

    if let Some((key, value)) = doc
        .rest
        .iter()
        .find(|(key, _)| key.starts_with(LEGACY_GEOMETRY_PREFIX))
    {
        debug!(key = %key, "model document matched the legacy geometry shape");
        let legacy: RawLegacyGeometry =
            serde_json::from_value(value.clone()).unwrap_or_default();
        let Some(bones) = &legacy.bones else {
            return Err(NormalizeError::NoGeometryFound);
        };
        notices.push(FormatNotice::LegacyGeometryKey { key: key.clone() });
        if legacy.texturewidth.is_none() || legacy.textureheight.is_none() {
            notices.push(FormatNotice::TextureSizeDefaulted);
        }
        let bones = normalize_bones(bones, &mut notices)?;
        let geometry = Geometry {
            identifier: key.clone(),
            texture_width: texture_size(legacy.texturewidth),
            texture_height: texture_size(legacy.textureheight),
            visible_bounds: visible_bounds(
                legacy.visible_bounds_width,
                legacy.visible_bounds_height,
                legacy.visible_bounds_offset.as_deref(),
            ),
            bones,
        };
        return Ok(NormalizedGeometry { geometry, notices });
    }

    Err(NormalizeError::NoGeometryFound)
}

fn normalize_bones(
    raw: &[Value],
    notices: &mut Vec<FormatNotice>,
) -> Result<Vec<Bone>, NormalizeError> {
    let mut bones = Vec::with_capacity(raw.len());
    for (index, value) in raw.iter().enumerate() {
        let bone: RawBone = serde_json::from_value(value.clone()).map_err(|err| {
            NormalizeError::MalformedBoneEntry {
                index,
                reason: err.to_string(),
            }
        })?;
        bones.push(normalize_bone(bone, index, notices)?);
    }
    Ok(bones)
}

fn normalize_bone(
    raw: RawBone,
    index: usize,
    notices: &mut Vec<FormatNotice>,
) -> Result<Bone, NormalizeError> {
    let Some(name) = raw.name else {
        return Err(NormalizeError::MalformedBoneEntry {
            index,
            reason: "missing name".into(),
        });
    };
    let pivot = required_vec3(raw.pivot.as_deref(), index, "pivot")?;
    let rotation = required_vec3(raw.rotation.as_deref(), index, "rotation")?;

    let mut locators = std::collections::BTreeMap::new();
    for (locator, value) in raw.locators.iter().flatten() {
        match value.as_array().and_then(|a| value_vec3(a)) {
            Some(point) => {
                locators.insert(locator.clone(), point);
            }
            None => {
                warn!(bone = %name, locator = %locator, "skipping non-vector locator");
                notices.push(FormatNotice::LocatorSkipped {
                    bone: name.clone(),
                    locator: locator.clone(),
                });
            }
        }
    }

    let cubes = raw
        .cubes
        .unwrap_or_default()
        .into_iter()
        .map(normalize_cube)
        .collect();

    Ok(Bone {
        name,
        parent: raw.parent,
        pivot,
        rotation,
        mirror: raw.mirror,
        inflate: raw.inflate,
        never_render: raw.never_render.unwrap_or(false),
        cubes,
        locators,
    })
}

fn normalize_cube(raw: RawCube) -> Cube {
    Cube {
        origin: vec3_or_zero(raw.origin.as_deref()),
        // A wrong-arity size is as unusable as a missing one; both surface as
        // a malformed cube when the mesh compiler runs.
        size: raw.size.as_deref().and_then(slice_vec3),
        uv: raw.uv.map(normalize_uv),
        inflate: raw.inflate,
        mirror: raw.mirror,
    }
}

fn normalize_uv(raw: RawCubeUv) -> CubeUv {
    match raw {
        RawCubeUv::Simple([u, v]) => CubeUv::Simple(Vec2::new(u, v)),
        RawCubeUv::PerFace(map) => CubeUv::PerFace(normalize_face_map(map)),
    }
}

fn normalize_face_map(raw: RawFaceUvMap) -> FaceUvMap {
    FaceUvMap {
        north: raw.north.map(normalize_face),
        south: raw.south.map(normalize_face),
        east: raw.east.map(normalize_face),
        west: raw.west.map(normalize_face),
        up: raw.up.map(normalize_face),
        down: raw.down.map(normalize_face),
    }
}

fn normalize_face(raw: RawFaceUv) -> FaceUv {
    FaceUv {
        origin: Vec2::from(raw.uv),
        size: raw.uv_size.map(Vec2::from),
    }
}

fn texture_size(authored: Option<f32>) -> u32 {
    match authored {
        Some(px) if px >= 1.0 => px as u32,
        _ => DEFAULT_TEXTURE_SIZE,
    }
}

fn visible_bounds(
    width: Option<f32>,
    height: Option<f32>,
    offset: Option<&[f32]>,
) -> Option<VisibleBounds> {
    let offset = offset.and_then(slice_vec3);
    if width.is_none() && height.is_none() && offset.is_none() {
        return None;
    }
    Some(VisibleBounds {
        width,
        height,
        offset,
    })
}

/// Absent defaults to the origin; present-but-wrong-arity is malformed.
fn required_vec3(
    slice: Option<&[f32]>,
    index: usize,
    field: &str,
) -> Result<Vec3, NormalizeError> {
    match slice {
        None => Ok(Vec3::ZERO),
        Some(values) => slice_vec3(values).ok_or_else(|| NormalizeError::MalformedBoneEntry {
            index,
            reason: format!("{field} must have 3 components"),
        }),
    }
}

fn vec3_or_zero(slice: Option<&[f32]>) -> Vec3 {
    slice.and_then(slice_vec3).unwrap_or(Vec3::ZERO)
}

fn slice_vec3(slice: &[f32]) -> Option<Vec3> {
    match slice {
        [x, y, z] => Some(Vec3::new(*x, *y, *z)),
        _ => None,
    }
}

fn value_vec3(values: &[Value]) -> Option<Vec3> {
    match values {
        [x, y, z] => Some(Vec3::new(
            x.as_f64()? as f32,
            y.as_f64()? as f32,
            z.as_f64()? as f32,
        )),
        _ => None,
    }
}

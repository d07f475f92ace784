//! Cube-to-mesh compilation: box geometry, UV unwrap, mirroring, inflation.

use bg_format::{Bone, Cube, CubeUv, FaceUv, FaceUvMap, Geometry};
use glam::{Vec2, Vec3};
use thiserror::Error;

use crate::to_scene;

/// Opaque reference to an externally managed texture resource. The compiler
/// never dereferences it; presence alone decides whether UVs are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CubeError {
    #[error("cube {cube_index} on bone {bone} has no size")]
    MalformedCube { bone: String, cube_index: usize },
}

/// Box faces, named by the authoring compass. The handedness flip puts the
/// authored north face on +Z in scene space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    East,
    West,
    Up,
    Down,
    North,
    South,
}

impl CubeFace {
    /// Fixed face order of the vertex buffer: four corners per face.
    pub const ALL: [CubeFace; 6] = [
        CubeFace::East,
        CubeFace::West,
        CubeFace::Up,
        CubeFace::Down,
        CubeFace::North,
        CubeFace::South,
    ];

    pub fn index(self) -> usize {
        match self {
            CubeFace::East => 0,
            CubeFace::West => 1,
            CubeFace::Up => 2,
            CubeFace::Down => 3,
            CubeFace::North => 4,
            CubeFace::South => 5,
        }
    }

    /// Outward normal in scene space.
    pub fn normal(self) -> Vec3 {
        match self {
            CubeFace::East => Vec3::X,
            CubeFace::West => Vec3::NEG_X,
            CubeFace::Up => Vec3::Y,
            CubeFace::Down => Vec3::NEG_Y,
            CubeFace::North => Vec3::Z,
            CubeFace::South => Vec3::NEG_Z,
        }
    }
}

/// One compiled box: 4 vertices per face, 24 total, local to the owning
/// bone's pivot. Consumers instantiate this under the bone's transform node
/// and apply [`crate::MODEL_SCALE`] once at the graph root.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshPrimitive {
    pub positions: [[f32; 3]; 24],
    pub normals: [[f32; 3]; 24],
    pub uvs: [[f32; 2]; 24],
    pub indices: [u32; 36],
    /// Effective values after cube/bone inheritance, recorded for consumers.
    pub inflate: f32,
    pub mirror: bool,
}

/// Corner sign pattern per face, corners ordered top-left, top-right,
/// bottom-left, bottom-right in each face's own frame. Fixed convention;
/// the UV tables below are written against exactly this layout.
const FACE_CORNERS: [[[f32; 3]; 4]; 6] = [
    // east (+X)
    [[1., 1., 1.], [1., 1., -1.], [1., -1., 1.], [1., -1., -1.]],
    // west (-X)
    [[-1., 1., -1.], [-1., 1., 1.], [-1., -1., -1.], [-1., -1., 1.]],
    // up (+Y)
    [[-1., 1., -1.], [1., 1., -1.], [-1., 1., 1.], [1., 1., 1.]],
    // down (-Y)
    [[-1., -1., 1.], [1., -1., 1.], [-1., -1., -1.], [1., -1., -1.]],
    // north (+Z)
    [[-1., 1., 1.], [1., 1., 1.], [-1., -1., 1.], [1., -1., 1.]],
    // south (-Z)
    [[1., 1., -1.], [-1., 1., -1.], [1., -1., -1.], [-1., -1., -1.]],
];

/// Which rectangle corner each face corner samples. Rectangle corners are
/// indexed top-left 0, top-right 1, bottom-left 2, bottom-right 3 in
/// normalized (already V-flipped) texture space. The six faces of a box are
/// not symmetric under one rule; this table is the convention, not derived.
const FACE_UV_CORNERS: [[usize; 4]; 6] = [
    [0, 1, 2, 3], // east
    [1, 0, 3, 2], // west
    [2, 3, 0, 1], // up
    [0, 1, 2, 3], // down
    [1, 0, 3, 2], // north
    [0, 1, 2, 3], // south
];

/// Per-corner UVs a face keeps when it has no mapping (or no texture).
const DEFAULT_FACE_UVS: [[f32; 2]; 4] = [[0., 1.], [1., 1.], [0., 0.], [1., 0.]];

/// Unwrap a simple `[u, v]` atlas origin into the canonical six face
/// rectangles for a box of authored size `(w, h, d)`. Negative rectangle
/// sizes are deliberate: they flip the face, they are not an error.
pub fn unwrap_box_uv(origin: Vec2, size: Vec3) -> FaceUvMap {
    let (u, v) = (origin.x, origin.y);
    let (w, h, d) = (size.x, size.y, size.z);
    let rect = |x: f32, y: f32, sx: f32, sy: f32| {
        Some(FaceUv {
            origin: Vec2::new(x, y),
            size: Some(Vec2::new(sx, sy)),
        })
    };
    FaceUvMap {
        east: rect(u + d + w, v + d, -w, h),
        west: rect(u, v + d, w, h),
        up: rect(u + d, v, w, d),
        down: rect(u + d + w, v, w, -d),
        south: rect(u + 2.0 * d + w, v + d, -d, h),
        north: rect(u + d, v + d, w, h),
    }
}

/// Compile one cube into a positioned box mesh with per-face UVs.
///
/// Pure and order-sensitive: inheritance, extents, centering, and UV
/// resolution happen exactly as documented on each step below. `cube_index`
/// only labels the error when the cube has no size.
pub fn compile_cube(
    cube: &Cube,
    bone: &Bone,
    geometry: &Geometry,
    cube_index: usize,
    texture: Option<TextureHandle>,
) -> Result<MeshPrimitive, CubeError> {
    let Some(size) = cube.size else {
        return Err(CubeError::MalformedCube {
            bone: bone.name.clone(),
            cube_index,
        });
    };

    let inflate = cube.inflate.or(bone.inflate).unwrap_or(0.0);
    let mirror = cube.mirror.or(bone.mirror).unwrap_or(false);

    // Inflate grows the box symmetrically about the un-inflated center, so
    // the center comes from the authored size alone. Negative or zero
    // extents pass through unclamped.
    let half = (size + Vec3::splat(2.0 * inflate)) * 0.5;
    let center = cube.origin + size * 0.5;
    let relative = to_scene(center - bone.pivot);

    let mut positions = [[0.0; 3]; 24];
    let mut normals = [[0.0; 3]; 24];
    let mut uvs = [[0.0; 2]; 24];
    let mut indices = [0u32; 36];
    for face in CubeFace::ALL {
        let f = face.index();
        let normal = face.normal().to_array();
        for corner in 0..4 {
            let signs = Vec3::from_array(FACE_CORNERS[f][corner]);
            positions[f * 4 + corner] = (relative + signs * half).to_array();
            normals[f * 4 + corner] = normal;
            uvs[f * 4 + corner] = DEFAULT_FACE_UVS[corner];
        }
        let base = (f * 4) as u32;
        indices[f * 6..f * 6 + 6].copy_from_slice(&[
            base,
            base + 2,
            base + 1,
            base + 2,
            base + 3,
            base + 1,
        ]);
    }

    // Without a texture there is nothing to sample; geometry stays exact and
    // the default UVs are left in place.
    if texture.is_some()
        && let Some(cube_uv) = &cube.uv
    {
        let face_map = match cube_uv {
            CubeUv::Simple(origin) => unwrap_box_uv(*origin, size),
            CubeUv::PerFace(map) => map.clone(),
        };
        apply_face_uvs(&mut uvs, &face_map, size, geometry, mirror);
    }

    Ok(MeshPrimitive {
        positions,
        normals,
        uvs,
        indices,
        inflate,
        mirror,
    })
}

fn apply_face_uvs(
    uvs: &mut [[f32; 2]; 24],
    map: &FaceUvMap,
    size: Vec3,
    geometry: &Geometry,
    mirror: bool,
) {
    for face in CubeFace::ALL {
        let Some(face_uv) = face_entry(map, face) else {
            continue;
        };
        let rect = face_rect(face_uv, face, size, geometry, mirror);
        let f = face.index();
        for corner in 0..4 {
            uvs[f * 4 + corner] = rect[FACE_UV_CORNERS[f][corner]];
        }
    }
}

fn face_entry(map: &FaceUvMap, face: CubeFace) -> Option<&FaceUv> {
    match face {
        CubeFace::East => map.east.as_ref(),
        CubeFace::West => map.west.as_ref(),
        CubeFace::Up => map.up.as_ref(),
        CubeFace::Down => map.down.as_ref(),
        CubeFace::North => map.north.as_ref(),
        CubeFace::South => map.south.as_ref(),
    }
}

/// Authored pixel size a face projects to, used when `uv_size` is omitted.
fn face_pixel_size(face: CubeFace, size: Vec3) -> Vec2 {
    let (w, h, d) = (size.x, size.y, size.z);
    match face {
        CubeFace::North | CubeFace::South => Vec2::new(w, h),
        CubeFace::East | CubeFace::West => Vec2::new(d, h),
        CubeFace::Up | CubeFace::Down => Vec2::new(w, d),
    }
}

/// Normalized rectangle corners [top-left, top-right, bottom-left,
/// bottom-right] for one face: divide by the atlas size, flip V into the
/// output convention, then swap the horizontal pair when mirrored. Signed
/// sizes keep their direction; there is no min/max collapsing here.
fn face_rect(
    face_uv: &FaceUv,
    face: CubeFace,
    size: Vec3,
    geometry: &Geometry,
    mirror: bool,
) -> [[f32; 2]; 4] {
    let atlas = Vec2::new(geometry.texture_width as f32, geometry.texture_height as f32);
    let uv_size = face_uv.size.unwrap_or_else(|| face_pixel_size(face, size));
    let mut u1 = face_uv.origin.x / atlas.x;
    let mut u2 = (face_uv.origin.x + uv_size.x) / atlas.x;
    let v1 = 1.0 - face_uv.origin.y / atlas.y;
    let v2 = 1.0 - (face_uv.origin.y + uv_size.y) / atlas.y;
    if mirror {
        std::mem::swap(&mut u1, &mut u2);
    }
    [[u1, v1], [u2, v1], [u1, v2], [u2, v2]]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn test_geometry(texture_width: u32, texture_height: u32) -> Geometry {
        Geometry {
            identifier: "geometry.test".into(),
            texture_width,
            texture_height,
            visible_bounds: None,
            bones: Vec::new(),
        }
    }

    fn test_bone(name: &str) -> Bone {
        Bone {
            name: name.into(),
            parent: None,
            pivot: Vec3::ZERO,
            rotation: Vec3::ZERO,
            mirror: None,
            inflate: None,
            never_render: false,
            cubes: Vec::new(),
            locators: BTreeMap::new(),
        }
    }

    fn test_cube(origin: Vec3, size: Vec3) -> Cube {
        Cube {
            origin,
            size: Some(size),
            uv: None,
            inflate: None,
            mirror: None,
        }
    }

    const TEXTURE: Option<TextureHandle> = Some(TextureHandle(1));

    fn bounds(prim: &MeshPrimitive) -> (Vec3, Vec3) {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for p in &prim.positions {
            min = min.min(Vec3::from_array(*p));
            max = max.max(Vec3::from_array(*p));
        }
        (min, max)
    }

    fn face_uv_corners(prim: &MeshPrimitive, face: CubeFace) -> [[f32; 2]; 4] {
        let f = face.index();
        [
            prim.uvs[f * 4],
            prim.uvs[f * 4 + 1],
            prim.uvs[f * 4 + 2],
            prim.uvs[f * 4 + 3],
        ]
    }

    #[test]
    fn unwrap_matches_hand_computed_table() {
        // (u, v) = (1, 2), (w, h, d) = (1, 1, 1).
        let map = unwrap_box_uv(Vec2::new(1.0, 2.0), Vec3::ONE);
        let rect = |face: &Option<FaceUv>| {
            let face = face.unwrap();
            (face.origin, face.size.unwrap())
        };
        assert_eq!(rect(&map.east), (Vec2::new(3.0, 3.0), Vec2::new(-1.0, 1.0)));
        assert_eq!(rect(&map.west), (Vec2::new(1.0, 3.0), Vec2::new(1.0, 1.0)));
        assert_eq!(rect(&map.up), (Vec2::new(2.0, 2.0), Vec2::new(1.0, 1.0)));
        assert_eq!(rect(&map.down), (Vec2::new(3.0, 2.0), Vec2::new(1.0, -1.0)));
        assert_eq!(rect(&map.south), (Vec2::new(4.0, 3.0), Vec2::new(-1.0, 1.0)));
        assert_eq!(rect(&map.north), (Vec2::new(2.0, 3.0), Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn box_is_centered_relative_to_pivot_with_z_flip() {
        let mut bone = test_bone("body");
        bone.pivot = Vec3::new(1.0, 1.0, 1.0);
        let cube = test_cube(Vec3::ZERO, Vec3::new(2.0, 4.0, 6.0));
        let prim = compile_cube(&cube, &bone, &test_geometry(64, 64), 0, None).unwrap();
        // center (1, 2, 3), relative (0, 1, 2), scene (0, 1, -2).
        let (min, max) = bounds(&prim);
        assert!(min.abs_diff_eq(Vec3::new(-1.0, -1.0, -5.0), 1e-6));
        assert!(max.abs_diff_eq(Vec3::new(1.0, 3.0, 1.0), 1e-6));
    }

    #[test]
    fn inflate_grows_extents_but_not_center() {
        let bone = test_bone("body");
        let plain = test_cube(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(2.0, 2.0, 2.0));
        let mut inflated = plain.clone();
        inflated.inflate = Some(0.5);

        let plain = compile_cube(&plain, &bone, &test_geometry(64, 64), 0, None).unwrap();
        let inflated = compile_cube(&inflated, &bone, &test_geometry(64, 64), 0, None).unwrap();

        let (pmin, pmax) = bounds(&plain);
        let (imin, imax) = bounds(&inflated);
        assert!((pmax - pmin).abs_diff_eq(Vec3::splat(2.0), 1e-6));
        assert!((imax - imin).abs_diff_eq(Vec3::splat(3.0), 1e-6));
        let pcenter = (pmin + pmax) * 0.5;
        let icenter = (imin + imax) * 0.5;
        assert!(pcenter.abs_diff_eq(icenter, 1e-6));
    }

    #[test]
    fn pre_inflated_authoring_matches_inflate_geometry() {
        let bone = test_bone("body");
        let mut inflated = test_cube(Vec3::new(2.0, 4.0, 6.0), Vec3::new(4.0, 4.0, 4.0));
        inflated.inflate = Some(0.25);
        let by_hand = test_cube(Vec3::new(1.75, 3.75, 5.75), Vec3::new(4.5, 4.5, 4.5));

        let inflated = compile_cube(&inflated, &bone, &test_geometry(64, 64), 0, None).unwrap();
        let by_hand = compile_cube(&by_hand, &bone, &test_geometry(64, 64), 0, None).unwrap();
        assert_eq!(inflated.positions, by_hand.positions);
    }

    #[test]
    fn inflate_and_mirror_inherit_from_bone_with_cube_override() {
        let mut bone = test_bone("left_arm");
        bone.inflate = Some(0.5);
        bone.mirror = Some(true);

        let inherit = test_cube(Vec3::ZERO, Vec3::ONE);
        let prim = compile_cube(&inherit, &bone, &test_geometry(64, 64), 0, None).unwrap();
        assert_eq!(prim.inflate, 0.5);
        assert!(prim.mirror);

        let mut overridden = test_cube(Vec3::ZERO, Vec3::ONE);
        overridden.inflate = Some(0.0);
        overridden.mirror = Some(false);
        let prim = compile_cube(&overridden, &bone, &test_geometry(64, 64), 0, None).unwrap();
        assert_eq!(prim.inflate, 0.0);
        assert!(!prim.mirror);
    }

    #[test]
    fn flat_cube_compiles_to_zero_volume() {
        let bone = test_bone("fin");
        let cube = test_cube(Vec3::ZERO, Vec3::new(0.0, 4.0, 6.0));
        let prim = compile_cube(&cube, &bone, &test_geometry(64, 64), 0, TEXTURE).unwrap();
        let (min, max) = bounds(&prim);
        assert_eq!(min.x, max.x);
        assert!((max.y - min.y - 4.0).abs() < 1e-6);
        assert!((max.z - min.z - 6.0).abs() < 1e-6);
    }

    #[test]
    fn missing_size_is_malformed() {
        let bone = test_bone("body");
        let cube = Cube {
            origin: Vec3::ZERO,
            size: None,
            uv: None,
            inflate: None,
            mirror: None,
        };
        assert_eq!(
            compile_cube(&cube, &bone, &test_geometry(64, 64), 3, TEXTURE),
            Err(CubeError::MalformedCube {
                bone: "body".into(),
                cube_index: 3,
            })
        );
    }

    #[test]
    fn winding_agrees_with_face_normals() {
        let bone = test_bone("body");
        let cube = test_cube(Vec3::new(-2.0, -2.0, -2.0), Vec3::splat(4.0));
        let prim = compile_cube(&cube, &bone, &test_geometry(64, 64), 0, None).unwrap();
        for triangle in prim.indices.chunks(3) {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
            let va = Vec3::from_array(prim.positions[a]);
            let vb = Vec3::from_array(prim.positions[b]);
            let vc = Vec3::from_array(prim.positions[c]);
            let face_normal = Vec3::from_array(prim.normals[a]);
            let winding = (vb - va).cross(vc - va);
            assert!(
                winding.dot(face_normal) > 0.0,
                "triangle {a},{b},{c} winds against its normal"
            );
        }
    }

    #[test]
    fn per_face_uv_lands_on_the_right_corners() {
        let bone = test_bone("head");
        let mut cube = test_cube(Vec3::ZERO, Vec3::splat(8.0));
        cube.uv = Some(CubeUv::PerFace(FaceUvMap {
            north: Some(FaceUv {
                origin: Vec2::ZERO,
                size: Some(Vec2::new(8.0, 8.0)),
            }),
            ..Default::default()
        }));
        let prim = compile_cube(&cube, &bone, &test_geometry(16, 16), 0, TEXTURE).unwrap();

        // u1 = 0, u2 = 0.5; flipped v1 = 1, v2 = 0.5. North swaps the
        // horizontal pair per the corner table.
        assert_eq!(
            face_uv_corners(&prim, CubeFace::North),
            [[0.5, 1.0], [0.0, 1.0], [0.5, 0.5], [0.0, 0.5]]
        );
        // Unmapped faces keep the default layout.
        assert_eq!(face_uv_corners(&prim, CubeFace::South), DEFAULT_FACE_UVS);
    }

    #[test]
    fn omitted_uv_size_projects_the_face() {
        let bone = test_bone("head");
        let mut cube = test_cube(Vec3::ZERO, Vec3::new(8.0, 4.0, 2.0));
        cube.uv = Some(CubeUv::PerFace(FaceUvMap {
            east: Some(FaceUv {
                origin: Vec2::ZERO,
                size: None,
            }),
            ..Default::default()
        }));
        let prim = compile_cube(&cube, &bone, &test_geometry(16, 16), 0, TEXTURE).unwrap();
        // East projects (d, h) = (2, 4): u2 = 2/16, v2 flipped = 1 - 4/16.
        assert_eq!(
            face_uv_corners(&prim, CubeFace::East),
            [[0.0, 1.0], [0.125, 1.0], [0.0, 0.75], [0.125, 0.75]]
        );
    }

    #[test]
    fn negative_uv_size_flips_without_collapsing() {
        let bone = test_bone("head");
        let mut cube = test_cube(Vec3::ZERO, Vec3::splat(8.0));
        cube.uv = Some(CubeUv::PerFace(FaceUvMap {
            east: Some(FaceUv {
                origin: Vec2::new(8.0, 0.0),
                size: Some(Vec2::new(-8.0, 8.0)),
            }),
            ..Default::default()
        }));
        let prim = compile_cube(&cube, &bone, &test_geometry(16, 16), 0, TEXTURE).unwrap();
        // u1 = 0.5 runs right-to-left to u2 = 0: a real horizontal flip.
        assert_eq!(
            face_uv_corners(&prim, CubeFace::East),
            [[0.5, 1.0], [0.0, 1.0], [0.5, 0.5], [0.0, 0.5]]
        );
    }

    #[test]
    fn mirror_swaps_the_horizontal_pair() {
        let bone = test_bone("left_leg");
        let mut cube = test_cube(Vec3::ZERO, Vec3::splat(8.0));
        cube.uv = Some(CubeUv::PerFace(FaceUvMap {
            north: Some(FaceUv {
                origin: Vec2::ZERO,
                size: Some(Vec2::new(8.0, 8.0)),
            }),
            ..Default::default()
        }));
        let plain = compile_cube(&cube, &bone, &test_geometry(16, 16), 0, TEXTURE).unwrap();
        let mut mirrored_cube = cube.clone();
        mirrored_cube.mirror = Some(true);
        let mirrored =
            compile_cube(&mirrored_cube, &bone, &test_geometry(16, 16), 0, TEXTURE).unwrap();

        let base = CubeFace::North.index() * 4;
        for corner in 0..4 {
            let [u, v] = plain.uvs[base + corner];
            let [mu, mv] = mirrored.uvs[base + corner];
            assert_eq!(v, mv);
            // Swapped horizontally: 0 <-> 0.5 within the mapped rectangle.
            assert!((u + mu - 0.5).abs() < 1e-6);
        }
        // Geometry is unaffected by mirroring.
        assert_eq!(plain.positions, mirrored.positions);
    }

    #[test]
    fn simple_uv_resolves_through_the_unwrap() {
        let bone = test_bone("head");
        let mut cube = test_cube(Vec3::ZERO, Vec3::splat(8.0));
        cube.uv = Some(CubeUv::Simple(Vec2::ZERO));
        let prim = compile_cube(&cube, &bone, &test_geometry(64, 64), 0, TEXTURE).unwrap();

        // North rect: origin (8, 8), size (8, 8) over a 64px atlas.
        let (u1, u2) = (8.0 / 64.0, 16.0 / 64.0);
        let (v1, v2) = (1.0 - 8.0 / 64.0, 1.0 - 16.0 / 64.0);
        assert_eq!(
            face_uv_corners(&prim, CubeFace::North),
            [[u2, v1], [u1, v1], [u2, v2], [u1, v2]]
        );
        // East rect is authored flipped: origin (16, 8), size (-8, 8).
        let (eu1, eu2) = (16.0 / 64.0, 8.0 / 64.0);
        assert_eq!(
            face_uv_corners(&prim, CubeFace::East),
            [[eu1, v1], [eu2, v1], [eu1, v2], [eu2, v2]]
        );
    }

    #[test]
    fn no_texture_skips_uv_resolution() {
        let bone = test_bone("head");
        let mut cube = test_cube(Vec3::ZERO, Vec3::splat(8.0));
        cube.uv = Some(CubeUv::Simple(Vec2::ZERO));
        let prim = compile_cube(&cube, &bone, &test_geometry(64, 64), 0, None).unwrap();
        for face in CubeFace::ALL {
            assert_eq!(face_uv_corners(&prim, face), DEFAULT_FACE_UVS);
        }
    }

    #[test]
    fn empty_face_map_compiles_with_default_uvs() {
        let bone = test_bone("head");
        let mut cube = test_cube(Vec3::ZERO, Vec3::splat(8.0));
        cube.uv = Some(CubeUv::PerFace(FaceUvMap::default()));
        let prim = compile_cube(&cube, &bone, &test_geometry(64, 64), 0, TEXTURE).unwrap();
        for face in CubeFace::ALL {
            assert_eq!(face_uv_corners(&prim, face), DEFAULT_FACE_UVS);
        }
    }
}

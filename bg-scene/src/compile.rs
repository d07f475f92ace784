//! Whole-model compilation: skeleton build plus per-cube mesh compilation.

use bg_format::Geometry;
use tracing::warn;

use crate::cube_mesh::{CubeError, MeshPrimitive, TextureHandle, compile_cube};
use crate::skeleton::{BoneId, BuildError, SkeletonGraph};

/// One compiled cube, addressed to its owning bone. Consumers attach the
/// primitive under that bone's transform node.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneMesh {
    pub bone: BoneId,
    pub primitive: MeshPrimitive,
}

#[derive(Debug, Clone)]
pub struct CompiledModel {
    pub skeleton: SkeletonGraph,
    pub meshes: Vec<BoneMesh>,
    /// Isolated per-cube failures; the rest of the model is intact.
    pub cube_errors: Vec<CubeError>,
    /// The texture the meshes were compiled against, passed back through.
    pub texture: Option<TextureHandle>,
}

/// Compile a canonical geometry into a scene graph and its box meshes.
///
/// Skeleton problems (duplicate names, cycles) fail the whole model: no
/// partial geometry is usable without a valid hierarchy. A malformed cube
/// only loses that cube; its bone stays in the skeleton and every other
/// cube still compiles.
pub fn compile_model(
    geometry: &Geometry,
    texture: Option<TextureHandle>,
) -> Result<CompiledModel, BuildError> {
    let skeleton = SkeletonGraph::build(geometry)?;

    let mut meshes = Vec::new();
    let mut cube_errors = Vec::new();
    for (index, bone) in geometry.bones.iter().enumerate() {
        for (cube_index, cube) in bone.cubes.iter().enumerate() {
            match compile_cube(cube, bone, geometry, cube_index, texture) {
                Ok(primitive) => meshes.push(BoneMesh {
                    bone: BoneId(index),
                    primitive,
                }),
                Err(err) => {
                    warn!(bone = %bone.name, cube_index, "skipping cube: {err}");
                    cube_errors.push(err);
                }
            }
        }
    }

    Ok(CompiledModel {
        skeleton,
        meshes,
        cube_errors,
        texture,
    })
}

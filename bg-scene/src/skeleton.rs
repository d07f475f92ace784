//! Bone hierarchy resolution and transform computation.

use std::collections::HashMap;

use bg_format::{Bone, Geometry};
use glam::{EulerRot, Mat4, Quat};
use thiserror::Error;
use tracing::warn;

use crate::to_scene;

/// Stable index of a bone in its [`SkeletonGraph`]. Bones keep the order
/// they were authored in, so ids line up with `Geometry::bones`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoneId(pub usize);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("duplicate bone name: {0}")]
    DuplicateBoneName(String),
    #[error("cyclic bone hierarchy through {0}")]
    CyclicHierarchy(String),
}

/// Non-fatal diagnostics from the hierarchy build.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneNotice {
    /// `bone.parent` names a bone that doesn't exist; treated as a root.
    DanglingParent { bone: String, parent: String },
}

#[derive(Debug, Clone)]
pub struct BoneNode {
    pub name: String,
    pub parent: Option<BoneId>,
    pub children: Vec<BoneId>,
    /// Pivot translation and rotation relative to the parent bone.
    pub local: Mat4,
    /// Composition of local transforms down the parent chain.
    pub world: Mat4,
}

/// Arena of resolved bones. Parent/child links are indices, never owning
/// references; the name lookup and children lists are built once here and
/// never recomputed.
#[derive(Debug, Clone, Default)]
pub struct SkeletonGraph {
    nodes: Vec<BoneNode>,
    by_name: HashMap<String, BoneId>,
    pub notices: Vec<SceneNotice>,
}

impl SkeletonGraph {
    /// Resolve the bone hierarchy of `geometry` and compute per-bone local
    /// and world transforms.
    ///
    /// A bone is a root iff its parent is absent or dangling (dangling
    /// references are common in real content and only produce a
    /// [`SceneNotice`]). Duplicate names and parent cycles are fatal.
    pub fn build(geometry: &Geometry) -> Result<SkeletonGraph, BuildError> {
        let bones = &geometry.bones;
        let mut by_name = HashMap::with_capacity(bones.len());
        for (index, bone) in bones.iter().enumerate() {
            if by_name.insert(bone.name.clone(), BoneId(index)).is_some() {
                return Err(BuildError::DuplicateBoneName(bone.name.clone()));
            }
        }

        let mut notices = Vec::new();
        let parents: Vec<Option<BoneId>> = bones
            .iter()
            .map(|bone| match &bone.parent {
                Some(parent) => match by_name.get(parent) {
                    Some(id) => Some(*id),
                    None => {
                        warn!(bone = %bone.name, parent = %parent, "dangling parent, treating bone as root");
                        notices.push(SceneNotice::DanglingParent {
                            bone: bone.name.clone(),
                            parent: parent.clone(),
                        });
                        None
                    }
                },
                None => None,
            })
            .collect();

        let order = topological_order(bones, &parents)?;

        let locals: Vec<Mat4> = bones.iter().map(local_transform).collect();
        let mut worlds = vec![Mat4::IDENTITY; bones.len()];
        // `order` puts ancestors first, so each parent's world transform is
        // final by the time a child reads it and every entry is computed
        // exactly once.
        for &index in &order {
            worlds[index] = match parents[index] {
                Some(parent) => worlds[parent.0] * locals[index],
                None => locals[index],
            };
        }

        let mut children: Vec<Vec<BoneId>> = vec![Vec::new(); bones.len()];
        for (index, parent) in parents.iter().enumerate() {
            if let Some(parent) = parent {
                children[parent.0].push(BoneId(index));
            }
        }

        let nodes = bones
            .iter()
            .enumerate()
            .map(|(index, bone)| BoneNode {
                name: bone.name.clone(),
                parent: parents[index],
                children: std::mem::take(&mut children[index]),
                local: locals[index],
                world: worlds[index],
            })
            .collect();

        Ok(SkeletonGraph {
            nodes,
            by_name,
            notices,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: BoneId) -> Option<&BoneNode> {
        self.nodes.get(id.0)
    }

    pub fn id_by_name(&self, name: &str) -> Option<BoneId> {
        self.by_name.get(name).copied()
    }

    pub fn node_by_name(&self, name: &str) -> Option<&BoneNode> {
        self.id_by_name(name).and_then(|id| self.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (BoneId, &BoneNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (BoneId(i), n))
    }

    pub fn roots(&self) -> impl Iterator<Item = BoneId> + '_ {
        self.iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(id, _)| id)
    }
}

/// Ancestors-first ordering of bone indices, or the cycle that prevents one.
///
/// Walks each bone's parent chain with three-state marks, so every bone is
/// visited a constant number of times regardless of hierarchy depth.
fn topological_order(bones: &[Bone], parents: &[Option<BoneId>]) -> Result<Vec<usize>, BuildError> {
    const UNSEEN: u8 = 0;
    const ON_WALK: u8 = 1;
    const DONE: u8 = 2;

    let mut state = vec![UNSEEN; bones.len()];
    let mut order = Vec::with_capacity(bones.len());
    let mut chain = Vec::new();
    for start in 0..bones.len() {
        if state[start] == DONE {
            continue;
        }
        chain.clear();
        let mut current = start;
        loop {
            match state[current] {
                DONE => break,
                ON_WALK => {
                    return Err(BuildError::CyclicHierarchy(bones[current].name.clone()));
                }
                _ => {}
            }
            state[current] = ON_WALK;
            chain.push(current);
            match parents[current] {
                Some(parent) => current = parent.0,
                None => break,
            }
        }
        for &index in chain.iter().rev() {
            state[index] = DONE;
            order.push(index);
        }
    }
    Ok(order)
}

/// Local transform: translate to the pivot (Z flipped into scene space),
/// then rotate. The rotation negates the authored X and Y angles and keeps
/// Z; that asymmetry is the source format's convention, not a bug.
fn local_transform(bone: &Bone) -> Mat4 {
    let degrees = bone.rotation;
    let rotation = Quat::from_euler(
        EulerRot::XYZ,
        -degrees.x.to_radians(),
        -degrees.y.to_radians(),
        degrees.z.to_radians(),
    );
    Mat4::from_translation(to_scene(bone.pivot)) * Mat4::from_quat(rotation)
}

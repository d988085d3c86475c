//! Skeletal transform evaluation.
//!
//! A bone hierarchy is a forward-ordered DAG (validated at model
//! construction), so a single 0..N pass computes every bone's world
//! transform:
//!
//! - `world[0] = local[0]`
//! - `world[i] = local[i] · world[parent(i)]`
//!
//! The per-bone shader matrix is `bind_to_bone[i] · world[i]`. The skinned
//! path evaluates an entity's pose once per draw; the instanced path
//! evaluates the model's static rest pose once per batch.

use glam::Mat4;

use crate::errors::{RenderError, Result};
use crate::gpu::{BufferId, GpuDevice, MapAccess};
use crate::scene::model::MAX_BONES;
use crate::scene::{BonePose, Model};

fn evaluate(model: &Model, local_of: impl Fn(usize) -> Mat4, out: &mut Vec<Mat4>) {
    out.clear();
    let bones = model.bones();
    let mut world = [Mat4::IDENTITY; MAX_BONES];
    for (index, bone) in bones.iter().enumerate() {
        let local = local_of(index);
        world[index] = match bone.parent {
            Some(parent) => local * world[parent as usize],
            None => local,
        };
        out.push(bone.bind_to_bone * world[index]);
    }
}

/// Computes shader-ready bone matrices from an entity's per-bone poses.
/// Pose entries missing for a bone fall back to that bone's rest pose.
pub fn evaluate_pose(model: &Model, pose: &[BonePose], out: &mut Vec<Mat4>) {
    evaluate(
        model,
        |index| {
            pose.get(index)
                .unwrap_or(&model.bones()[index].rest_pose)
                .matrix()
        },
        out,
    );
}

/// Computes shader-ready bone matrices from the model's static rest pose,
/// used for instanced (non-animated) batches.
pub fn evaluate_rest_pose(model: &Model, out: &mut Vec<Mat4>) {
    evaluate(model, |index| model.bones()[index].rest_pose.matrix(), out);
}

/// Writes bone matrices into the shared bone buffer.
///
/// Map, write, unmap: the unmap lands before the draw that consumes the
/// buffer, so the GPU never reads a mapped region.
pub fn upload_bones(
    device: &mut dyn GpuDevice,
    buffer: BufferId,
    matrices: &[Mat4],
) -> Result<()> {
    if matrices.len() > MAX_BONES {
        return Err(RenderError::BoneCapacity {
            count: matrices.len(),
            limit: MAX_BONES,
        });
    }
    let bytes: &[u8] = bytemuck::cast_slice(matrices);
    let mapped = device.map_buffer(buffer, MapAccess::WriteOnly)?;
    mapped[..bytes.len()].copy_from_slice(bytes);
    device.unmap_buffer(buffer)
}

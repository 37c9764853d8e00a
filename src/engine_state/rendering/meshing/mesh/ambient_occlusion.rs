//! Per-corner ambient occlusion for block faces.
//!
//! Each face corner looks at the three cells that touch it in the layer in
//! front of the face: two edge cells and the diagonal corner cell. Levels run
//! from 0 (darkest) to 3 (unoccluded) and four of them pack into one byte so
//! the greedy mask can compare whole faces at once.

use crate::engine_state::rendering::meshing::neighborhood::PaddedVolume;

/// Level of a corner with nothing around it.
pub const UNOCCLUDED: u8 = 3;

/// Packed value of a face with all four corners unoccluded.
pub const FULLY_LIT: u8 = 0xFF;

/// Occlusion level of one corner.
///
/// Two occluding edge cells hide the corner completely, whatever the corner
/// cell holds.
pub fn vertex_ao(side1: bool, side2: bool, corner: bool) -> u8 {
    if side1 && side2 {
        0
    } else {
        UNOCCLUDED - (side1 as u8 + side2 as u8 + corner as u8)
    }
}

/// Slot of a corner inside a packed AO byte.
///
/// Bit 0 of the slot selects the high end of the first in-plane axis, bit 1 the
/// high end of the second.
pub fn corner_slot(high_u: bool, high_v: bool) -> usize {
    high_u as usize | (high_v as usize) << 1
}

/// Reads one corner out of a packed AO byte.
pub fn unpack(packed: u8, slot: usize) -> u8 {
    (packed >> (2 * slot)) & 0b11
}

/// Computes the packed AO of a face.
///
/// # Arguments
/// * `volume` - The padded chunk being meshed
/// * `front` - The air-side cell the face looks into
/// * `u` - First in-plane axis
/// * `v` - Second in-plane axis
///
/// # Returns
/// Four 2-bit levels, indexed by [`corner_slot`].
pub(crate) fn face_ao(volume: &PaddedVolume, front: [i32; 3], u: usize, v: usize) -> u8 {
    let mut packed = 0;
    for slot in 0..4 {
        let du = if slot & 1 == 1 { 1 } else { -1 };
        let dv = if slot & 2 == 2 { 1 } else { -1 };

        let mut side1 = front;
        side1[u] += du;
        let mut side2 = front;
        side2[v] += dv;
        let mut corner = side1;
        corner[v] += dv;

        let level = vertex_ao(
            volume.occludes(side1),
            volume.occludes(side2),
            volume.occludes(corner),
        );
        packed |= level << (2 * slot);
    }
    packed
}

/*!
 * Time slot resolution.
 *
 * Unanchored slots lying between two anchored slots get a linearly
 * interpolated offset based on their position in the time order. Slots with
 * an anchored neighbor on one side only inherit that neighbor's offset.
 */

use log::trace;

use super::model::TimeSlot;

/// Resolve offsets for all slots, in the same order as the input.
///
/// Returns `None` for a slot only when the document contains no anchored
/// slot at all. A decreasing pair of anchors is clamped to the earlier
/// anchor so interpolated offsets never reverse the time order.
pub fn resolve_time_slots(slots: &[TimeSlot]) -> Vec<Option<u64>> {
    let n = slots.len();

    // Nearest anchored slot on each side, as (index, offset)
    let mut previous: Vec<Option<(usize, u64)>> = vec![None; n];
    let mut last = None;
    for (i, slot) in slots.iter().enumerate() {
        if let Some(value) = slot.value_ms {
            last = Some((i, value));
        }
        previous[i] = last;
    }

    let mut next: Vec<Option<(usize, u64)>> = vec![None; n];
    let mut upcoming = None;
    for (i, slot) in slots.iter().enumerate().rev() {
        if let Some(value) = slot.value_ms {
            upcoming = Some((i, value));
        }
        next[i] = upcoming;
    }

    slots
        .iter()
        .enumerate()
        .map(|(k, slot)| {
            if let Some(value) = slot.value_ms {
                return Some(value);
            }
            let resolved = match (previous[k], next[k]) {
                (Some((i, vi)), Some((j, vj))) => Some(interpolate(i, vi, j, vj, k)),
                (Some((_, vi)), None) => Some(vi),
                (None, Some((_, vj))) => Some(vj),
                (None, None) => None,
            };
            trace!("Resolved unanchored slot {} to {:?}", slot.id, resolved);
            resolved
        })
        .collect()
}

fn interpolate(i: usize, vi: u64, j: usize, vj: u64, k: usize) -> u64 {
    if vj <= vi || j <= i {
        return vi;
    }
    let span = (vj - vi) as u128;
    let steps = (j - i) as u128;
    let step = (k - i) as u128;
    vi + (span * step / steps) as u64
}

//! Best-effort patch application

use super::{source_of, target_of, Patch};

/// Where a patch landed in the buffer and what it replaces there
struct Placement {
    start: usize,
    removed: usize,
    inserted: Vec<char>,
    /// Offset between where the patch was found and where it was expected
    drift: isize,
}

/// Apply `patches` to `text` in order.
///
/// Returns the patched text and one flag per patch. A patch is first looked
/// for at its recorded offset (corrected by the drift of earlier patches),
/// then at the nearest exact occurrence of its source text, and finally at
/// the nearest occurrence of its core edit with the context stripped. A
/// patch that cannot be placed is skipped and flagged `false`; the remaining
/// patches are still applied. Offsets or lengths too large to address a
/// buffer also count as a failed patch.
pub fn patch_apply(patches: &[Patch], text: &str) -> (String, Vec<bool>) {
    let mut buffer: Vec<char> = text.chars().collect();
    let mut results = Vec::with_capacity(patches.len());
    let mut delta: isize = 0;

    for patch in patches {
        let Some(expected) = expected_offset(patch, delta) else {
            tracing::trace!(start = patch.start2, "Patch offset out of range");
            results.push(false);
            continue;
        };
        match place(&buffer, patch, expected) {
            Some(placement) => {
                let end = placement.start + placement.removed;
                buffer.splice(placement.start..end, placement.inserted);
                delta = delta.saturating_add(placement.drift);
                results.push(true);
            }
            None => {
                // Later patches assume this one took effect
                if let Some(shift) = length_shift(patch) {
                    delta = delta.saturating_sub(shift);
                }
                results.push(false);
            }
        }
    }

    (buffer.into_iter().collect(), results)
}

/// Recorded start of `patch` corrected by `delta`, clamped at zero
fn expected_offset(patch: &Patch, delta: isize) -> Option<usize> {
    let start = isize::try_from(patch.start2).ok()?.checked_add(delta)?;
    Some(start.max(0).unsigned_abs())
}

/// How much `patch` grows the text it applies to
fn length_shift(patch: &Patch) -> Option<isize> {
    isize::try_from(patch.length2)
        .ok()?
        .checked_sub(isize::try_from(patch.length1).ok()?)
}

/// Signed distance from `expected` to `start`
fn drift(start: usize, expected: usize) -> Option<isize> {
    isize::try_from(start)
        .ok()?
        .checked_sub(isize::try_from(expected).ok()?)
}

fn place(buffer: &[char], patch: &Patch, expected: usize) -> Option<Placement> {
    let source: Vec<char> = patch.source_text().chars().collect();
    if let Some(start) = nearest(buffer, &source, expected) {
        return Some(Placement {
            start,
            removed: source.len(),
            inserted: patch.target_text().chars().collect(),
            drift: drift(start, expected)?,
        });
    }

    let (lead, core) = patch.core();
    let core_source: Vec<char> = source_of(core).chars().collect();
    if core_source.is_empty() {
        return None;
    }
    let core_expected = expected.checked_add(lead)?;
    let start = nearest(buffer, &core_source, core_expected)?;
    Some(Placement {
        start,
        removed: core_source.len(),
        inserted: target_of(core).chars().collect(),
        drift: drift(start, core_expected)?,
    })
}

/// Find the occurrence of `pattern` in `buffer` closest to `loc`.
fn nearest(buffer: &[char], pattern: &[char], loc: usize) -> Option<usize> {
    if pattern.is_empty() {
        return Some(loc.min(buffer.len()));
    }
    if pattern.len() > buffer.len() {
        return None;
    }
    let at_loc = loc
        .checked_add(pattern.len())
        .and_then(|end| buffer.get(loc..end));
    if at_loc == Some(pattern) {
        return Some(loc);
    }
    buffer
        .windows(pattern.len())
        .enumerate()
        .filter(|(_, window)| *window == pattern)
        .map(|(i, _)| i)
        .min_by_key(|&i| i.abs_diff(loc))
}

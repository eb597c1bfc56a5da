//! Patch construction

use super::{Diff, Operation, Patch};

/// Characters of context kept around each edit
pub const PATCH_MARGIN: usize = 4;

/// Upper bound on the length of a context pattern
pub const MATCH_MAX_BITS: usize = 32;

/// Group a diff of `source` into context-carrying patches.
///
/// Edits separated by a short equality (up to `2 * PATCH_MARGIN` characters)
/// share a patch; longer equalities split them. Each patch's offsets are
/// relative to the text as it stands after every earlier patch has been
/// applied, so patches must be applied in order.
pub fn patch_make(source: &str, diffs: &[Diff]) -> Vec<Patch> {
    let mut patches = Vec::new();
    if diffs.is_empty() {
        return patches;
    }

    let mut patch = Patch::default();
    let mut count1 = 0;
    let mut count2 = 0;
    let mut prepatch: Vec<char> = source.chars().collect();
    let mut postpatch = prepatch.clone();

    for (i, diff) in diffs.iter().enumerate() {
        let text: Vec<char> = diff.1.chars().collect();
        let len = text.len();

        if patch.diffs.is_empty() && diff.0 != Operation::Equal {
            patch.start1 = count1;
            patch.start2 = count2;
        }

        match diff.0 {
            Operation::Insert => {
                patch.diffs.push(diff.clone());
                patch.length2 += len;
                let at = count2.min(postpatch.len());
                postpatch.splice(at..at, text);
            }
            Operation::Delete => {
                patch.length1 += len;
                patch.diffs.push(diff.clone());
                let at = count2.min(postpatch.len());
                let end = (count2 + len).min(postpatch.len());
                postpatch.drain(at..end);
            }
            Operation::Equal => {
                let is_last = i + 1 == diffs.len();
                if len <= 2 * PATCH_MARGIN && !patch.diffs.is_empty() && !is_last {
                    patch.diffs.push(diff.clone());
                    patch.length1 += len;
                    patch.length2 += len;
                } else if len >= 2 * PATCH_MARGIN && !patch.diffs.is_empty() {
                    add_context(&mut patch, &prepatch);
                    patches.push(std::mem::take(&mut patch));
                    // Later patches are positioned against the partially patched text
                    prepatch = postpatch.clone();
                    count1 = count2;
                }
            }
        }

        if diff.0 != Operation::Insert {
            count1 += len;
        }
        if diff.0 != Operation::Delete {
            count2 += len;
        }
    }

    if !patch.diffs.is_empty() {
        add_context(&mut patch, &prepatch);
        patches.push(patch);
    }

    patches
}

/// Widen a patch with surrounding equalities until its source pattern is
/// unique in `text`, then pad it by one more margin on each side.
fn add_context(patch: &mut Patch, text: &[char]) {
    if text.is_empty() {
        return;
    }

    let start = patch.start2.min(text.len());
    let end = (start + patch.length1).min(text.len());
    let mut padding = 0;
    let mut lo = start;
    let mut hi = end;

    while !occurs_once(text, &text[lo..hi])
        && hi - lo < MATCH_MAX_BITS - PATCH_MARGIN - PATCH_MARGIN
        && (lo > 0 || hi < text.len())
    {
        padding += PATCH_MARGIN;
        lo = start.saturating_sub(padding);
        hi = (end + padding).min(text.len());
    }
    padding += PATCH_MARGIN;

    let prefix_start = start.saturating_sub(padding);
    let suffix_end = (end + padding).min(text.len());
    let prefix_len = start - prefix_start;
    let suffix_len = suffix_end - end;

    if prefix_len > 0 {
        let prefix: String = text[prefix_start..start].iter().collect();
        patch.diffs.insert(0, Diff::equal(prefix));
    }
    if suffix_len > 0 {
        let suffix: String = text[end..suffix_end].iter().collect();
        patch.diffs.push(Diff::equal(suffix));
    }

    patch.start1 = patch.start1.saturating_sub(prefix_len);
    patch.start2 -= prefix_len;
    patch.length1 += prefix_len + suffix_len;
    patch.length2 += prefix_len + suffix_len;
}

fn occurs_once(text: &[char], pattern: &[char]) -> bool {
    if pattern.is_empty() {
        return text.is_empty();
    }
    let mut hits = text.windows(pattern.len()).filter(|w| *w == pattern);
    hits.next().is_some() && hits.next().is_none()
}

//! Character diffs and their cleanup passes

use similar::{capture_diff_slices, Algorithm, DiffTag};

use super::{Diff, Operation};

/// Compute a character-level diff from `old` to `new`.
///
/// The raw edit script comes from `similar` (Myers) and is normalized with
/// [`cleanup_merge`], so runs are coalesced and every edit run is ordered
/// delete-then-insert.
pub fn diff_main(old: &str, new: &str) -> Vec<Diff> {
    let old_chars: Vec<char> = old.chars().collect();
    let new_chars: Vec<char> = new.chars().collect();

    let mut diffs = Vec::new();
    for op in capture_diff_slices(Algorithm::Myers, &old_chars, &new_chars) {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        let removed: String = old_chars[old_range].iter().collect();
        let added: String = new_chars[new_range].iter().collect();
        match tag {
            DiffTag::Equal => diffs.push(Diff::equal(removed)),
            DiffTag::Delete => diffs.push(Diff::delete(removed)),
            DiffTag::Insert => diffs.push(Diff::insert(added)),
            DiffTag::Replace => {
                diffs.push(Diff::delete(removed));
                diffs.push(Diff::insert(added));
            }
        }
    }

    cleanup_merge(&mut diffs);
    diffs
}

/// Coalesce adjacent spans of the same kind.
///
/// Each run of edits between two equalities collapses into at most one
/// delete followed by one insert. Text common to the start or end of both
/// is factored out into the surrounding equalities. Empty spans are dropped.
pub fn cleanup_merge(diffs: &mut Vec<Diff>) {
    let mut merged: Vec<Diff> = Vec::with_capacity(diffs.len());
    let mut deleted = String::new();
    let mut inserted = String::new();

    for diff in diffs.drain(..) {
        match diff.0 {
            Operation::Delete => deleted.push_str(&diff.1),
            Operation::Insert => inserted.push_str(&diff.1),
            Operation::Equal => {
                let mut carried = flush_edits(&mut merged, &mut deleted, &mut inserted);
                carried.push_str(&diff.1);
                push_equal(&mut merged, carried);
            }
        }
    }
    let carried = flush_edits(&mut merged, &mut deleted, &mut inserted);
    push_equal(&mut merged, carried);

    *diffs = merged;
}

/// Emit a pending edit run, returning any common suffix that belongs to the
/// following equality.
fn flush_edits(out: &mut Vec<Diff>, deleted: &mut String, inserted: &mut String) -> String {
    let mut carried = String::new();

    if !deleted.is_empty() && !inserted.is_empty() {
        let head = common_prefix(deleted, inserted);
        if head > 0 {
            let shared = deleted[..head].to_string();
            push_equal(out, shared);
            deleted.drain(..head);
            inserted.drain(..head);
        }

        let tail = common_suffix(deleted, inserted);
        if tail > 0 {
            carried = deleted[deleted.len() - tail..].to_string();
            deleted.truncate(deleted.len() - tail);
            inserted.truncate(inserted.len() - tail);
        }
    }

    if !deleted.is_empty() {
        out.push(Diff::delete(std::mem::take(deleted)));
    }
    if !inserted.is_empty() {
        out.push(Diff::insert(std::mem::take(inserted)));
    }

    carried
}

fn push_equal(out: &mut Vec<Diff>, text: String) {
    if text.is_empty() {
        return;
    }
    match out.last_mut() {
        Some(last) if last.0 == Operation::Equal => last.1.push_str(&text),
        _ => out.push(Diff::equal(text)),
    }
}

/// Byte length of the common prefix of two strings
pub(crate) fn common_prefix(a: &str, b: &str) -> usize {
    a.chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x.len_utf8())
        .sum()
}

/// Byte length of the common suffix of two strings
pub(crate) fn common_suffix(a: &str, b: &str) -> usize {
    a.chars()
        .rev()
        .zip(b.chars().rev())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x.len_utf8())
        .sum()
}

/// Remove equalities that are too short to be meaningful.
///
/// An equality is dropped (turned into a delete plus an insert of the same
/// text) when it is no longer than the larger edit on each side of it. This
/// turns `"cat" -> "dog"` noise like `-c+d a -t+g` into a single
/// `-cat +dog` and keeps replay visually coherent.
pub fn cleanup_semantic(diffs: &mut Vec<Diff>) {
    let mut changes = false;
    let mut equalities: Vec<usize> = Vec::new();
    // Character length of the most recent equality still under evaluation
    let mut last_equality: Option<usize> = None;
    let mut inserted_before = 0;
    let mut deleted_before = 0;
    let mut inserted_after = 0;
    let mut deleted_after = 0;

    let mut pointer = 0;
    while pointer < diffs.len() {
        let len = diffs[pointer].char_len();

        if diffs[pointer].0 == Operation::Equal {
            equalities.push(pointer);
            inserted_before = inserted_after;
            deleted_before = deleted_after;
            inserted_after = 0;
            deleted_after = 0;
            last_equality = Some(len);
            pointer += 1;
            continue;
        }

        if diffs[pointer].0 == Operation::Insert {
            inserted_after += len;
        } else {
            deleted_after += len;
        }

        let eliminate = last_equality.is_some_and(|eq_len| {
            eq_len <= inserted_before.max(deleted_before)
                && eq_len <= inserted_after.max(deleted_after)
        });

        if let (true, Some(&idx)) = (eliminate, equalities.last()) {
            let text = diffs[idx].1.clone();
            diffs.insert(idx, Diff::delete(text));
            diffs[idx + 1].0 = Operation::Insert;

            // Drop the equality just removed and re-evaluate the one before it
            equalities.pop();
            equalities.pop();
            pointer = equalities.last().map_or(0, |&i| i + 1);

            inserted_before = 0;
            deleted_before = 0;
            inserted_after = 0;
            deleted_after = 0;
            last_equality = None;
            changes = true;
            continue;
        }

        pointer += 1;
    }

    if changes {
        cleanup_merge(diffs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rebuild(diffs: &[Diff]) -> (String, String) {
        (super::super::source_of(diffs), super::super::target_of(diffs))
    }

    #[test]
    fn test_diff_main_simple_insert() {
        let diffs = diff_main("ab", "abc");
        assert_eq!(diffs, vec![Diff::equal("ab"), Diff::insert("c")]);
    }

    #[test]
    fn test_diff_main_empty_sides() {
        assert_eq!(diff_main("", "hi"), vec![Diff::insert("hi")]);
        assert_eq!(diff_main("hi", ""), vec![Diff::delete("hi")]);
        assert!(diff_main("", "").is_empty());
    }

    #[test]
    fn test_diff_main_reconstructs_both_sides() {
        let diffs = diff_main("kitten sitting", "sitting kitten");
        let (source, target) = rebuild(&diffs);
        assert_eq!(source, "kitten sitting");
        assert_eq!(target, "sitting kitten");
    }

    #[test]
    fn test_diff_main_multibyte() {
        let diffs = diff_main("こんにちは", "こんばんは");
        let (source, target) = rebuild(&diffs);
        assert_eq!(source, "こんにちは");
        assert_eq!(target, "こんばんは");
        assert_eq!(diffs.first(), Some(&Diff::equal("こん")));
    }

    #[test]
    fn test_cleanup_merge_coalesces_runs() {
        let mut diffs = vec![
            Diff::equal("a"),
            Diff::delete("b"),
            Diff::delete("c"),
            Diff::insert("d"),
            Diff::equal(""),
            Diff::equal("e"),
        ];
        cleanup_merge(&mut diffs);
        assert_eq!(
            diffs,
            vec![
                Diff::equal("a"),
                Diff::delete("bc"),
                Diff::insert("d"),
                Diff::equal("e"),
            ]
        );
    }

    #[test]
    fn test_cleanup_merge_factors_common_affixes() {
        let mut diffs = vec![
            Diff::equal("x"),
            Diff::delete("abc"),
            Diff::insert("abXc"),
            Diff::equal("y"),
        ];
        cleanup_merge(&mut diffs);
        assert_eq!(
            diffs,
            vec![Diff::equal("xab"), Diff::insert("X"), Diff::equal("cy")]
        );
    }

    #[test]
    fn test_cleanup_semantic_eliminates_short_equality() {
        let mut diffs = vec![
            Diff::delete("ab"),
            Diff::equal("c"),
            Diff::delete("de"),
        ];
        cleanup_semantic(&mut diffs);
        assert_eq!(diffs, vec![Diff::delete("abcde"), Diff::insert("c")]);
    }

    #[test]
    fn test_cleanup_semantic_keeps_long_equality() {
        let mut diffs = vec![
            Diff::delete("a"),
            Diff::equal("long shared text"),
            Diff::insert("b"),
        ];
        let expected = diffs.clone();
        cleanup_semantic(&mut diffs);
        assert_eq!(diffs, expected);
    }

    #[test]
    fn test_cleanup_semantic_word_swap() {
        let mut diffs = diff_main("cat", "dog");
        cleanup_semantic(&mut diffs);
        assert_eq!(diffs, vec![Diff::delete("cat"), Diff::insert("dog")]);
    }

    #[test]
    fn test_cleanup_semantic_preserves_texts() {
        let mut diffs = diff_main("the old house on the hill", "a new house by a hill");
        cleanup_semantic(&mut diffs);
        let (source, target) = rebuild(&diffs);
        assert_eq!(source, "the old house on the hill");
        assert_eq!(target, "a new house by a hill");
    }

    #[test]
    fn test_common_affix_lengths() {
        assert_eq!(common_prefix("abc", "abd"), 2);
        assert_eq!(common_suffix("xyz", "ayz"), 2);
        assert_eq!(common_prefix("é", "éa"), 'é'.len_utf8());
        assert_eq!(common_prefix("", "a"), 0);
    }
}

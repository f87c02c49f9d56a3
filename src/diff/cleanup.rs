//! Post-processing passes for edit scripts.
//!
//! A raw edit script is correct but rarely pleasant to read. These passes reorder and merge edits
//! into a canonical form, either for humans ([cleanup_semantic]) or for machines
//! ([cleanup_efficiency]). Every pass leaves the script normalized by [cleanup_merge].

use crate::edit::{Edit, Op};
use crate::text::{common_overlap, common_prefix, common_suffix};
use log::trace;

/// Reorder and merge like edit sections, merging equalities.
///
/// Any edit section can move as long as it doesn't cross an equality. Empty edits are dropped,
/// and afterwards no two adjacent edits share an operation.
pub fn cleanup_merge(edits: &mut Vec<Edit>) {
    // Sentinel so the final run is flushed.
    edits.push(Edit::equal(""));
    let mut pointer = 0;
    let mut count_delete = 0;
    let mut count_insert = 0;
    let mut text_delete: Vec<char> = Vec::new();
    let mut text_insert: Vec<char> = Vec::new();

    while pointer < edits.len() {
        if pointer < edits.len() - 1 && edits[pointer].text.is_empty() {
            edits.remove(pointer);
            continue;
        }
        match edits[pointer].op {
            Op::Insert => {
                count_insert += 1;
                text_insert.extend(edits[pointer].text.chars());
                pointer += 1;
            }
            Op::Delete => {
                count_delete += 1;
                text_delete.extend(edits[pointer].text.chars());
                pointer += 1;
            }
            Op::Equal => {
                if count_delete + count_insert > 1 {
                    let run_start = pointer - count_delete - count_insert;
                    if count_delete != 0 && count_insert != 0 {
                        // Factor out any common prefix.
                        let common = common_prefix(&text_insert, &text_delete);
                        if common != 0 {
                            let shared: String = text_insert[..common].iter().collect();
                            if run_start > 0 && edits[run_start - 1].op == Op::Equal {
                                edits[run_start - 1].text.push_str(&shared);
                            } else {
                                edits.insert(0, Edit::equal(shared));
                                pointer += 1;
                            }
                            text_insert.drain(..common);
                            text_delete.drain(..common);
                        }
                        // Factor out any common suffix.
                        let common = common_suffix(&text_insert, &text_delete);
                        if common != 0 {
                            let shared: String =
                                text_insert[text_insert.len() - common..].iter().collect();
                            edits[pointer].text.insert_str(0, &shared);
                            text_insert.truncate(text_insert.len() - common);
                            text_delete.truncate(text_delete.len() - common);
                        }
                    }
                    // Replace the run with the merged edits.
                    pointer -= count_delete + count_insert;
                    edits.drain(pointer..pointer + count_delete + count_insert);
                    if !text_delete.is_empty() {
                        edits.insert(pointer, Edit::from_chars(Op::Delete, &text_delete));
                        pointer += 1;
                    }
                    if !text_insert.is_empty() {
                        edits.insert(pointer, Edit::from_chars(Op::Insert, &text_insert));
                        pointer += 1;
                    }
                    pointer += 1;
                } else if pointer != 0 && edits[pointer - 1].op == Op::Equal {
                    // Merge this equality with the previous one.
                    let text = edits.remove(pointer).text;
                    edits[pointer - 1].text.push_str(&text);
                } else {
                    pointer += 1;
                }
                count_insert = 0;
                count_delete = 0;
                text_delete.clear();
                text_insert.clear();
            }
        }
    }
    if edits.last().is_some_and(|edit| edit.text.is_empty()) {
        edits.pop();
    }

    // Second pass: look for single edits surrounded on both sides by equalities which can be
    // shifted sideways to eliminate an equality. e.g: A<ins>BA</ins>C -> <ins>AB</ins>AC
    let mut changes = false;
    let mut pointer = 1;
    while pointer + 1 < edits.len() {
        if edits[pointer - 1].op == Op::Equal && edits[pointer + 1].op == Op::Equal {
            let prev = edits[pointer - 1].text.clone();
            let next = edits[pointer + 1].text.clone();
            let current = edits[pointer].text.clone();

            if let Some(kept) = current.strip_suffix(prev.as_str()) {
                // Shift the edit over the previous equality.
                edits[pointer].text = format!("{prev}{kept}");
                edits[pointer + 1].text = format!("{prev}{next}");
                edits.remove(pointer - 1);
                changes = true;
            } else if let Some(rest) = current.strip_prefix(next.as_str()) {
                // Shift the edit over the next equality.
                edits[pointer].text = format!("{rest}{next}");
                edits[pointer - 1].text.push_str(&next);
                edits.remove(pointer + 1);
                changes = true;
            }
        }
        pointer += 1;
    }
    // If shifts were made, the script might need reordering.
    if changes {
        cleanup_merge(edits);
    }
}

/// Reduce the number of edits by eliminating semantically trivial equalities.
///
/// An equality that is no longer than the changes on either side of it is folded into a single
/// deletion and insertion. Boundaries are then shifted with [cleanup_semantic_lossless], and
/// overlaps between adjacent deletions and insertions are extracted as equalities.
pub fn cleanup_semantic(edits: &mut Vec<Edit>) {
    let mut changes = false;
    // Indices of the equalities seen so far
    let mut equalities: Vec<usize> = Vec::new();
    // The length of the last equality, if it is still a candidate
    let mut last_equality: Option<usize> = None;
    let mut pointer = 0;
    // Number of characters changed before and after the last equality
    let mut insertions_before = 0;
    let mut deletions_before = 0;
    let mut insertions_after = 0;
    let mut deletions_after = 0;

    while pointer < edits.len() {
        let edit = &edits[pointer];
        if edit.op == Op::Equal {
            equalities.push(pointer);
            insertions_before = insertions_after;
            deletions_before = deletions_after;
            insertions_after = 0;
            deletions_after = 0;
            last_equality = Some(edit.char_len());
            pointer += 1;
            continue;
        }

        if edit.op == Op::Insert {
            insertions_after += edit.char_len();
        } else {
            deletions_after += edit.char_len();
        }

        // Eliminate an equality that is smaller or equal to the edits on both sides of it.
        let eliminate = last_equality.is_some_and(|len| {
            len > 0
                && len <= insertions_before.max(deletions_before)
                && len <= insertions_after.max(deletions_after)
        });
        let candidate = if eliminate { equalities.last().copied() } else { None };
        if let Some(equality) = candidate {
            trace!("Eliminating equality at {equality}");
            let text = edits[equality].text.clone();
            edits.insert(equality, Edit::delete(text));
            edits[equality + 1].op = Op::Insert;
            // Throw away the equality we just deleted, and the previous one since it needs to be
            // re-evaluated.
            equalities.pop();
            equalities.pop();
            pointer = equalities.last().map_or(0, |&idx| idx + 1);
            insertions_before = 0;
            deletions_before = 0;
            insertions_after = 0;
            deletions_after = 0;
            last_equality = None;
            changes = true;
            continue;
        }
        pointer += 1;
    }

    if changes {
        cleanup_merge(edits);
    }
    cleanup_semantic_lossless(edits);

    // Find any overlaps between deletions and insertions.
    // e.g: <del>abcxxx</del><ins>xxxdef</ins>
    //   -> <del>abc</del>xxx<ins>def</ins>
    // e.g: <del>xxxabc</del><ins>defxxx</ins>
    //   -> <ins>def</ins>xxx<del>abc</del>
    // Only extract an overlap if it is as big as the edit ahead or behind it.
    let mut pointer = 1;
    while pointer < edits.len() {
        if edits[pointer - 1].op == Op::Delete && edits[pointer].op == Op::Insert {
            let deletion: Vec<char> = edits[pointer - 1].text.chars().collect();
            let insertion: Vec<char> = edits[pointer].text.chars().collect();
            let overlap1 = common_overlap(&deletion, &insertion);
            let overlap2 = common_overlap(&insertion, &deletion);

            if overlap1 >= overlap2 {
                if overlap1 * 2 >= deletion.len() || overlap1 * 2 >= insertion.len() {
                    edits.insert(pointer, Edit::from_chars(Op::Equal, &insertion[..overlap1]));
                    edits[pointer - 1] =
                        Edit::from_chars(Op::Delete, &deletion[..deletion.len() - overlap1]);
                    edits[pointer + 1] = Edit::from_chars(Op::Insert, &insertion[overlap1..]);
                    pointer += 1;
                }
            } else if overlap2 * 2 >= deletion.len() || overlap2 * 2 >= insertion.len() {
                // Reverse overlap: swap the edits around the shared text.
                edits.insert(pointer, Edit::from_chars(Op::Equal, &deletion[..overlap2]));
                edits[pointer - 1] =
                    Edit::from_chars(Op::Insert, &insertion[..insertion.len() - overlap2]);
                edits[pointer + 1] = Edit::from_chars(Op::Delete, &deletion[overlap2..]);
                pointer += 1;
            }
            pointer += 1;
        }
        pointer += 1;
    }
}

/// Score how good a boundary between `one` and `two` is for a human reader.
///
/// Scores range from 6 (an edge of the text) down to 0 (the middle of a word).
pub fn boundary_score(one: &[char], two: &[char]) -> u8 {
    let (Some(&char1), Some(&char2)) = (one.last(), two.first()) else {
        return 6;
    };

    let non_alphanumeric1 = !char1.is_alphanumeric();
    let non_alphanumeric2 = !char2.is_alphanumeric();
    let whitespace1 = non_alphanumeric1 && char1.is_whitespace();
    let whitespace2 = non_alphanumeric2 && char2.is_whitespace();
    let line_break1 = whitespace1 && matches!(char1, '\r' | '\n');
    let line_break2 = whitespace2 && matches!(char2, '\r' | '\n');
    let blank_line1 = line_break1 && ends_with_blank_line(one);
    let blank_line2 = line_break2 && starts_with_blank_line(two);

    if blank_line1 || blank_line2 {
        5
    } else if line_break1 || line_break2 {
        4
    } else if non_alphanumeric1 && !whitespace1 && whitespace2 {
        // End of a sentence
        3
    } else if whitespace1 || whitespace2 {
        2
    } else if non_alphanumeric1 || non_alphanumeric2 {
        1
    } else {
        0
    }
}

/// Whether the text ends with `\n\n` or `\n\r\n`
fn ends_with_blank_line(text: &[char]) -> bool {
    text.ends_with(&['\n', '\n']) || text.ends_with(&['\n', '\r', '\n'])
}

/// Whether the text starts with an optional `\r` then `\n`, twice
fn starts_with_blank_line(text: &[char]) -> bool {
    let rest = text.strip_prefix(&['\r']).unwrap_or(text);
    let Some(rest) = rest.strip_prefix(&['\n']) else {
        return false;
    };
    let rest = rest.strip_prefix(&['\r']).unwrap_or(rest);
    rest.starts_with(&['\n'])
}

/// Look for single edits surrounded on both sides by equalities which can be shifted sideways
/// to align the edit to a word boundary.
///
/// e.g: `The c<ins>at c</ins>ame.` -> `The <ins>cat </ins>came.`
pub fn cleanup_semantic_lossless(edits: &mut Vec<Edit>) {
    let mut pointer = 1;
    while pointer + 1 < edits.len() {
        if edits[pointer - 1].op == Op::Equal && edits[pointer + 1].op == Op::Equal {
            let mut equality1: Vec<char> = edits[pointer - 1].text.chars().collect();
            let mut edit: Vec<char> = edits[pointer].text.chars().collect();
            let mut equality2: Vec<char> = edits[pointer + 1].text.chars().collect();

            // First, shift the edit as far left as possible.
            let common = common_suffix(&equality1, &edit);
            if common != 0 {
                let shared = edit[edit.len() - common..].to_vec();
                equality1.truncate(equality1.len() - common);
                edit.truncate(edit.len() - common);
                edit.splice(0..0, shared.iter().copied());
                equality2.splice(0..0, shared);
            }

            // Second, step character by character right, looking for the best fit.
            let mut best_equality1 = equality1.clone();
            let mut best_edit = edit.clone();
            let mut best_equality2 = equality2.clone();
            let mut best_score = boundary_score(&equality1, &edit) + boundary_score(&edit, &equality2);
            while !edit.is_empty() && edit.first() == equality2.first() {
                let shifted = edit.remove(0);
                equality1.push(shifted);
                edit.push(equality2.remove(0));
                let score = boundary_score(&equality1, &edit) + boundary_score(&edit, &equality2);
                // The >= encourages trailing rather than leading whitespace on edits.
                if score >= best_score {
                    best_score = score;
                    best_equality1.clone_from(&equality1);
                    best_edit.clone_from(&edit);
                    best_equality2.clone_from(&equality2);
                }
            }

            let original_len = edits[pointer - 1].char_len();
            if original_len != best_equality1.len() {
                // We have an improvement, save it back to the script.
                if best_equality1.is_empty() {
                    edits.remove(pointer - 1);
                    pointer -= 1;
                } else {
                    edits[pointer - 1] = Edit::from_chars(Op::Equal, &best_equality1);
                }
                edits[pointer].text = best_edit.iter().collect();
                if best_equality2.is_empty() {
                    edits.remove(pointer + 1);
                    pointer -= 1;
                } else {
                    edits[pointer + 1] = Edit::from_chars(Op::Equal, &best_equality2);
                }
            }
        }
        pointer += 1;
    }
}

/// Reduce the number of edits by eliminating operationally trivial equalities.
///
/// A short equality surrounded by changes costs more to carry as a separate edit than to fold
/// into the changes around it. `edit_cost` sets the size below which an equality is folded.
pub fn cleanup_efficiency(edits: &mut Vec<Edit>, edit_cost: usize) {
    let mut changes = false;
    let mut equalities: Vec<usize> = Vec::new();
    let mut last_equality: Option<usize> = None;
    let mut pointer = 0;
    // Whether there is an insertion or deletion before the last equality
    let mut pre_ins = false;
    let mut pre_del = false;
    // Whether there is an insertion or deletion after the last equality
    let mut post_ins = false;
    let mut post_del = false;

    while pointer < edits.len() {
        if edits[pointer].op == Op::Equal {
            let len = edits[pointer].char_len();
            if len < edit_cost && (post_ins || post_del) {
                // Candidate found.
                equalities.push(pointer);
                pre_ins = post_ins;
                pre_del = post_del;
                last_equality = Some(len);
            } else {
                // Not a candidate, and can never become one.
                equalities.clear();
                last_equality = None;
            }
            post_ins = false;
            post_del = false;
            pointer += 1;
            continue;
        }

        if edits[pointer].op == Op::Delete {
            post_del = true;
        } else {
            post_ins = true;
        }

        // Five types to be split:
        // <ins>A</ins><del>B</del>XY<ins>C</ins><del>D</del>
        // <ins>A</ins>X<ins>C</ins><del>D</del>
        // <ins>A</ins><del>B</del>X<ins>C</ins>
        // <ins>A</del>X<ins>C</ins><del>D</del>
        // <ins>A</ins><del>B</del>X<del>C</del>
        let sides = [pre_ins, pre_del, post_ins, post_del]
            .iter()
            .filter(|&&side| side)
            .count();
        let split = last_equality.is_some_and(|len| {
            len > 0 && (sides == 4 || (len * 2 < edit_cost && sides == 3))
        });

        let candidate = if split { equalities.last().copied() } else { None };
        if let Some(equality) = candidate {
            let text = edits[equality].text.clone();
            edits.insert(equality, Edit::delete(text));
            edits[equality + 1].op = Op::Insert;
            // Throw away the equality we just deleted.
            equalities.pop();
            last_equality = None;
            changes = true;
            if pre_ins && pre_del {
                // No changes made which could affect previous entry, keep going.
                post_ins = true;
                post_del = true;
                equalities.clear();
            } else {
                // Throw away the previous equality.
                equalities.pop();
                pointer = equalities.last().map_or(0, |&idx| idx + 1);
                post_ins = false;
                post_del = false;
                continue;
            }
        }
        pointer += 1;
    }

    if changes {
        cleanup_merge(edits);
    }
}

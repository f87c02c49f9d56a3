//! Building patches from edit scripts and applying them to drifted text.
//!
//! A [Patch] is a fragment of an edit script surrounded by enough unchanged context that it can
//! be relocated with the fuzzy matcher when the text it is applied to has changed since the
//! patch was made.

pub mod text;

use crate::bitap::match_chars;
use crate::config::EngineConfig;
use crate::diff::cleanup::{cleanup_efficiency, cleanup_semantic, cleanup_semantic_lossless};
use crate::diff::{diff_chars, diff_main};
use crate::edit::{levenshtein, source_text, target_text, x_index, Edit, Op};
use crate::text::{clamped, find, rfind};
use log::{debug, trace, warn};
use logging_timer::time;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::mem;

pub use text::{from_text, to_text, ParsePatchError};

/// Tunables for making and applying patches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct PatchConfig {
    /// How closely the contents of a large deletion have to match the located text, where 0.0
    /// requires an exact match and 1.0 accepts anything.
    pub delete_threshold: f64,

    /// The number of characters of context kept on either side of each patch.
    pub margin: usize,
}

impl Default for PatchConfig {
    fn default() -> Self {
        PatchConfig {
            delete_threshold: 0.5,
            margin: 4,
        }
    }
}

/// A relocatable fragment of an edit script.
///
/// `start1`/`length1` span the patch's pre-image in the original text and `start2`/`length2`
/// span its post-image in the new text. Positions and lengths count characters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    pub diffs: Vec<Edit>,
    pub start1: usize,
    pub start2: usize,
    pub length1: usize,
    pub length2: usize,
}

/// The right hand side of a patch computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchSource<'a> {
    /// The new text, which gets diffed against the original
    Text(&'a str),
    /// A precomputed edit script from the original text
    Edits(&'a [Edit]),
}

impl<'a> From<&'a str> for PatchSource<'a> {
    fn from(text: &'a str) -> Self {
        PatchSource::Text(text)
    }
}

impl<'a> From<&'a String> for PatchSource<'a> {
    fn from(text: &'a String) -> Self {
        PatchSource::Text(text)
    }
}

impl<'a> From<&'a [Edit]> for PatchSource<'a> {
    fn from(edits: &'a [Edit]) -> Self {
        PatchSource::Edits(edits)
    }
}

impl<'a> From<&'a Vec<Edit>> for PatchSource<'a> {
    fn from(edits: &'a Vec<Edit>) -> Self {
        PatchSource::Edits(edits)
    }
}

/// Compute the patches that turn `text1` into the given source.
#[time("info", "patch::{}")]
pub fn make(text1: &str, source: PatchSource<'_>, config: &EngineConfig) -> Vec<Patch> {
    match source {
        PatchSource::Text(text2) => make_from_texts(text1, text2, config),
        PatchSource::Edits(edits) => make_from_diffs(text1, edits, config),
    }
}

/// Diff two texts and turn the cleaned up script into patches.
pub fn make_from_texts(text1: &str, text2: &str, config: &EngineConfig) -> Vec<Patch> {
    let mut edits = diff_main(text1, text2, true, &config.diff);
    if edits.len() > 2 {
        cleanup_semantic(&mut edits);
        cleanup_efficiency(&mut edits, config.diff.edit_cost);
    }
    make_from_diffs(text1, &edits, config)
}

/// Turn an edit script into patches, recovering the original text from the script itself.
pub fn make_from_edits(edits: &[Edit], config: &EngineConfig) -> Vec<Patch> {
    make_from_diffs(&source_text(edits), edits, config)
}

/// Turn an edit script computed from `text1` into patches.
///
/// A patch is closed once an equality of at least twice the margin follows it. Each patch gets
/// context from the text as it looks once the preceding patches have been applied, since that
/// is the text it will be applied to.
pub fn make_from_diffs(text1: &str, edits: &[Edit], config: &EngineConfig) -> Vec<Patch> {
    let mut patches = Vec::new();
    if edits.is_empty() {
        return patches;
    }
    let margin = config.patch.margin;
    let max_bits = config.matching.effective_max_bits();

    let mut patch = Patch::default();
    let mut char_count1 = 0;
    let mut char_count2 = 0;
    // The text with all patches so far applied, and the text they were applied to
    let mut prepatch: Vec<char> = text1.chars().collect();
    let mut postpatch = prepatch.clone();

    for (idx, edit) in edits.iter().enumerate() {
        let len = edit.char_len();
        if patch.diffs.is_empty() && edit.op != Op::Equal {
            patch.start1 = char_count1;
            patch.start2 = char_count2;
        }

        match edit.op {
            Op::Insert => {
                patch.diffs.push(edit.clone());
                patch.length2 += len;
                let at = char_count2.min(postpatch.len());
                postpatch.splice(at..at, edit.text.chars());
            }
            Op::Delete => {
                patch.diffs.push(edit.clone());
                patch.length1 += len;
                let end = (char_count2 + len).min(postpatch.len());
                postpatch.drain(char_count2.min(end)..end);
            }
            Op::Equal => {
                if len <= 2 * margin && !patch.diffs.is_empty() && idx + 1 != edits.len() {
                    // Small equality inside a patch
                    patch.diffs.push(edit.clone());
                    patch.length1 += len;
                    patch.length2 += len;
                } else if len >= 2 * margin && !patch.diffs.is_empty() {
                    add_context_chars(&mut patch, &prepatch, margin, max_bits);
                    trace!(
                        "Closing patch at {}, {} edits",
                        patch.start1,
                        patch.diffs.len()
                    );
                    patches.push(mem::take(&mut patch));
                    prepatch.clone_from(&postpatch);
                    char_count1 = char_count2;
                }
            }
        }

        if edit.op != Op::Insert {
            char_count1 += len;
        }
        if edit.op != Op::Delete {
            char_count2 += len;
        }
    }

    if !patch.diffs.is_empty() {
        add_context_chars(&mut patch, &prepatch, margin, max_bits);
        patches.push(patch);
    }
    debug!("Made {} patches from {} edits", patches.len(), edits.len());
    patches
}

/// Grow a patch with context from `text` until its pre-image is unique in the text.
///
/// The pre-image is never grown past what the matcher can search for.
pub fn add_context(patch: &mut Patch, text: &str, config: &EngineConfig) {
    let text: Vec<char> = text.chars().collect();
    add_context_chars(
        patch,
        &text,
        config.patch.margin,
        config.matching.effective_max_bits(),
    );
}

fn add_context_chars(patch: &mut Patch, text: &[char], margin: usize, max_bits: usize) {
    if text.is_empty() {
        return;
    }
    let mut pattern = clamped(text, patch.start2, patch.start2 + patch.length1);
    let mut padding = 0;

    while margin > 0
        && find(text, pattern, 0) != rfind(text, pattern, text.len())
        && pattern.len() + 2 * margin < max_bits
    {
        padding += margin;
        pattern = clamped(
            text,
            patch.start2.saturating_sub(padding),
            patch.start2 + patch.length1 + padding,
        );
    }
    // One more chunk for good luck
    padding += margin;

    let prefix = clamped(text, patch.start2.saturating_sub(padding), patch.start2);
    if !prefix.is_empty() {
        patch.diffs.insert(0, Edit::from_chars(Op::Equal, prefix));
    }
    let suffix_start = patch.start2 + patch.length1;
    let suffix = clamped(text, suffix_start, suffix_start + padding);
    if !suffix.is_empty() {
        patch.diffs.push(Edit::from_chars(Op::Equal, suffix));
    }

    patch.start1 = patch.start1.saturating_sub(prefix.len());
    patch.start2 = patch.start2.saturating_sub(prefix.len());
    patch.length1 += prefix.len() + suffix.len();
    patch.length2 += prefix.len() + suffix.len();
}

/// Pad both ends of a patch sequence with unprintable characters.
///
/// The padding gives patches at the very start or end of a text some context to be matched
/// against. Returns the padding string, which the text the patches are applied to has to be
/// wrapped in.
pub fn add_padding(patches: &mut [Patch], config: &EngineConfig) -> String {
    let padding_len = config.patch.margin;
    let padding: Vec<char> = (1..=padding_len)
        .map(|code| {
            u32::try_from(code)
                .ok()
                .and_then(char::from_u32)
                .unwrap_or(char::REPLACEMENT_CHARACTER)
        })
        .collect();
    let padding_text: String = padding.iter().collect();

    for patch in patches.iter_mut() {
        patch.start1 = patch.start1.saturating_add(padding_len);
        patch.start2 = patch.start2.saturating_add(padding_len);
    }

    if let Some(first) = patches.first_mut() {
        match first.diffs.first_mut() {
            Some(edit) if edit.op == Op::Equal => {
                let len = edit.char_len();
                if padding_len > len {
                    // Grow the first equality
                    let extra = padding_len - len;
                    let mut text: String = padding[len..].iter().collect();
                    text.push_str(&edit.text);
                    edit.text = text;
                    first.start1 -= extra;
                    first.start2 -= extra;
                    first.length1 += extra;
                    first.length2 += extra;
                }
            }
            _ => {
                first.diffs.insert(0, Edit::equal(padding_text.clone()));
                first.start1 -= padding_len;
                first.start2 -= padding_len;
                first.length1 += padding_len;
                first.length2 += padding_len;
            }
        }
    }

    if let Some(last) = patches.last_mut() {
        match last.diffs.last_mut() {
            Some(edit) if edit.op == Op::Equal => {
                let len = edit.char_len();
                if padding_len > len {
                    let extra = padding_len - len;
                    edit.text.extend(&padding[..extra]);
                    last.length1 += extra;
                    last.length2 += extra;
                }
            }
            _ => {
                last.diffs.push(Edit::equal(padding_text.clone()));
                last.length1 += padding_len;
                last.length2 += padding_len;
            }
        }
    }

    padding_text
}

/// Break up patches whose pre-image is too long for the matcher to locate.
pub fn split_max(patches: &mut Vec<Patch>, config: &EngineConfig) {
    let patch_size = config.matching.effective_max_bits();
    let margin = config.patch.margin;
    if patch_size <= 2 * margin {
        warn!(
            "Cannot split patches into pieces of {patch_size} characters with a margin of {margin}"
        );
        return;
    }

    let mut split = Vec::with_capacity(patches.len());
    for big in patches.drain(..) {
        if big.length1 <= patch_size {
            split.push(big);
            continue;
        }
        trace!(
            "Splitting patch at {} with a pre-image of {} characters",
            big.start1,
            big.length1
        );

        let mut start1 = big.start1;
        let mut start2 = big.start2;
        let mut precontext: Vec<char> = Vec::new();
        let mut remaining: VecDeque<Edit> = big.diffs.into();

        while !remaining.is_empty() {
            let mut patch = Patch {
                start1: start1.saturating_sub(precontext.len()),
                start2: start2.saturating_sub(precontext.len()),
                ..Default::default()
            };
            let mut empty = true;
            if !precontext.is_empty() {
                patch.length1 = precontext.len();
                patch.length2 = precontext.len();
                patch.diffs.push(Edit::from_chars(Op::Equal, &precontext));
            }

            while patch.length1 < patch_size - margin {
                let Some(front) = remaining.front_mut() else {
                    break;
                };
                let op = front.op;
                let len = front.char_len();
                let lone_big_delete = op == Op::Delete
                    && patch.diffs.len() == 1
                    && patch.diffs[0].op == Op::Equal
                    && len > 2 * patch_size;

                if op == Op::Insert {
                    // Insertions are harmless
                    patch.length2 += len;
                    start2 += len;
                    patch.diffs.extend(remaining.pop_front());
                    empty = false;
                } else if lone_big_delete {
                    // This is a large deletion, let it pass in one chunk
                    patch.length1 += len;
                    start1 += len;
                    patch.diffs.extend(remaining.pop_front());
                    empty = false;
                } else {
                    // Deletion or equality, only take as much as we can stomach
                    let chars: Vec<char> = front.text.chars().collect();
                    let take = (patch_size - patch.length1 - margin).min(chars.len());
                    patch.length1 += take;
                    start1 += take;
                    if op == Op::Equal {
                        patch.length2 += take;
                        start2 += take;
                    } else {
                        empty = false;
                    }
                    patch.diffs.push(Edit::from_chars(op, &chars[..take]));
                    if take == chars.len() {
                        remaining.pop_front();
                    } else {
                        front.text = chars[take..].iter().collect();
                    }
                }
            }

            // Compute the head context for the next patch
            let post_image: Vec<char> = target_text(&patch.diffs).chars().collect();
            precontext = post_image[post_image.len().saturating_sub(margin)..].to_vec();

            // Append the end context for this patch
            let postcontext: String = remaining
                .iter()
                .filter(|edit| edit.op != Op::Insert)
                .flat_map(|edit| edit.text.chars())
                .take(margin)
                .collect();
            if !postcontext.is_empty() {
                let len = postcontext.chars().count();
                patch.length1 += len;
                patch.length2 += len;
                match patch.diffs.last_mut() {
                    Some(last) if last.op == Op::Equal => last.text.push_str(&postcontext),
                    _ => patch.diffs.push(Edit::equal(postcontext)),
                }
            }

            if !empty {
                split.push(patch);
            }
        }
    }
    *patches = split;
}

/// Locate a pre-image in the text, treating a pattern the matcher rejects as not found.
fn locate(text: &[char], pattern: &[char], loc: usize, config: &EngineConfig) -> Option<usize> {
    match match_chars(text, pattern, loc, &config.matching) {
        Ok(found) => found.map(|found| found.min(text.len())),
        Err(e) => {
            warn!("Unable to search for patch: {e}");
            None
        }
    }
}

/// Apply patches to a text.
///
/// Each patch is relocated with the fuzzy matcher, so the text does not have to be exactly the
/// one the patches were made from. Returns the patched text and whether each patch applied. The
/// success vector has one entry per patch after oversized patches have been split.
#[time("info", "patch::{}")]
pub fn apply(patches: &[Patch], text: &str, config: &EngineConfig) -> (String, Vec<bool>) {
    if patches.is_empty() {
        return (text.to_string(), Vec::new());
    }

    let mut patches = patches.to_vec();
    let padding: Vec<char> = add_padding(&mut patches, config).chars().collect();
    let mut text: Vec<char> = padding
        .iter()
        .copied()
        .chain(text.chars())
        .chain(padding.iter().copied())
        .collect();
    split_max(&mut patches, config);

    let max_bits = config.matching.effective_max_bits();
    // The offset between where patches expected to be and where they were found
    let mut delta: isize = 0;
    let mut results = Vec::with_capacity(patches.len());

    for (idx, patch) in patches.iter().enumerate() {
        let expected_loc = isize::try_from(patch.start2)
            .unwrap_or(isize::MAX)
            .saturating_add(delta)
            .max(0) as usize;
        let text1: Vec<char> = source_text(&patch.diffs).chars().collect();
        let mut end_loc = None;

        let start_loc = if text1.len() > max_bits {
            // split_max only leaves oversized pre-images for monster deletes, match the
            // head and tail separately
            let head = locate(&text, &text1[..max_bits], expected_loc, config);
            let tail_loc = expected_loc.saturating_add(text1.len() - max_bits);
            match head {
                Some(head) => {
                    match locate(&text, &text1[text1.len() - max_bits..], tail_loc, config) {
                        Some(tail) if head < tail => {
                            end_loc = Some(tail);
                            Some(head)
                        }
                        _ => None,
                    }
                }
                None => None,
            }
        } else {
            locate(&text, &text1, expected_loc, config)
        };

        let Some(start_loc) = start_loc else {
            debug!("Patch {idx} could not be located near {expected_loc}");
            results.push(false);
            // Subtract the delta for this failed patch from subsequent patches
            delta -= patch.length2 as isize - patch.length1 as isize;
            continue;
        };
        trace!("Patch {idx} located at {start_loc}, expected at {expected_loc}");
        delta = start_loc as isize - expected_loc as isize;

        let text2 = match end_loc {
            Some(end_loc) => clamped(&text, start_loc, end_loc + max_bits),
            None => clamped(&text, start_loc, start_loc + text1.len()),
        }
        .to_vec();

        if text1 == text2 {
            // Perfect match, just shove the replacement text in
            let end = (start_loc + text1.len()).min(text.len());
            text.splice(start_loc..end, target_text(&patch.diffs).chars());
            results.push(true);
            continue;
        }

        // Imperfect match, run a diff to get a framework of equivalent indices
        let mut diffs = diff_chars(&text1, &text2, false, &config.diff);
        if text1.len() > max_bits
            && levenshtein(&diffs) as f64 / text1.len() as f64 > config.patch.delete_threshold
        {
            debug!("Patch {idx} matched too loosely to apply");
            results.push(false);
            continue;
        }

        cleanup_semantic_lossless(&mut diffs);
        let mut index1 = 0;
        for edit in &patch.diffs {
            let len = edit.char_len();
            match edit.op {
                Op::Insert => {
                    let at = (start_loc + x_index(&diffs, index1)).min(text.len());
                    text.splice(at..at, edit.text.chars());
                }
                Op::Delete => {
                    let start = (start_loc + x_index(&diffs, index1)).min(text.len());
                    let end = (start_loc + x_index(&diffs, index1 + len)).clamp(start, text.len());
                    text.drain(start..end);
                }
                Op::Equal => {}
            }
            if edit.op != Op::Delete {
                index1 += len;
            }
        }
        results.push(true);
    }

    // Strip the padding off
    let start = padding.len().min(text.len());
    let end = text.len().saturating_sub(padding.len()).max(start);
    (text[start..end].iter().collect(), results)
}

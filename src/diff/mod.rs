//! The diff engine.
//!
//! Computes an edit script between two texts. Trivial cases are handled up front, then the engine
//! tries progressively more expensive strategies: substring containment, the half-match
//! heuristic, line mode for large inputs and finally Myers' bisection, which yields a minimal
//! script.

pub mod cleanup;
pub mod lines;

use crate::edit::{Edit, Op};
use crate::neg_idx_vec::NegIdxVec;
use crate::text::{common_prefix, common_suffix, find};
use log::{debug, trace};
use logging_timer::time;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Tunables for the diff engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct DiffConfig {
    /// The wall clock budget for a diff, in seconds.
    ///
    /// A value of zero or less removes the time bound and disables the half-match heuristic, so
    /// the diff is always minimal.
    pub timeout: f64,

    /// The cost of an empty edit operation in terms of edit characters, used by the efficiency
    /// cleanup.
    pub edit_cost: usize,
}

impl Default for DiffConfig {
    fn default() -> Self {
        DiffConfig {
            timeout: 1.0,
            edit_cost: 4,
        }
    }
}

/// The point in time after which the diff engine gives up on finding a minimal script.
///
/// Every recursive step of a single diff shares the same deadline, so the time budget bounds
/// the whole computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// A deadline that never expires.
    #[must_use]
    pub fn never() -> Self {
        Deadline(None)
    }

    #[must_use]
    pub fn at(instant: Instant) -> Self {
        Deadline(Some(instant))
    }

    /// Create a deadline `timeout` seconds from now.
    ///
    /// Non-positive or unrepresentable timeouts yield a deadline that never expires.
    #[must_use]
    pub fn from_timeout(timeout: f64) -> Self {
        if timeout <= 0.0 {
            return Self::never();
        }
        Duration::try_from_secs_f64(timeout)
            .ok()
            .and_then(|budget| Instant::now().checked_add(budget))
            .map_or_else(Self::never, Self::at)
    }

    /// Whether the deadline has passed.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.0.is_some_and(|instant| Instant::now() > instant)
    }
}

/// The result of a successful half-match: the two texts split around a long shared substring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HalfMatch<'a> {
    /// The prefix of text1
    pub text1_a: &'a [char],
    /// The suffix of text1
    pub text1_b: &'a [char],
    /// The prefix of text2
    pub text2_a: &'a [char],
    /// The suffix of text2
    pub text2_b: &'a [char],
    /// The substring shared by both texts
    pub common: &'a [char],
}

/// A diff computation in progress.
///
/// This carries the configuration and the deadline through the recursive divide and conquer
/// steps of the engine.
#[derive(Debug, Clone, Copy)]
pub struct Differ<'c> {
    config: &'c DiffConfig,
    deadline: Deadline,
}

impl<'c> Differ<'c> {
    pub fn new(config: &'c DiffConfig, deadline: Deadline) -> Self {
        Differ { config, deadline }
    }

    /// Find the differences between two texts.
    ///
    /// The common prefix and suffix are stripped before the middle is handed to
    /// [compute](Self::compute), and the resulting script is normalized with
    /// [cleanup_merge](cleanup::cleanup_merge).
    pub fn main(&self, text1: &[char], text2: &[char], checklines: bool) -> Vec<Edit> {
        if text1 == text2 {
            if text1.is_empty() {
                return Vec::new();
            }
            return vec![Edit::from_chars(Op::Equal, text1)];
        }

        let prefix_len = common_prefix(text1, text2);
        let prefix = &text1[..prefix_len];
        let (text1, text2) = (&text1[prefix_len..], &text2[prefix_len..]);

        let suffix_len = common_suffix(text1, text2);
        let suffix = &text1[text1.len() - suffix_len..];
        let (text1, text2) = (
            &text1[..text1.len() - suffix_len],
            &text2[..text2.len() - suffix_len],
        );

        let mut edits = Vec::new();
        if !prefix.is_empty() {
            edits.push(Edit::from_chars(Op::Equal, prefix));
        }
        edits.extend(self.compute(text1, text2, checklines));
        if !suffix.is_empty() {
            edits.push(Edit::from_chars(Op::Equal, suffix));
        }
        cleanup::cleanup_merge(&mut edits);
        edits
    }

    /// Find the differences between two texts that share no common prefix or suffix.
    pub fn compute(&self, text1: &[char], text2: &[char], checklines: bool) -> Vec<Edit> {
        if text1.is_empty() {
            return vec![Edit::from_chars(Op::Insert, text2)];
        }
        if text2.is_empty() {
            return vec![Edit::from_chars(Op::Delete, text1)];
        }

        let text1_longer = text1.len() > text2.len();
        let (long_text, short_text) = if text1_longer {
            (text1, text2)
        } else {
            (text2, text1)
        };

        if let Some(idx) = find(long_text, short_text, 0) {
            // The shorter text is inside the longer one
            let op = if text1_longer { Op::Delete } else { Op::Insert };
            return vec![
                Edit::from_chars(op, &long_text[..idx]),
                Edit::from_chars(Op::Equal, short_text),
                Edit::from_chars(op, &long_text[idx + short_text.len()..]),
            ];
        }

        if short_text.len() == 1 {
            // A single character that isn't contained in the other text can't be an equality.
            return vec![
                Edit::from_chars(Op::Delete, text1),
                Edit::from_chars(Op::Insert, text2),
            ];
        }

        if let Some(hm) = self.half_match(text1, text2) {
            debug!("Half-match found with a {} char common middle", hm.common.len());
            let mut edits = self.main(hm.text1_a, hm.text2_a, checklines);
            edits.push(Edit::from_chars(Op::Equal, hm.common));
            edits.extend(self.main(hm.text1_b, hm.text2_b, checklines));
            return edits;
        }

        if checklines && text1.len() > 100 && text2.len() > 100 {
            return self.line_mode(text1, text2);
        }

        self.bisect(text1, text2)
    }

    /// Check whether the two texts share a substring that is at least half the length of the
    /// longer text.
    ///
    /// This speedup can produce non-minimal diffs, so it is skipped when there is no time
    /// budget.
    pub fn half_match<'t>(&self, text1: &'t [char], text2: &'t [char]) -> Option<HalfMatch<'t>> {
        if self.config.timeout <= 0.0 {
            return None;
        }
        let text1_longer = text1.len() > text2.len();
        let (long_text, short_text) = if text1_longer {
            (text1, text2)
        } else {
            (text2, text1)
        };
        if long_text.len() < 4 || short_text.len() * 2 < long_text.len() {
            return None;
        }

        // Seed from the second quarter, then from the third quarter.
        let hm1 = half_match_at(long_text, short_text, long_text.len().div_ceil(4));
        let hm2 = half_match_at(long_text, short_text, long_text.len().div_ceil(2));
        let hm = match (hm1, hm2) {
            (None, None) => return None,
            (Some(hm), None) | (None, Some(hm)) => hm,
            (Some(hm1), Some(hm2)) => {
                if hm1.common.len() > hm2.common.len() {
                    hm1
                } else {
                    hm2
                }
            }
        };

        // Results are expressed in terms of (long, short), so swap back if needed.
        if text1_longer {
            Some(hm)
        } else {
            Some(HalfMatch {
                text1_a: hm.text2_a,
                text1_b: hm.text2_b,
                text2_a: hm.text1_a,
                text2_b: hm.text1_b,
                common: hm.common,
            })
        }
    }

    /// Diff two multi-line texts line by line, then refine the changed regions character by
    /// character.
    pub fn line_mode(&self, text1: &[char], text2: &[char]) -> Vec<Edit> {
        let (chars1, chars2, arena) = lines::lines_to_chars(text1, text2);
        debug!(
            "Using line mode with {} unique lines ({} and {} lines per side)",
            arena.len(),
            chars1.len(),
            chars2.len()
        );

        let mut line_edits = self.main(&chars1, &chars2, false);
        arena.chars_to_lines(&mut line_edits);
        cleanup::cleanup_semantic(&mut line_edits);

        // Re-diff every replacement block character by character.
        let mut edits = Vec::with_capacity(line_edits.len());
        let mut pending: Vec<Edit> = Vec::new();
        let mut text_delete = String::new();
        let mut text_insert = String::new();
        let flush = |edits: &mut Vec<Edit>,
                         pending: &mut Vec<Edit>,
                         text_delete: &mut String,
                         text_insert: &mut String| {
            if !text_delete.is_empty() && !text_insert.is_empty() {
                let deleted: Vec<char> = text_delete.chars().collect();
                let inserted: Vec<char> = text_insert.chars().collect();
                edits.extend(self.main(&deleted, &inserted, false));
                pending.clear();
            } else {
                edits.append(pending);
            }
            text_delete.clear();
            text_insert.clear();
        };

        for edit in line_edits {
            match edit.op {
                Op::Delete => {
                    text_delete.push_str(&edit.text);
                    pending.push(edit);
                }
                Op::Insert => {
                    text_insert.push_str(&edit.text);
                    pending.push(edit);
                }
                Op::Equal => {
                    flush(&mut edits, &mut pending, &mut text_delete, &mut text_insert);
                    edits.push(edit);
                }
            }
        }
        flush(&mut edits, &mut pending, &mut text_delete, &mut text_insert);
        edits
    }

    /// Find the middle snake of a diff, split the problem in two and return the recursively
    /// constructed diff.
    ///
    /// See Myers' 1986 paper "An O(ND) Difference Algorithm and Its Variations". If the deadline
    /// passes before the frontiers meet, this gives up and returns a script that deletes all of
    /// text1 and inserts all of text2.
    pub fn bisect(&self, text1: &[char], text2: &[char]) -> Vec<Edit> {
        let len1 = text1.len() as isize;
        let len2 = text2.len() as isize;
        let max_d = (len1 + len2 + 1) / 2;
        let radius = max_d as usize + 1;

        let mut v1: NegIdxVec<isize> = NegIdxVec::new(radius, || -1);
        let mut v2: NegIdxVec<isize> = NegIdxVec::new(radius, || -1);
        v1[1] = 0;
        v2[1] = 0;

        let delta = len1 - len2;
        // If the total number of characters is odd, the front path collides with the reverse
        // path.
        let front = delta % 2 != 0;
        // Offsets for the start and end of the k loops, which prevent mapping space beyond the
        // grid.
        let mut k1_start = 0;
        let mut k1_end = 0;
        let mut k2_start = 0;
        let mut k2_end = 0;

        for d in 0..max_d {
            if self.deadline.expired() {
                debug!("Diff deadline expired during bisection at d = {d}");
                break;
            }

            // Walk the front path one step.
            let mut k1 = -d + k1_start;
            while k1 <= d - k1_end {
                let mut x1 = if k1 == -d || (k1 != d && v1[k1 - 1] < v1[k1 + 1]) {
                    v1[k1 + 1]
                } else {
                    v1[k1 - 1] + 1
                };
                let mut y1 = x1 - k1;
                while x1 < len1
                    && y1 >= 0
                    && y1 < len2
                    && text1[x1 as usize] == text2[y1 as usize]
                {
                    x1 += 1;
                    y1 += 1;
                }
                v1[k1] = x1;
                if x1 > len1 {
                    // Ran off the right of the graph.
                    k1_end += 2;
                } else if y1 > len2 {
                    // Ran off the bottom of the graph.
                    k1_start += 2;
                } else if front {
                    if let Some(x2) = frontier(&v2, delta - k1, max_d) {
                        // Mirror x2 onto the top-left coordinate system.
                        let x2 = len1 - x2;
                        if x1 >= x2 {
                            return self.bisect_split(text1, text2, x1 as usize, y1 as usize);
                        }
                    }
                }
                k1 += 2;
            }

            // Walk the reverse path one step.
            let mut k2 = -d + k2_start;
            while k2 <= d - k2_end {
                let mut x2 = if k2 == -d || (k2 != d && v2[k2 - 1] < v2[k2 + 1]) {
                    v2[k2 + 1]
                } else {
                    v2[k2 - 1] + 1
                };
                let mut y2 = x2 - k2;
                while x2 < len1
                    && y2 >= 0
                    && y2 < len2
                    && text1[(len1 - x2 - 1) as usize] == text2[(len2 - y2 - 1) as usize]
                {
                    x2 += 1;
                    y2 += 1;
                }
                v2[k2] = x2;
                if x2 > len1 {
                    // Ran off the left of the graph.
                    k2_end += 2;
                } else if y2 > len2 {
                    // Ran off the top of the graph.
                    k2_start += 2;
                } else if !front {
                    let k1 = delta - k2;
                    if let Some(x1) = frontier(&v1, k1, max_d) {
                        let y1 = x1 - k1;
                        let x2 = len1 - x2;
                        if x1 >= x2 {
                            return self.bisect_split(text1, text2, x1 as usize, y1 as usize);
                        }
                    }
                }
                k2 += 2;
            }
        }

        // The deadline passed or the number of diffs equals the number of characters, so no
        // commonality at all.
        vec![
            Edit::from_chars(Op::Delete, text1),
            Edit::from_chars(Op::Insert, text2),
        ]
    }

    /// Split two texts at the middle snake found by [bisect](Self::bisect) and diff both halves.
    fn bisect_split(&self, text1: &[char], text2: &[char], x: usize, y: usize) -> Vec<Edit> {
        trace!("Bisection split at ({x}, {y})");
        let mut edits = self.main(&text1[..x], &text2[..y], false);
        edits.extend(self.main(&text1[x..], &text2[y..], false));
        edits
    }
}

/// Read the furthest reaching x value on diagonal `k` of a frontier, if that diagonal has been
/// reached.
fn frontier(v: &NegIdxVec<isize>, k: isize, max_d: isize) -> Option<isize> {
    if k < -max_d || k >= max_d {
        return None;
    }
    v.get(k).copied().filter(|&x| x != -1)
}

/// Check whether a substring of `short_text` exists within `long_text` such that the substring
/// is at least half the length of `long_text`.
///
/// The seed is a quarter-length substring of `long_text` starting at `idx`.
fn half_match_at<'t>(
    long_text: &'t [char],
    short_text: &'t [char],
    idx: usize,
) -> Option<HalfMatch<'t>> {
    let seed = &long_text[idx..idx + long_text.len() / 4];
    let mut best: Option<HalfMatch<'t>> = None;
    let mut best_len = 0;

    let mut from = 0;
    while let Some(j) = find(short_text, seed, from) {
        let prefix_len = common_prefix(&long_text[idx..], &short_text[j..]);
        let suffix_len = common_suffix(&long_text[..idx], &short_text[..j]);
        if best_len < suffix_len + prefix_len {
            best_len = suffix_len + prefix_len;
            best = Some(HalfMatch {
                text1_a: &long_text[..idx - suffix_len],
                text1_b: &long_text[idx + prefix_len..],
                text2_a: &short_text[..j - suffix_len],
                text2_b: &short_text[j + prefix_len..],
                common: &short_text[j - suffix_len..j + prefix_len],
            });
        }
        from = j + 1;
    }

    best.filter(|hm| hm.common.len() * 2 >= long_text.len())
}

/// Compute the edit script between two texts.
///
/// When `checklines` is set, large inputs are first diffed line by line for speed, which can
/// produce a slightly less minimal script.
#[time("info", "diff::{}")]
pub fn diff_main(text1: &str, text2: &str, checklines: bool, config: &DiffConfig) -> Vec<Edit> {
    let text1: Vec<char> = text1.chars().collect();
    let text2: Vec<char> = text2.chars().collect();
    diff_chars(&text1, &text2, checklines, config)
}

/// Compute the edit script between two texts that have already been split into characters.
pub(crate) fn diff_chars(
    text1: &[char],
    text2: &[char],
    checklines: bool,
    config: &DiffConfig,
) -> Vec<Edit> {
    let deadline = Deadline::from_timeout(config.timeout);
    Differ::new(config, deadline).main(text1, text2, checklines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::{source_text, target_text};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn untimed() -> DiffConfig {
        DiffConfig {
            timeout: 0.0,
            ..Default::default()
        }
    }

    fn half_match_strs(text1: &str, text2: &str, config: &DiffConfig) -> Option<Vec<String>> {
        let (text1, text2) = (chars(text1), chars(text2));
        let differ = Differ::new(config, Deadline::never());
        differ.half_match(&text1, &text2).map(|hm| {
            [hm.text1_a, hm.text1_b, hm.text2_a, hm.text2_b, hm.common]
                .iter()
                .map(|part| part.iter().collect())
                .collect()
        })
    }

    #[rstest]
    #[case("1234567890", "abcdef")]
    #[case("12345", "23")]
    fn test_half_match_none(#[case] text1: &str, #[case] text2: &str) {
        assert_eq!(half_match_strs(text1, text2, &DiffConfig::default()), None);
    }

    #[rstest]
    #[case("1234567890", "a345678z", ["12", "90", "a", "z", "345678"])]
    #[case("a345678z", "1234567890", ["a", "z", "12", "90", "345678"])]
    #[case("abc56789z", "1234567890", ["abc", "z", "1234", "0", "56789"])]
    #[case("a23456xyz", "1234567890", ["a", "xyz", "1", "7890", "23456"])]
    #[case("121231234123451234123121", "a1234123451234z", ["12123", "123121", "a", "z", "1234123451234"])]
    #[case("x-=-=-=-=-=-=-=-=-=-=-=-=", "xx-=-=-=-=-=-=-=", ["", "-=-=-=-=-=", "x", "", "x-=-=-=-=-=-=-="])]
    #[case("-=-=-=-=-=-=-=-=-=-=-=-=y", "-=-=-=-=-=-=-=yy", ["-=-=-=-=-=", "", "", "y", "-=-=-=-=-=-=-=y"])]
    // Non-optimal half-match; optimal would be -q+x=H-i+e=lloHe+Hu=llo-Hew+y
    #[case("qHilloHelloHew", "xHelloHeHulloy", ["qHillo", "w", "x", "Hulloy", "HelloHe"])]
    fn test_half_match(#[case] text1: &str, #[case] text2: &str, #[case] expected: [&str; 5]) {
        let expected: Vec<String> = expected.iter().map(ToString::to_string).collect();
        assert_eq!(
            half_match_strs(text1, text2, &DiffConfig::default()),
            Some(expected)
        );
    }

    #[test]
    fn test_half_match_disabled_without_timeout() {
        assert_eq!(half_match_strs("qHilloHelloHew", "xHelloHeHulloy", &untimed()), None);
    }

    #[test]
    fn test_bisect() {
        let (a, b) = (chars("cat"), chars("map"));
        let config = DiffConfig::default();
        let edits = Differ::new(&config, Deadline::never()).bisect(&a, &b);
        assert_eq!(
            edits,
            vec![
                Edit::delete("c"),
                Edit::insert("m"),
                Edit::equal("a"),
                Edit::delete("t"),
                Edit::insert("p"),
            ]
        );
    }

    #[test]
    fn test_bisect_timeout() {
        let (a, b) = (chars("cat"), chars("map"));
        let config = DiffConfig::default();
        let edits = Differ::new(&config, Deadline::at(Instant::now())).bisect(&a, &b);
        assert_eq!(edits, vec![Edit::delete("cat"), Edit::insert("map")]);
    }

    #[rstest]
    #[case("", "", vec![])]
    #[case("abc", "abc", vec![Edit::equal("abc")])]
    #[case("abc", "ab123c", vec![Edit::equal("ab"), Edit::insert("123"), Edit::equal("c")])]
    #[case("a123bc", "abc", vec![Edit::equal("a"), Edit::delete("123"), Edit::equal("bc")])]
    #[case("abc", "a123b456c", vec![
        Edit::equal("a"), Edit::insert("123"), Edit::equal("b"), Edit::insert("456"), Edit::equal("c"),
    ])]
    #[case("a123b456c", "abc", vec![
        Edit::equal("a"), Edit::delete("123"), Edit::equal("b"), Edit::delete("456"), Edit::equal("c"),
    ])]
    #[case("", "hello", vec![Edit::insert("hello")])]
    #[case("hello", "", vec![Edit::delete("hello")])]
    fn test_diff_main_trivial(#[case] a: &str, #[case] b: &str, #[case] expected: Vec<Edit>) {
        assert_eq!(diff_main(a, b, false, &DiffConfig::default()), expected);
    }

    #[rstest]
    #[case("a", "b", vec![Edit::delete("a"), Edit::insert("b")])]
    #[case("Apples are a fruit.", "Bananas are also fruit.", vec![
        Edit::delete("Apple"), Edit::insert("Banana"), Edit::equal("s are a"),
        Edit::insert("lso"), Edit::equal(" fruit."),
    ])]
    #[case("ax\t", "\u{0680}x\u{0000}", vec![
        Edit::delete("a"), Edit::insert("\u{0680}"), Edit::equal("x"),
        Edit::delete("\t"), Edit::insert("\u{0000}"),
    ])]
    #[case("1ayb2", "abxab", vec![
        Edit::delete("1"), Edit::equal("a"), Edit::delete("y"), Edit::equal("b"),
        Edit::delete("2"), Edit::insert("xab"),
    ])]
    #[case("abcy", "xaxcxabc", vec![
        Edit::insert("xaxcx"), Edit::equal("abc"), Edit::delete("y"),
    ])]
    #[case("ABCDa=bcd=efghijklmnopqrsEFGHIJKLMNOefg", "a-bcd-efghijklmnopqrs", vec![
        Edit::delete("ABCD"), Edit::equal("a"), Edit::delete("="), Edit::insert("-"),
        Edit::equal("bcd"), Edit::delete("="), Edit::insert("-"),
        Edit::equal("efghijklmnopqrs"), Edit::delete("EFGHIJKLMNOefg"),
    ])]
    #[case("a [[Pennsylvania]] and [[New", " and [[Pennsylvania]]", vec![
        Edit::insert(" "), Edit::equal("a"), Edit::insert("nd"),
        Edit::equal(" [[Pennsylvania]]"), Edit::delete(" and [[New"),
    ])]
    fn test_diff_main_real(#[case] a: &str, #[case] b: &str, #[case] expected: Vec<Edit>) {
        assert_eq!(diff_main(a, b, false, &untimed()), expected);
    }

    #[test]
    fn test_diff_without_cleanup_keeps_single_char_equalities() {
        assert_eq!(
            diff_main(
                "The quick brown fox",
                "The quick red fox",
                true,
                &DiffConfig::default()
            ),
            vec![
                Edit::equal("The quick "),
                Edit::delete("b"),
                Edit::equal("r"),
                Edit::delete("own"),
                Edit::insert("ed"),
                Edit::equal(" fox"),
            ]
        );
    }

    #[rstest]
    #[case("1234567890\n".repeat(13), "abcdefghij\n".repeat(13))]
    #[case("1234567890".repeat(13), "abcdefghij".repeat(13))]
    fn test_line_mode_matches_char_mode(#[case] a: String, #[case] b: String) {
        let config = untimed();
        assert_eq!(
            diff_main(&a, &b, true, &config),
            diff_main(&a, &b, false, &config)
        );
    }

    #[test]
    fn test_line_mode_overlap_rebuilds_texts() {
        let a = "1234567890\n".repeat(13);
        let b = "abcdefghij\n1234567890\n1234567890\n1234567890\nabcdefghij\n\
                 1234567890\n1234567890\n1234567890\nabcdefghij\n\
                 1234567890\n1234567890\n1234567890\nabcdefghij\n";
        let config = untimed();

        let with_lines = diff_main(&a, b, true, &config);
        let without_lines = diff_main(&a, b, false, &config);
        assert_eq!(source_text(&with_lines), source_text(&without_lines));
        assert_eq!(target_text(&with_lines), target_text(&without_lines));
        assert_eq!(target_text(&with_lines), b);
    }

    #[test]
    fn test_deadline() {
        assert!(!Deadline::never().expired());
        assert!(!Deadline::from_timeout(0.0).expired());
        assert!(!Deadline::from_timeout(-1.0).expired());
        assert!(!Deadline::from_timeout(f64::INFINITY).expired());
        assert!(!Deadline::from_timeout(60.0).expired());
    }
}

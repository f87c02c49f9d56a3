//! Fuzzy matching with the bitap algorithm.
//!
//! [match_main] finds the best location of a pattern in a text near an expected location,
//! tolerating errors in the pattern. Candidates are scored by how many errors they need and how
//! far away they are from the expected location.

use crate::text::{find, rfind};
use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The width of the bit-parallel state word.
const WORD_BITS: usize = u64::BITS as usize;

/// Tunables for the fuzzy matcher
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct MatchConfig {
    /// The highest score accepted for a match, where 0.0 is a perfect match and 1.0 accepts
    /// anything.
    pub threshold: f64,

    /// How far a match can stray from the expected location before it is rejected.
    ///
    /// A match this many characters away from the expected location adds 1.0 to its score. Zero
    /// requires the match to be at the exact location.
    pub distance: usize,

    /// The longest pattern the matcher accepts.
    ///
    /// Capped at 64, the width of the state word. Zero uses the full width.
    pub max_bits: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            threshold: 0.5,
            distance: 1000,
            max_bits: 32,
        }
    }
}

impl MatchConfig {
    /// The pattern length limit actually enforced by the matcher.
    #[must_use]
    pub fn effective_max_bits(&self) -> usize {
        if self.max_bits == 0 || self.max_bits > WORD_BITS {
            WORD_BITS
        } else {
            self.max_bits
        }
    }
}

/// Errors that can arise when searching for a pattern
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("Pattern of length {len} is longer than the matcher's limit of {max} characters")]
    PatternTooLong { len: usize, max: usize },
}

/// Locate the best instance of `pattern` in `text` near `loc`.
///
/// Returns [None] if no match scores within the configured threshold. `loc` is clamped to the
/// length of the text.
pub fn match_main(
    text: &str,
    pattern: &str,
    loc: usize,
    config: &MatchConfig,
) -> Result<Option<usize>, MatchError> {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    match_chars(&text, &pattern, loc, config)
}

/// [match_main] over texts that have already been split into characters.
pub(crate) fn match_chars(
    text: &[char],
    pattern: &[char],
    loc: usize,
    config: &MatchConfig,
) -> Result<Option<usize>, MatchError> {
    let loc = loc.min(text.len());
    if text == pattern {
        // Shortcut (potentially not guaranteed by the algorithm)
        return Ok(Some(0));
    }
    if text.is_empty() {
        return Ok(None);
    }
    if text.get(loc..loc + pattern.len()) == Some(pattern) {
        // Perfect match at the perfect spot
        return Ok(Some(loc));
    }
    bitap(text, pattern, loc, config)
}

/// Initialise the alphabet for the bitap algorithm.
///
/// Each character of the pattern maps to a mask with bit `len - 1 - i` set for every position
/// `i` where the character occurs.
pub fn alphabet(pattern: &[char]) -> HashMap<char, u64> {
    let mut masks = HashMap::new();
    for (i, &c) in pattern.iter().enumerate() {
        let bit = pattern.len() - i - 1;
        if bit < WORD_BITS {
            *masks.entry(c).or_insert(0) |= 1u64 << bit;
        }
    }
    masks
}

/// Scores candidate locations for a single search.
struct Scorer<'c> {
    pattern_len: usize,
    loc: usize,
    config: &'c MatchConfig,
}

impl Scorer<'_> {
    /// Compute the score for a match with `errors` errors at location `x`.
    fn score(&self, errors: usize, x: usize) -> f64 {
        let accuracy = errors as f64 / self.pattern_len as f64;
        let proximity = self.loc.abs_diff(x);
        if self.config.distance == 0 {
            // Dodge divide by zero
            return if proximity == 0 { accuracy } else { 1.0 };
        }
        accuracy + proximity as f64 / self.config.distance as f64
    }
}

/// Locate the best instance of `pattern` in `text` near `loc` using the bitap algorithm.
///
/// This is the slow path of [match_main]; it is exposed so the scoring can be tested directly.
pub fn bitap(
    text: &[char],
    pattern: &[char],
    loc: usize,
    config: &MatchConfig,
) -> Result<Option<usize>, MatchError> {
    let max = config.effective_max_bits();
    if pattern.len() > max {
        return Err(MatchError::PatternTooLong {
            len: pattern.len(),
            max,
        });
    }
    if pattern.is_empty() {
        return Ok(Some(loc.min(text.len())));
    }

    let masks = alphabet(pattern);
    let scorer = Scorer {
        pattern_len: pattern.len(),
        loc,
        config,
    };

    // Highest score beyond which we give up.
    let mut score_threshold = config.threshold;
    // Is there a nearby exact match? (speedup)
    if let Some(exact) = find(text, pattern, loc) {
        score_threshold = score_threshold.min(scorer.score(0, exact));
        // What about in the other direction? (speedup)
        if let Some(exact) = rfind(text, pattern, loc + pattern.len()) {
            score_threshold = score_threshold.min(scorer.score(0, exact));
        }
    }

    let match_mask = 1u64 << (pattern.len() - 1);
    let mut best_loc = None;
    let mut bin_max = pattern.len() + text.len();
    let mut last_rd: Vec<u64> = Vec::new();

    for d in 0..pattern.len() {
        // Scan for the best match; each iteration allows for one more error. Run a binary search
        // to determine how far from `loc` we can stray at this error level.
        let mut bin_min = 0;
        let mut bin_mid = bin_max;
        while bin_min < bin_mid {
            if scorer.score(d, loc + bin_mid) <= score_threshold {
                bin_min = bin_mid;
            } else {
                bin_max = bin_mid;
            }
            bin_mid = (bin_max - bin_min) / 2 + bin_min;
        }
        // Use the result from this iteration as the maximum for the next.
        bin_max = bin_mid;
        let mut start = (loc as isize - bin_mid as isize + 1).max(1) as usize;
        let finish = (loc + bin_mid).min(text.len()) + pattern.len();

        let mut rd = vec![0u64; finish + 2];
        rd[finish + 1] = (1u64 << d) - 1;
        let mut j = finish;
        while j >= start {
            let char_match = text
                .get(j - 1)
                .and_then(|c| masks.get(c))
                .copied()
                .unwrap_or(0);
            let shifted = ((rd[j + 1] << 1) | 1) & char_match;
            rd[j] = if d == 0 {
                // First pass: exact match.
                shifted
            } else {
                // Subsequent passes: fuzzy match.
                let last_next = last_rd.get(j + 1).copied().unwrap_or(0);
                let last_here = last_rd.get(j).copied().unwrap_or(0);
                shifted | (((last_next | last_here) << 1) | 1) | last_next
            };

            if rd[j] & match_mask != 0 {
                let score = scorer.score(d, j - 1);
                // This match will almost certainly be better than any existing match, but check
                // anyway.
                if score <= score_threshold {
                    score_threshold = score;
                    best_loc = Some(j - 1);
                    trace!("Bitap candidate at {} with score {score}", j - 1);
                    if j - 1 > loc {
                        // When passing loc, don't exceed our current distance from loc.
                        start = (2 * loc as isize - (j - 1) as isize).max(1) as usize;
                    } else {
                        // Already passed loc, downhill from here on in.
                        break;
                    }
                }
            }
            j -= 1;
        }

        // No hope for a (better) match at greater error levels.
        if scorer.score(d + 1, loc) > score_threshold {
            break;
        }
        last_rd = rd;
    }
    Ok(best_loc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn config(threshold: f64, distance: usize) -> MatchConfig {
        MatchConfig {
            threshold,
            distance,
            max_bits: 32,
        }
    }

    #[rstest]
    #[case("abc", vec![('a', 4), ('b', 2), ('c', 1)])]
    #[case("abcaba", vec![('a', 37), ('b', 18), ('c', 8)])]
    fn test_alphabet(#[case] pattern: &str, #[case] expected: Vec<(char, u64)>) {
        let expected: HashMap<char, u64> = expected.into_iter().collect();
        assert_eq!(alphabet(&chars(pattern)), expected);
    }

    #[rstest]
    #[case::exact_match("abcdefghijk", "fgh", 5, 0.5, 100, Some(5))]
    #[case::exact_match_away("abcdefghijk", "fgh", 0, 0.5, 100, Some(5))]
    #[case::fuzzy_match_1("abcdefghijk", "efxhi", 0, 0.5, 100, Some(4))]
    #[case::fuzzy_match_2("abcdefghijk", "cdefxyhijk", 5, 0.5, 100, Some(2))]
    #[case::fuzzy_match_3("abcdefghijk", "bxy", 1, 0.5, 100, None)]
    #[case::overflow("123456789xx0", "3456789x0", 2, 0.5, 100, Some(2))]
    #[case::before_start("abcdef", "xxabc", 4, 0.5, 100, Some(0))]
    #[case::beyond_end("abcdef", "defyy", 4, 0.5, 100, Some(3))]
    #[case::oversized_pattern("abcdef", "xabcdefy", 0, 0.5, 100, Some(0))]
    #[case::threshold_1("abcdefghijk", "efxyhi", 1, 0.4, 100, Some(4))]
    #[case::threshold_2("abcdefghijk", "efxyhi", 1, 0.3, 100, None)]
    #[case::threshold_3("abcdefghijk", "bcdef", 1, 0.0, 100, Some(1))]
    #[case::multiple_select_1("abcdexyzabcde", "abccde", 3, 0.5, 100, Some(0))]
    #[case::multiple_select_2("abcdexyzabcde", "abccde", 5, 0.5, 100, Some(8))]
    #[case::distance_strict("abcdefghijklmnopqrstuvwxyz", "abcdefg", 24, 0.5, 10, None)]
    #[case::distance_strict_fuzzy("abcdefghijklmnopqrstuvwxyz", "abcdxxefg", 1, 0.5, 10, Some(0))]
    #[case::distance_loose("abcdefghijklmnopqrstuvwxyz", "abcdefg", 24, 0.5, 1000, Some(0))]
    #[case::zero_distance_at_loc("abcdefghijk", "efxhi", 4, 0.3, 0, Some(4))]
    #[case::zero_distance_off_loc("abcdefghijk", "efxhi", 3, 0.3, 0, None)]
    fn test_bitap(
        #[case] text: &str,
        #[case] pattern: &str,
        #[case] loc: usize,
        #[case] threshold: f64,
        #[case] distance: usize,
        #[case] expected: Option<usize>,
    ) {
        let result = bitap(&chars(text), &chars(pattern), loc, &config(threshold, distance));
        assert_eq!(result, Ok(expected));
    }

    #[rstest]
    #[case::equality("abcdef", "abcdef", 1000, Some(0))]
    #[case::null_text("", "abcdef", 1, None)]
    #[case::null_pattern("abcdef", "", 3, Some(3))]
    #[case::exact_match("abcdef", "de", 3, Some(3))]
    #[case::beyond_end_match("abcdef", "defy", 4, Some(3))]
    #[case::oversized_pattern("abcdef", "abcdefy", 0, Some(0))]
    #[case::scenario("abcdefghijk", "fgh", 0, Some(5))]
    fn test_match_main(
        #[case] text: &str,
        #[case] pattern: &str,
        #[case] loc: usize,
        #[case] expected: Option<usize>,
    ) {
        assert_eq!(
            match_main(text, pattern, loc, &MatchConfig::default()),
            Ok(expected)
        );
    }

    #[test]
    fn test_match_main_complex() {
        let config = MatchConfig {
            threshold: 0.7,
            ..Default::default()
        };
        assert_eq!(
            match_main(
                "I am the very model of a modern major general.",
                " that berry ",
                5,
                &config
            ),
            Ok(Some(4))
        );
    }

    #[test]
    fn test_pattern_too_long() {
        let pattern = "x".repeat(40);
        assert_eq!(
            match_main("abcdef", &pattern, 0, &MatchConfig::default()),
            Err(MatchError::PatternTooLong { len: 40, max: 32 })
        );
    }

    #[rstest]
    #[case(0, 64)]
    #[case(16, 16)]
    #[case(64, 64)]
    #[case(128, 64)]
    fn test_effective_max_bits(#[case] max_bits: usize, #[case] expected: usize) {
        let config = MatchConfig {
            max_bits,
            ..Default::default()
        };
        assert_eq!(config.effective_max_bits(), expected);
    }

    #[test]
    fn test_wide_patterns_use_full_word() {
        let config = MatchConfig {
            max_bits: 64,
            ..Default::default()
        };
        let text = format!("{}needle{}", "a".repeat(50), "b".repeat(50));
        let pattern = format!("{}nxedle{}", "a".repeat(25), "b".repeat(25));
        assert_eq!(match_main(&text, &pattern, 25, &config), Ok(Some(25)));
    }
}

//! Text primitives shared by the diff, match and patch engines.
//!
//! Everything here works on slices of `char` so that positions and lengths count Unicode scalar
//! values rather than bytes.

use std::cmp::min;

/// Return the length of the longest common prefix of two texts.
///
/// This binary searches over candidate lengths, comparing whole slices at each step.
pub fn common_prefix(text1: &[char], text2: &[char]) -> usize {
    if text1.is_empty() || text2.is_empty() || text1[0] != text2[0] {
        return 0;
    }
    let mut pointer_min = 0;
    let mut pointer_max = min(text1.len(), text2.len());
    let mut pointer_mid = pointer_max;
    let mut pointer_start = 0;

    while pointer_min < pointer_mid {
        if text1[pointer_start..pointer_mid] == text2[pointer_start..pointer_mid] {
            pointer_min = pointer_mid;
            pointer_start = pointer_min;
        } else {
            pointer_max = pointer_mid;
        }
        pointer_mid = (pointer_max - pointer_min) / 2 + pointer_min;
    }
    pointer_mid
}

/// Return the length of the longest common suffix of two texts.
pub fn common_suffix(text1: &[char], text2: &[char]) -> usize {
    let (len1, len2) = (text1.len(), text2.len());
    if len1 == 0 || len2 == 0 || text1[len1 - 1] != text2[len2 - 1] {
        return 0;
    }
    let mut pointer_min = 0;
    let mut pointer_max = min(len1, len2);
    let mut pointer_mid = pointer_max;
    let mut pointer_end = 0;

    while pointer_min < pointer_mid {
        if text1[len1 - pointer_mid..len1 - pointer_end]
            == text2[len2 - pointer_mid..len2 - pointer_end]
        {
            pointer_min = pointer_mid;
            pointer_end = pointer_min;
        } else {
            pointer_max = pointer_mid;
        }
        pointer_mid = (pointer_max - pointer_min) / 2 + pointer_min;
    }
    pointer_mid
}

/// Return the length of the longest suffix of `text1` that is also a prefix of `text2`.
pub fn common_overlap(text1: &[char], text2: &[char]) -> usize {
    if text1.is_empty() || text2.is_empty() {
        return 0;
    }
    // Truncate the longer string so both candidates have the same length.
    let text_length = min(text1.len(), text2.len());
    let text1 = &text1[text1.len() - text_length..];
    let text2 = &text2[..text_length];
    if text1 == text2 {
        return text_length;
    }

    // Grow the candidate overlap using the position of the shortest unmatched suffix in text2.
    let mut best = 0;
    let mut length = 1;
    loop {
        let pattern = &text1[text_length - length..];
        let Some(found) = find(text2, pattern, 0) else {
            return best;
        };
        length += found;
        if found == 0 || text1[text_length - length..] == text2[..length] {
            best = length;
            length += 1;
        }
        if length > text_length {
            return best;
        }
    }
}

/// Find the first occurrence of `needle` in `haystack` starting at or after `from`.
pub(crate) fn find(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    if needle.is_empty() {
        return Some(from);
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|idx| idx + from)
}

/// Find the last occurrence of `needle` in `haystack` that starts at or before `upto`.
pub(crate) fn rfind(haystack: &[char], needle: &[char], upto: usize) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    let last_start = min(upto, haystack.len() - needle.len());
    (0..=last_start)
        .rev()
        .find(|&idx| &haystack[idx..idx + needle.len()] == needle)
}

/// Return the characters of `text` in `start..end`, clamping both ends to the text.
pub(crate) fn clamped(text: &[char], start: usize, end: usize) -> &[char] {
    let end = min(end, text.len());
    let start = min(start, end);
    &text[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[rstest]
    #[case("abc", "xyz", 0)]
    #[case("1234abcdef", "1234xyz", 4)]
    #[case("1234", "1234xyz", 4)]
    #[case("", "abc", 0)]
    fn test_common_prefix(#[case] a: &str, #[case] b: &str, #[case] expected: usize) {
        assert_eq!(common_prefix(&chars(a), &chars(b)), expected);
    }

    #[rstest]
    #[case("abc", "xyz", 0)]
    #[case("abcdef1234", "xyz1234", 4)]
    #[case("1234", "xyz1234", 4)]
    #[case("abc", "", 0)]
    fn test_common_suffix(#[case] a: &str, #[case] b: &str, #[case] expected: usize) {
        assert_eq!(common_suffix(&chars(a), &chars(b)), expected);
    }

    #[rstest]
    #[case("", "abcd", 0)]
    #[case("abc", "abcd", 3)]
    #[case("123456", "abcd", 0)]
    #[case("123456xxx", "xxxabcd", 3)]
    // Ligatures must not be decomposed when comparing characters.
    #[case("fi", "\u{fb01}i", 0)]
    fn test_common_overlap(#[case] a: &str, #[case] b: &str, #[case] expected: usize) {
        assert_eq!(common_overlap(&chars(a), &chars(b)), expected);
    }

    #[test]
    fn test_find_and_rfind() {
        let text = chars("abcabc");
        assert_eq!(find(&text, &chars("bc"), 0), Some(1));
        assert_eq!(find(&text, &chars("bc"), 2), Some(4));
        assert_eq!(find(&text, &chars("x"), 0), None);
        assert_eq!(rfind(&text, &chars("bc"), 6), Some(4));
        assert_eq!(rfind(&text, &chars("bc"), 3), Some(1));
        assert_eq!(rfind(&text, &chars(""), 6), Some(6));
    }

    #[test]
    fn test_clamped() {
        let text = chars("hello");
        assert_eq!(clamped(&text, 3, 10), &chars("lo")[..]);
        assert!(clamped(&text, 8, 10).is_empty());
    }
}

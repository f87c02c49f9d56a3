//! Line mode support: mapping whole lines onto single characters.
//!
//! Diffing the mapped texts compares lines as atomic units, which is far faster than a
//! character-level diff on large inputs.

use crate::edit::Edit;
use std::collections::HashMap;

/// The maximum number of unique lines collected from the first text.
///
/// The first text is capped lower so the second text still has room for its own lines.
const MAX_LINES_TEXT1: usize = 40_000;

/// The maximum number of unique lines across both texts.
const MAX_LINES_TEXT2: usize = 65_535;

/// The start of the surrogate range, which can't be represented as a `char`.
const SURROGATE_START: u32 = 0xD800;

/// The width of the surrogate range.
const SURROGATE_WIDTH: u32 = 0x800;

/// A bijective mapping between unique lines and their indices.
///
/// Index zero is reserved for the empty string so that no real line maps onto `'\0'`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineArena {
    lines: Vec<String>,
    index: HashMap<String, usize>,
}

impl Default for LineArena {
    fn default() -> Self {
        LineArena {
            lines: vec![String::new()],
            index: HashMap::new(),
        }
    }
}

impl LineArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of entries in the arena, including the reserved empty line.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.len() <= 1
    }

    /// Get the line stored at an index
    #[must_use]
    pub fn line(&self, idx: usize) -> Option<&str> {
        self.lines.get(idx).map(String::as_str)
    }

    /// Split a text into lines and encode each line as a single character.
    ///
    /// Each line keeps its trailing newline. Once the arena holds `max_lines` entries, the rest
    /// of the text is stored as one final line.
    pub fn encode(&mut self, text: &[char], max_lines: usize) -> Vec<char> {
        let mut encoded = Vec::new();
        let mut line_start = 0;

        while line_start < text.len() {
            let mut line_end = text[line_start..]
                .iter()
                .position(|&c| c == '\n')
                .map_or(text.len(), |offset| line_start + offset + 1);

            let mut line: String = text[line_start..line_end].iter().collect();
            let idx = match self.index.get(&line) {
                Some(&idx) => idx,
                None => {
                    if self.lines.len() == max_lines {
                        line = text[line_start..].iter().collect();
                        line_end = text.len();
                    }
                    let idx = self.lines.len();
                    self.index.insert(line.clone(), idx);
                    self.lines.push(line);
                    idx
                }
            };
            encoded.push(index_to_char(idx));
            line_start = line_end;
        }
        encoded
    }

    /// Rehydrate the text of line-encoded edits back into the lines they represent.
    pub fn chars_to_lines(&self, edits: &mut [Edit]) {
        for edit in edits.iter_mut() {
            edit.text = edit
                .text
                .chars()
                .filter_map(|c| self.line(char_to_index(c)))
                .collect();
        }
    }
}

/// Encode two texts line by line into a shared arena.
///
/// Returns the encoded first text, the encoded second text and the arena needed to decode them.
pub fn lines_to_chars(text1: &[char], text2: &[char]) -> (Vec<char>, Vec<char>, LineArena) {
    let mut arena = LineArena::new();
    let chars1 = arena.encode(text1, MAX_LINES_TEXT1);
    let chars2 = arena.encode(text2, MAX_LINES_TEXT2);
    (chars1, chars2, arena)
}

/// Map a line index to a character, skipping over the surrogate range.
fn index_to_char(idx: usize) -> char {
    let mut code = u32::try_from(idx).unwrap_or(u32::MAX);
    if code >= SURROGATE_START {
        code = code.saturating_add(SURROGATE_WIDTH);
    }
    char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// The inverse of [index_to_char].
fn char_to_index(c: char) -> usize {
    let code = c as u32;
    if code >= SURROGATE_START + SURROGATE_WIDTH {
        (code - SURROGATE_WIDTH) as usize
    } else {
        code as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_lines_to_chars_shared_lines() {
        let (chars1, chars2, arena) =
            lines_to_chars(&chars("alpha\nbeta\nalpha\n"), &chars("beta\nalpha\nbeta\n"));
        assert_eq!(chars1, vec!['\u{1}', '\u{2}', '\u{1}']);
        assert_eq!(chars2, vec!['\u{2}', '\u{1}', '\u{2}']);
        assert_eq!(arena.line(1), Some("alpha\n"));
        assert_eq!(arena.line(2), Some("beta\n"));
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn test_lines_to_chars_without_trailing_newline() {
        let (chars1, chars2, arena) = lines_to_chars(&chars("a"), &chars("b"));
        assert_eq!(chars1, vec!['\u{1}']);
        assert_eq!(chars2, vec!['\u{2}']);
        assert_eq!(arena.line(2), Some("b"));
    }

    #[test]
    fn test_lines_to_chars_empty() {
        let (chars1, chars2, arena) = lines_to_chars(&chars(""), &chars("alpha\r\nbeta\r\n\r\n\r\n"));
        assert!(chars1.is_empty());
        assert_eq!(chars2, vec!['\u{1}', '\u{2}', '\u{3}', '\u{3}']);
        assert_eq!(arena.line(3), Some("\r\n"));
    }

    #[test]
    fn test_chars_to_lines() {
        let (chars1, chars2, arena) =
            lines_to_chars(&chars("alpha\nbeta\nalpha\n"), &chars("beta\nalpha\nbeta\n"));
        let mut edits = vec![
            Edit::new(crate::edit::Op::Equal, chars1.iter().collect::<String>()),
            Edit::new(crate::edit::Op::Insert, chars2.iter().collect::<String>()),
        ];
        arena.chars_to_lines(&mut edits);
        assert_eq!(
            edits,
            vec![
                Edit::equal("alpha\nbeta\nalpha\n"),
                Edit::insert("beta\nalpha\nbeta\n"),
            ]
        );
    }

    #[test]
    fn test_many_lines_round_trip() {
        let line_count = 300;
        let text: String = (1..=line_count).map(|i| format!("{i}\n")).collect();
        let (chars1, _, arena) = lines_to_chars(&chars(&text), &[]);
        assert_eq!(chars1.len(), line_count);

        let mut edits = vec![Edit::delete(chars1.iter().collect::<String>())];
        arena.chars_to_lines(&mut edits);
        assert_eq!(edits[0].text, text);
    }

    #[test]
    fn test_line_cap_collapses_remainder() {
        let mut arena = LineArena::new();
        let encoded = arena.encode(&chars("a\nb\nc\nd\n"), 3);
        assert_eq!(encoded.len(), 3);
        assert_eq!(arena.line(3), Some("c\nd\n"));
    }

    #[test_case(0 ; "reserved")]
    #[test_case(0xD7FF ; "below surrogates")]
    #[test_case(0xD800 ; "first surrogate")]
    #[test_case(0xFFFF ; "largest line index")]
    fn test_index_char_mapping(idx: usize) {
        assert_eq!(char_to_index(index_to_char(idx)), idx);
    }
}

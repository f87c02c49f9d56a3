//! The edit script data model.
//!
//! An edit script is an ordered list of [Edit]s that turns one text into another. Deletions and
//! equalities spell out the original text, insertions and equalities spell out the new text.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The kind of change an [Edit] represents
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Op {
    /// Text that only exists in the original document
    Delete,
    /// Text that only exists in the new document
    Insert,
    /// Text shared by both documents
    Equal,
}

/// A single unit of an edit script
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edit {
    pub op: Op,
    pub text: String,
}

impl Edit {
    pub fn new(op: Op, text: impl Into<String>) -> Self {
        Edit {
            op,
            text: text.into(),
        }
    }

    pub fn delete(text: impl Into<String>) -> Self {
        Self::new(Op::Delete, text)
    }

    pub fn insert(text: impl Into<String>) -> Self {
        Self::new(Op::Insert, text)
    }

    pub fn equal(text: impl Into<String>) -> Self {
        Self::new(Op::Equal, text)
    }

    /// Create an edit from a slice of characters.
    pub(crate) fn from_chars(op: Op, chars: &[char]) -> Self {
        Self::new(op, chars.iter().collect::<String>())
    }

    /// The length of the edit's text, in characters.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Reconstruct the original text (`text1`) from an edit script.
pub fn source_text(edits: &[Edit]) -> String {
    edits
        .iter()
        .filter(|edit| edit.op != Op::Insert)
        .map(|edit| edit.text.as_str())
        .collect()
}

/// Reconstruct the new text (`text2`) from an edit script.
pub fn target_text(edits: &[Edit]) -> String {
    edits
        .iter()
        .filter(|edit| edit.op != Op::Delete)
        .map(|edit| edit.text.as_str())
        .collect()
}

/// Compute the Levenshtein distance represented by an edit script.
///
/// Every run of changes between two equalities costs the larger of its inserted and deleted
/// character counts, since a deletion paired with an insertion is a substitution.
pub fn levenshtein(edits: &[Edit]) -> usize {
    let mut distance = 0;
    let mut insertions = 0;
    let mut deletions = 0;

    for edit in edits {
        match edit.op {
            Op::Insert => insertions += edit.char_len(),
            Op::Delete => deletions += edit.char_len(),
            Op::Equal => {
                distance += insertions.max(deletions);
                insertions = 0;
                deletions = 0;
            }
        }
    }
    distance + insertions.max(deletions)
}

/// Translate a character location in the original text into the equivalent location in the new
/// text.
///
/// A location that falls inside a deleted span maps to the position where that deletion starts
/// in the new text.
pub fn x_index(edits: &[Edit], loc: usize) -> usize {
    let mut chars1 = 0;
    let mut chars2 = 0;
    let mut last_chars1 = 0;
    let mut last_chars2 = 0;
    let mut overshoot = None;

    for edit in edits {
        let len = edit.char_len();
        if edit.op != Op::Insert {
            chars1 += len;
        }
        if edit.op != Op::Delete {
            chars2 += len;
        }
        if chars1 > loc {
            overshoot = Some(edit.op);
            break;
        }
        last_chars1 = chars1;
        last_chars2 = chars2;
    }

    if overshoot == Some(Op::Delete) {
        return last_chars2;
    }
    last_chars2 + (loc - last_chars1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::str::FromStr;

    fn fox_script() -> Vec<Edit> {
        vec![
            Edit::equal("jump"),
            Edit::delete("s"),
            Edit::insert("ed"),
            Edit::equal(" over "),
            Edit::delete("the"),
            Edit::insert("a"),
            Edit::equal(" lazy"),
        ]
    }

    #[test]
    fn test_reconstruct_texts() {
        let edits = fox_script();
        assert_eq!(source_text(&edits), "jumps over the lazy");
        assert_eq!(target_text(&edits), "jumped over a lazy");
    }

    #[rstest]
    #[case(vec![Edit::delete("abc"), Edit::insert("1234"), Edit::equal("xyz")], 4)]
    #[case(vec![Edit::equal("xyz"), Edit::delete("abc"), Edit::insert("1234")], 4)]
    #[case(vec![Edit::delete("abc"), Edit::equal("xyz"), Edit::insert("1234")], 7)]
    fn test_levenshtein(#[case] edits: Vec<Edit>, #[case] expected: usize) {
        assert_eq!(levenshtein(&edits), expected);
    }

    #[test]
    fn test_x_index_across_insertion() {
        let edits = vec![Edit::delete("a"), Edit::insert("1234"), Edit::equal("xyz")];
        assert_eq!(x_index(&edits, 2), 5);
    }

    #[test]
    fn test_x_index_inside_deletion() {
        let edits = vec![Edit::equal("a"), Edit::delete("1234"), Edit::equal("xyz")];
        assert_eq!(x_index(&edits, 3), 1);
    }

    #[test]
    fn test_char_len_counts_scalars() {
        assert_eq!(Edit::insert("🅰b").char_len(), 2);
    }

    #[test]
    fn test_op_strings() {
        assert_eq!(Op::Delete.to_string(), "delete");
        assert_eq!(Op::from_str("equal").unwrap(), Op::Equal);
    }
}

//! The delta format: a compact, tab separated encoding of an edit script.
//!
//! Deletions and equalities only record their length (`-3`, `=12`), since their text can be read
//! back from the original document. Insertions carry their percent-escaped text (`+abc`).

use crate::edit::{Edit, Op};
use crate::string_utils::{percent_decode, percent_encode, DecodeError};
use crate::text::clamped;
use thiserror::Error;

/// Errors that can arise when decoding a delta
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeltaError {
    #[error("Invalid number in delta: \"{0}\"")]
    InvalidNumber(String),
    #[error("Negative length in delta: {0}")]
    NegativeLength(i64),
    #[error("Invalid operation in delta: \"{0}\"")]
    InvalidOperation(String),
    #[error("Delta length ({consumed}) does not equal source text length ({expected})")]
    LengthMismatch { consumed: usize, expected: usize },
    #[error("Illegal escape in delta")]
    Escape(#[from] DecodeError),
}

/// Encode an edit script as a delta.
///
/// ```rust
/// # use libdiffmatch::delta::to_delta;
/// # use libdiffmatch::edit::Edit;
/// let edits = vec![Edit::equal("jump"), Edit::delete("s"), Edit::insert("ed")];
/// assert_eq!(to_delta(&edits), "=4\t-1\t+ed");
/// ```
pub fn to_delta(edits: &[Edit]) -> String {
    edits
        .iter()
        .map(|edit| match edit.op {
            Op::Insert => format!("+{}", percent_encode(&edit.text)),
            Op::Delete => format!("-{}", edit.char_len()),
            Op::Equal => format!("={}", edit.char_len()),
        })
        .collect::<Vec<_>>()
        .join("\t")
}

/// Decode a delta against the original text it was computed from.
///
/// The lengths in the delta must consume exactly the whole of `text1`.
pub fn from_delta(text1: &str, delta: &str) -> Result<Vec<Edit>, DeltaError> {
    let source: Vec<char> = text1.chars().collect();
    let mut edits = Vec::new();
    let mut pointer: usize = 0;

    for token in delta.split('\t') {
        let mut token_chars = token.chars();
        let Some(op) = token_chars.next() else {
            // Blank tokens are ok (from a trailing tab)
            continue;
        };
        let param = token_chars.as_str();
        match op {
            '+' => edits.push(Edit::insert(percent_decode(param)?)),
            '-' | '=' => {
                let len: i64 = param
                    .parse()
                    .map_err(|_| DeltaError::InvalidNumber(param.to_string()))?;
                let len = usize::try_from(len).map_err(|_| DeltaError::NegativeLength(len))?;
                let end = pointer.saturating_add(len);
                let text = clamped(&source, pointer, end);
                let op = if op == '=' { Op::Equal } else { Op::Delete };
                edits.push(Edit::from_chars(op, text));
                pointer = end;
            }
            _ => return Err(DeltaError::InvalidOperation(token.to_string())),
        }
    }

    if pointer != source.len() {
        return Err(DeltaError::LengthMismatch {
            consumed: pointer,
            expected: source.len(),
        });
    }
    Ok(edits)
}

//! The textual patch format.
//!
//! Each patch is a `@@ -start1,length1 +start2,length2 @@` header followed by one line per edit,
//! prefixed with `-`, `+` or a space. Edit text is percent-escaped so it can't break the line
//! structure.

use super::Patch;
use crate::edit::{Edit, Op};
use crate::string_utils::{percent_decode, percent_encode, DecodeError};
use std::fmt;
use thiserror::Error;

/// Errors that can arise when parsing patch text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsePatchError {
    #[error("Invalid patch header: \"{0}\"")]
    InvalidHeader(String),
    #[error("Invalid patch mode '{mode}' in: \"{line}\"")]
    InvalidMode { mode: char, line: String },
    #[error("Illegal escape in patch line: \"{line}\"")]
    Escape {
        line: String,
        #[source]
        source: DecodeError,
    },
}

/// Format one side of a patch header.
///
/// Starts are stored zero-based but written one-based, except for empty spans which point at the
/// character before them.
fn coords(start: usize, length: usize) -> String {
    match length {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        _ => format!("{},{length}", start + 1),
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "@@ -{} +{} @@",
            coords(self.start1, self.length1),
            coords(self.start2, self.length2)
        )?;
        for edit in &self.diffs {
            let sign = match edit.op {
                Op::Insert => '+',
                Op::Delete => '-',
                Op::Equal => ' ',
            };
            writeln!(f, "{sign}{}", percent_encode(&edit.text))?;
        }
        Ok(())
    }
}

/// Serialize a patch sequence.
pub fn to_text(patches: &[Patch]) -> String {
    patches.iter().map(Patch::to_string).collect()
}

/// Parse one side of a header, returning the zero-based start and the length.
fn parse_coords(coords: &str) -> Option<(usize, usize)> {
    let is_number = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    let (start, length) = match coords.split_once(',') {
        Some((start, length)) => (start, length),
        None => (coords, ""),
    };
    if !is_number(start) || !(length.is_empty() || is_number(length)) {
        return None;
    }
    let start = parse_offset(start)?;
    match length {
        "" => Some((start.checked_sub(1)?, 1)),
        "0" => Some((start, 0)),
        length => Some((start.checked_sub(1)?, parse_offset(length)?)),
    }
}

/// Parse a header number, rejecting values that can't be used as a signed offset.
fn parse_offset(number: &str) -> Option<usize> {
    let number: usize = number.parse().ok()?;
    isize::try_from(number).ok()?;
    Some(number)
}

/// Parse a patch header line into an empty patch.
fn parse_header(line: &str) -> Result<Patch, ParsePatchError> {
    let invalid = || ParsePatchError::InvalidHeader(line.to_string());
    let (coords1, coords2) = line
        .strip_prefix("@@ -")
        .and_then(|rest| rest.strip_suffix(" @@"))
        .and_then(|rest| rest.split_once(" +"))
        .ok_or_else(invalid)?;
    let (start1, length1) = parse_coords(coords1).ok_or_else(invalid)?;
    let (start2, length2) = parse_coords(coords2).ok_or_else(invalid)?;
    Ok(Patch {
        diffs: Vec::new(),
        start1,
        start2,
        length1,
        length2,
    })
}

/// Parse a patch sequence from its textual form.
///
/// ```rust
/// # use libdiffmatch::patch::from_text;
/// let patches = from_text("@@ -1 +1 @@\n-a\n+b\n").unwrap();
/// assert_eq!(patches.len(), 1);
/// assert_eq!(patches[0].length1, 1);
/// ```
pub fn from_text(text: &str) -> Result<Vec<Patch>, ParsePatchError> {
    let mut patches = Vec::new();
    let mut lines = text.split('\n').peekable();

    while let Some(header) = lines.next() {
        if header.is_empty() && lines.peek().is_none() {
            // Trailing newline
            break;
        }
        let mut patch = parse_header(header)?;

        while let Some(&line) = lines.peek() {
            let mut line_chars = line.chars();
            let Some(sign) = line_chars.next() else {
                // Blank line, skip it
                lines.next();
                continue;
            };
            if sign == '@' {
                // Start of the next patch
                break;
            }
            let op = match sign {
                '-' => Op::Delete,
                '+' => Op::Insert,
                ' ' => Op::Equal,
                mode => {
                    return Err(ParsePatchError::InvalidMode {
                        mode,
                        line: line.to_string(),
                    });
                }
            };
            let content =
                percent_decode(line_chars.as_str()).map_err(|source| ParsePatchError::Escape {
                    line: line.to_string(),
                    source,
                })?;
            patch.diffs.push(Edit::new(op, content));
            lines.next();
        }
        patches.push(patch);
    }
    Ok(patches)
}

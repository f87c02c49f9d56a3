//! URI-style percent escaping for the delta and patch text formats.
//!
//! Both formats are line and tab delimited, so any text they carry has to be escaped. The set of
//! characters left as-is matches what `encodeURI` keeps (plus the space character), which keeps
//! the output readable and compatible with other implementations of these formats.

use thiserror::Error;

/// Errors that can arise when decoding percent-escaped text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Invalid escape sequence \"{sequence}\" at byte {offset}")]
    InvalidEscape { offset: usize, sequence: String },
    #[error("Escaped text is not valid UTF-8")]
    InvalidUtf8,
}

/// Whether a character is written as-is by [percent_encode].
fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '-' | '_'
                | '.'
                | '!'
                | '~'
                | '*'
                | '\''
                | '('
                | ')'
                | ';'
                | '/'
                | '?'
                | ':'
                | '@'
                | '&'
                | '='
                | '+'
                | '$'
                | ','
                | '#'
                | ' '
        )
}

/// Escape a string so it can be embedded in a delta or patch text.
///
/// Every character outside of the unreserved set is written as the `%XX` escapes of its UTF-8
/// bytes, using uppercase hex digits.
///
/// ```rust
/// # use libdiffmatch::string_utils::percent_encode;
/// assert_eq!(percent_encode("a b\n%"), "a b%0A%25");
/// assert_eq!(percent_encode("\u{0680}"), "%DA%80");
/// ```
pub fn percent_encode(text: &str) -> String {
    let mut encoded = String::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for c in text.chars() {
        if is_unreserved(c) {
            encoded.push(c);
        } else {
            for byte in c.encode_utf8(&mut buf).bytes() {
                encoded.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    encoded
}

/// Reverse [percent_encode].
///
/// Every `%XX` escape is decoded. A `+` stays a literal plus sign.
pub fn percent_decode(text: &str) -> Result<String, DecodeError> {
    if !text.contains('%') {
        return Ok(text.to_string());
    }

    let bytes = text.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] != b'%' {
            decoded.push(bytes[index]);
            index += 1;
            continue;
        }
        let escape = bytes.get(index + 1..index + 3);
        match escape.map(|pair| (hex_value(pair[0]), hex_value(pair[1]))) {
            Some((Some(hi), Some(lo))) => {
                decoded.push((hi << 4) | lo);
                index += 3;
            }
            _ => {
                let end = (index + 3).min(bytes.len());
                return Err(DecodeError::InvalidEscape {
                    offset: index,
                    sequence: String::from_utf8_lossy(&bytes[index..end]).into_owned(),
                });
            }
        }
    }

    String::from_utf8(decoded).map_err(|_| DecodeError::InvalidUtf8)
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

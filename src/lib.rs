//! The supporting library for `diffmatch`.
//!
//! This crate computes edit scripts between texts, locates patterns in text with a fuzzy
//! matcher, and builds patches that can be applied to texts that have drifted from the one they
//! were made from.
//!
//! The functions at the root of the crate cover the common cases. The modules expose the
//! individual algorithms for callers that need more control, e.g. picking a cleanup pass or
//! diffing without the line level speedup.
//!
//! ```rust
//! use libdiffmatch::{diff, patch_apply, patch_make, EngineConfig};
//!
//! let config = EngineConfig::default();
//! let edits = diff("The quick brown fox", "The quick red fox", true, &config.diff);
//! assert_eq!(edits.len(), 4);
//!
//! let patches = patch_make("line1\nline2\n", "line1\nlineX\n".into(), &config);
//! let (text, results) = patch_apply(&patches, "line1\nline2\n", &config);
//! assert_eq!(text, "line1\nlineX\n");
//! assert_eq!(results, vec![true]);
//! ```

pub mod bitap;
pub mod cli;
pub mod config;
pub mod console_utils;
pub mod delta;
pub mod diff;
pub mod edit;
mod figment_utils;
pub mod neg_idx_vec;
pub mod patch;
pub mod string_utils;
pub mod text;

pub use bitap::{MatchConfig, MatchError};
pub use config::EngineConfig;
pub use delta::DeltaError;
pub use diff::DiffConfig;
pub use edit::{Edit, Op};
pub use patch::{ParsePatchError, Patch, PatchConfig, PatchSource};

use diff::cleanup::cleanup_semantic;

/// Compute a human readable edit script that turns `text1` into `text2`.
///
/// This is [diff::diff_main] followed by a semantic cleanup, so edits line up with word
/// boundaries instead of being the shortest possible script.
pub fn diff(text1: &str, text2: &str, checklines: bool, config: &DiffConfig) -> Vec<Edit> {
    let mut edits = diff::diff_main(text1, text2, checklines, config);
    cleanup_semantic(&mut edits);
    edits
}

/// Find the best match for `pattern` in `text` near the character offset `loc`.
pub fn match_locate(
    text: &str,
    pattern: &str,
    loc: usize,
    config: &MatchConfig,
) -> Result<Option<usize>, MatchError> {
    bitap::match_main(text, pattern, loc, config)
}

/// Compute the patches that turn `text1` into a new text or apply an edit script to it.
pub fn patch_make(text1: &str, source: PatchSource<'_>, config: &EngineConfig) -> Vec<Patch> {
    patch::make(text1, source, config)
}

/// Apply patches to a text, returning the new text and whether each patch applied.
///
/// Patches longer than the matcher's bit width are split before they are applied, so the
/// success vector has one entry per patch after splitting and can be longer than `patches`.
pub fn patch_apply(patches: &[Patch], text: &str, config: &EngineConfig) -> (String, Vec<bool>) {
    patch::apply(patches, text, config)
}

/// Encode an edit script as a compact delta.
pub fn delta_encode(edits: &[Edit]) -> String {
    delta::to_delta(edits)
}

/// Decode a delta against the text it was computed from.
pub fn delta_decode(text1: &str, delta: &str) -> Result<Vec<Edit>, DeltaError> {
    delta::from_delta(text1, delta)
}

/// Serialize patches to their textual form.
pub fn patches_to_text(patches: &[Patch]) -> String {
    patch::to_text(patches)
}

/// Parse patches from their textual form.
pub fn patches_from_text(text: &str) -> Result<Vec<Patch>, ParsePatchError> {
    patch::from_text(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_diff_is_readable() {
        assert_eq!(
            diff(
                "The quick brown fox",
                "The quick red fox",
                true,
                &DiffConfig::default()
            ),
            vec![
                Edit::equal("The quick "),
                Edit::delete("brown"),
                Edit::insert("red"),
                Edit::equal(" fox"),
            ]
        );
    }

    #[test]
    fn test_diff_against_empty() {
        let config = DiffConfig::default();
        assert_eq!(diff("", "hello", true, &config), vec![Edit::insert("hello")]);
        assert_eq!(diff("hello", "", true, &config), vec![Edit::delete("hello")]);
        assert!(diff("", "", true, &config).is_empty());
    }

    #[test]
    fn test_match_locate() {
        assert_eq!(
            match_locate("abcdefghijk", "fgh", 0, &MatchConfig::default()),
            Ok(Some(5))
        );
    }

    #[test]
    fn test_match_locate_rejects_long_patterns() {
        let pattern = "x".repeat(40);
        assert_eq!(
            match_locate("abc", &pattern, 0, &MatchConfig::default()),
            Err(MatchError::PatternTooLong { len: 40, max: 32 })
        );
    }

    #[test]
    fn test_delta_reproduces_new_text() {
        let text1 = "first line\nsecond line\nthird line\n";
        let text2 = "first line\nthe second line\nthird line, changed\nfourth\n";
        let edits = diff(text1, text2, true, &DiffConfig::default());
        let decoded = delta_decode(text1, &delta_encode(&edits)).unwrap();
        assert_eq!(decoded, edits);
        assert_eq!(edit::target_text(&decoded), text2);
    }

    #[test]
    fn test_patch_text_round_trip() {
        let config = EngineConfig::default();
        let patches = patch_make("line1\nline2\nline3\n", "line1\nlineX\nline3\n".into(), &config);
        let parsed = patches_from_text(&patches_to_text(&patches)).unwrap();
        assert_eq!(parsed, patches);
        assert_eq!(
            patch_apply(&parsed, "line1\nline2\nline3\n", &config),
            ("line1\nlineX\nline3\n".to_string(), vec![true])
        );
    }

    #[test]
    fn test_patch_apply_reports_split_patches() {
        let mut config = EngineConfig::default();
        config.matching.max_bits = 8;
        let text1 = "The quick brown fox jumps over the lazy dog.";
        let text2 = "The quick brown cat naps under the lazy dog.";
        let patches = patch_make(text1, text2.into(), &config);
        let (patched, results) = patch_apply(&patches, text1, &config);
        assert_eq!(patched, text2);
        assert!(results.len() > patches.len());
        assert!(results.iter().all(|&applied| applied));
    }
}

use libdiffmatch::{
    delta_decode, delta_encode,
    diff::{cleanup::cleanup_merge, diff_main},
    edit::{source_text, target_text},
    match_locate, patch_apply, patch_make, DiffConfig, EngineConfig, MatchConfig,
};
use proptest::prelude::*;

/// Texts built from a small alphabet so that the two sides share plenty of structure.
fn text() -> impl Strategy<Value = String> {
    "[abc \n]{0,80}"
}

/// Texts with multibyte characters mixed in.
fn unicode_text() -> impl Strategy<Value = String> {
    "[aé\u{1F600}\n%+]{0,40}"
}

fn untimed() -> DiffConfig {
    DiffConfig {
        timeout: 0.0,
        ..Default::default()
    }
}

proptest! {
    #[test]
    fn diff_reconstructs_both_texts(a in text(), b in text(), checklines in any::<bool>()) {
        let edits = diff_main(&a, &b, checklines, &untimed());
        prop_assert_eq!(source_text(&edits), a);
        prop_assert_eq!(target_text(&edits), b);
    }

    #[test]
    fn diff_output_is_normalized(a in text(), b in text()) {
        let edits = diff_main(&a, &b, false, &untimed());
        prop_assert!(edits.iter().all(|edit| !edit.text.is_empty()));
        prop_assert!(edits.windows(2).all(|pair| pair[0].op != pair[1].op));

        let mut merged = edits.clone();
        cleanup_merge(&mut merged);
        prop_assert_eq!(merged, edits);
    }

    #[test]
    fn delta_round_trips(a in unicode_text(), b in unicode_text()) {
        let edits = libdiffmatch::diff(&a, &b, true, &untimed());
        let decoded = delta_decode(&a, &delta_encode(&edits)).unwrap();
        prop_assert_eq!(target_text(&decoded), b);
        prop_assert_eq!(decoded, edits);
    }

    #[test]
    fn patches_apply_to_their_source(a in text(), b in text()) {
        let config = EngineConfig::default();
        let patches = patch_make(&a, b.as_str().into(), &config);
        let (patched, results) = patch_apply(&patches, &a, &config);
        prop_assert_eq!(patched, b);
        prop_assert!(results.iter().all(|&applied| applied));
    }

    #[test]
    fn exact_substring_is_found_in_place(
        text in "[a-z]{1,60}",
        start in any::<prop::sample::Index>(),
        len in 1usize..=32,
    ) {
        let chars: Vec<char> = text.chars().collect();
        let start = start.index(chars.len());
        let end = (start + len).min(chars.len());
        let pattern: String = chars[start..end].iter().collect();
        prop_assert_eq!(
            match_locate(&text, &pattern, start, &MatchConfig::default()),
            Ok(Some(start))
        );
    }
}

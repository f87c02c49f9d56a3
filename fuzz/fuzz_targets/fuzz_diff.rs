#![no_main]

use libdiffmatch::diff::diff_main;
use libdiffmatch::edit::{source_text, target_text};
use libdiffmatch::{DiffConfig, delta_decode, delta_encode};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (String, String)| {
    let (a, b) = input;
    let config = DiffConfig {
        timeout: 0.1,
        ..Default::default()
    };
    let edits = diff_main(&a, &b, true, &config);
    assert_eq!(source_text(&edits), a);
    assert_eq!(target_text(&edits), b);

    let decoded = delta_decode(&a, &delta_encode(&edits)).expect("delta must decode");
    assert_eq!(decoded, edits);
});

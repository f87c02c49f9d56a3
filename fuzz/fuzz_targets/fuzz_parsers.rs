#![no_main]

use libdiffmatch::{delta_decode, patches_from_text, patches_to_text};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (String, String)| {
    let (text, encoded) = input;
    let _ = delta_decode(&text, &encoded);
    if let Ok(patches) = patches_from_text(&encoded) {
        // Anything that parses has to survive a round trip
        let reparsed = patches_from_text(&patches_to_text(&patches)).expect("reparse");
        assert_eq!(reparsed, patches);
    }
});

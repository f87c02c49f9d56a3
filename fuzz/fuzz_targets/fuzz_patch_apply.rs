#![no_main]

use libdiffmatch::{EngineConfig, patch_apply, patch_make};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (String, String, String)| {
    let (a, b, target) = input;
    let config = EngineConfig::default();
    let patches = patch_make(&a, b.as_str().into(), &config);
    // Applying to arbitrary text must never panic
    let _ = patch_apply(&patches, &target, &config);
});

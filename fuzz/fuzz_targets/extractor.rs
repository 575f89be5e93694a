#![no_main]

use libfuzzer_sys::fuzz_target;

use feedtext::extractor::{classify, normalize_text, Thresholds};
use feedtext::pdf::scan;

fuzz_target!(|data: &[u8]| {
    // Raw bytes go straight to the scanner, which must always return text.
    let scanned = scan(data);
    assert!(!scanned.is_empty());

    let html = String::from_utf8_lossy(data);
    let text = normalize_text(&html);
    let _ = classify(Some(&text), &Thresholds::default());
});

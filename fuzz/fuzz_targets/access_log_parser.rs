#![no_main]

use docktrim::classifier::ClassificationPolicy;
use docktrim::parser::parse_file_accesses;
use docktrim::reducer::parse_file_listing;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Trace logs are read lossily, so any byte sequence is a possible input
    let text = String::from_utf8_lossy(data);

    let accesses = parse_file_accesses(&text);
    let filtered = ClassificationPolicy::default().filter_accessed_files(&accesses);
    assert!(filtered.is_subset(&accesses));

    let _ = parse_file_listing(&text);
});

#![no_main]
use libfuzzer_sys::fuzz_target;
use sentinel_pipeline::normalize;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Should never panic on any UTF-8 input, and must be idempotent:
        // normalizing an already-normalized string is a no-op.
        let once = normalize(s);
        let effective = once.as_deref().unwrap_or(s);
        let twice = normalize(effective);
        assert!(twice.is_none(), "normalize is not idempotent for {s:?}");
    }
});

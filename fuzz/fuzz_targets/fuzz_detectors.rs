#![no_main]
use libfuzzer_sys::fuzz_target;
use sentinel_pipeline::DetectionPipeline;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async {
            let pipeline = DetectionPipeline::with_builtin_detectors().expect("builtin detector set must build");
            // Should never panic, and running the same turn twice must
            // produce the same findings (detectors are side-effect free).
            let first = pipeline.run(s).await;
            let second = pipeline.run(s).await;
            assert_eq!(first.len(), second.len(), "non-deterministic detection for {s:?}");
        });
    }
});

#![no_main]
use libfuzzer_sys::fuzz_target;
use patchwire::{apply_patch, create_patch, ApplyOptions, CreateOptions, NullSink};

fuzz_target!(|data: &[u8]| {
    // Split the arbitrary input into an "old" and "new" text at a byte
    // chosen from the data itself, lossily decoded to UTF-8 (patchwire
    // operates on already-decoded line-oriented text, same as the
    // teacher's frame/block targets operate on already-decoded bytes).
    if data.is_empty() {
        return;
    }
    let split = data[0] as usize % (data.len().max(1));
    let old = String::from_utf8_lossy(&data[..split]).into_owned();
    let new = String::from_utf8_lossy(&data[split..]).into_owned();

    // Default deletion strategy is always anchor-checked, so the patch
    // this produces must always re-apply cleanly.
    let patch = match create_patch(&old, &new, &CreateOptions::default()) {
        Ok(p) => p,
        Err(_) => return,
    };

    let applied = apply_patch(&old, &patch, ApplyOptions::default(), &NullSink)
        .expect("a patch create_patch just emitted must apply cleanly");
    assert_eq!(applied, new, "create/apply round-trip mismatch");
});

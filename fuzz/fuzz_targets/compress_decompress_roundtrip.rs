#![no_main]
use libfuzzer_sys::fuzz_target;
use patchwire::{create_patch, decompress, is_compressed, CreateOptions, NullSink};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    let split = data[0] as usize % (data.len().max(1));
    let old = String::from_utf8_lossy(&data[..split]).into_owned();
    let new = String::from_utf8_lossy(&data[split..]).into_owned();

    let mut options = CreateOptions::default();
    options.compress = true;
    let compressed = match create_patch(&old, &new, &options) {
        Ok(p) => p,
        Err(_) => return,
    };
    if !is_compressed(&compressed) {
        // Small patches aren't worth compressing; create_patch already
        // fell back to the uncompressed form.
        return;
    }

    let recovered = decompress(&compressed, &NullSink).expect("self-compressed patch must decompress");

    let mut uncompressed_options = options;
    uncompressed_options.compress = false;
    let uncompressed = create_patch(&old, &new, &uncompressed_options).expect("uncompressed form must still build");
    assert_eq!(recovered.lines, uncompressed, "compress/decompress round-trip mismatch");
});

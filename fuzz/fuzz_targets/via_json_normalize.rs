//! Fuzz target for VIA JSON parsing and normalization.
//!
//! Feeds arbitrary bytes to the VIA reader and, when they parse, through
//! normalization, mask naming and rendering, checking for panics or hangs.
//!
//! Run with:
//!   cargo +nightly fuzz run via_json_normalize

#![no_main]

use libfuzzer_sys::fuzz_target;
use viamask::normalize::normalize;
use viamask::raster::{output_name, render, CanvasMode, MASK_EXTENSION};
use viamask::via::from_via_slice;

fuzz_target!(|data: &[u8]| {
    // Cap input size to avoid OOM on very large inputs.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(document) = from_via_slice(data) else {
        return;
    };
    if let Ok(records) = normalize(&document) {
        for record in &records {
            let _ = output_name(record, MASK_EXTENSION);
            let mask = render(record, (64, 48), CanvasMode::Bilevel);
            assert_eq!(mask.dimensions(), (64, 48));
        }
    }
});

#![no_main]
use libfuzzer_sys::fuzz_target;
use ninepatch_parse::{Bitmap, NinePatch, Result};

/// Stand-in pixel decoder: a small image whose samples come from the input.
fn pixels(data: &[u8]) -> Result<Bitmap> {
    let width = u32::from(data.get(8).copied().unwrap_or(3) % 16);
    let height = u32::from(data.get(9).copied().unwrap_or(3) % 16);
    let samples: Vec<u32> = (0..width * height)
        .map(|i| match data.get(i as usize).copied().unwrap_or(0) % 3 {
            0 => ninepatch_parse::TRANSPARENT,
            1 => ninepatch_parse::BLACK,
            _ => ninepatch_parse::RED,
        })
        .collect();
    Bitmap::from_argb(width, height, samples.into())
}

fuzz_target!(|data: &[u8]| {
    if let Ok(patch) = NinePatch::decode(data, &pixels) {
        let width: u32 = patch.columns().iter().map(|c| c.size).sum();
        assert_eq!(width, patch.bitmap().width());
        for row in 0..patch.rows().len() {
            for column in 0..patch.columns().len() {
                let _ = patch.cell_bitmap(row, column);
            }
        }
    }
});

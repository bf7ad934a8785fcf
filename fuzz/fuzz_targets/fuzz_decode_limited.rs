#![no_main]
use libfuzzer_sys::fuzz_target;
use ninepatch_parse::{Bitmap, DecodeConfig, NinePatch, Result, Unstoppable};

fn pixels(_: &[u8]) -> Result<Bitmap> {
    Bitmap::from_argb(3, 3, vec![0; 9].into())
}

fuzz_target!(|data: &[u8]| {
    let config = DecodeConfig::default()
        .with_max_chunk_size(1024)
        .with_total_megapixels_limit(1)
        .lenient(true);
    let _ = NinePatch::decode_with_config(data, &pixels, &config, &Unstoppable);
    let _ = ninepatch_parse::read_chunks(&mut &data[..]);
});

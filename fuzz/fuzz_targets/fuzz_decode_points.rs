#![no_main]
use libfuzzer_sys::fuzz_target;
use sunspec_curtail::sunspec::points::{
    PointKind, apply_scale, decode_scale_factor, decode_value, encode_value,
};

fuzz_target!(|data: &[u8]| {
    // Interpret the input as u16 register stream in big-endian pairs
    let regs: Vec<u16> = data
        .chunks_exact(2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .collect();

    for pair in regs.chunks_exact(2) {
        for kind in [PointKind::Int16, PointKind::Uint16] {
            let (Some(value), Some(sf)) = (decode_value(kind, pair[0]), decode_scale_factor(pair[1]))
            else {
                continue;
            };
            let scaled = apply_scale(value, sf);
            let _ = encode_value(kind, scaled, sf);
        }
    }
});

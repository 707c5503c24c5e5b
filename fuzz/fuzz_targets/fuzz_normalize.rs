#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    // First line is the state, the rest the unit symbol
    let (state, unit) = match text.split_once('\n') {
        Some((s, u)) => (s, Some(u)),
        None => (text, None),
    };
    let _ = sunspec_curtail::units::normalize(state, unit);
});

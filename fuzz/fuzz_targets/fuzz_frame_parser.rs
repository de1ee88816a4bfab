#![no_main]
use cop_core::{Frame, parse};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let line = text.trim();
    match parse(line) {
        Frame::Weights(w) => {
            for v in w.as_array() {
                assert!(v.is_finite() && v >= 0.0);
            }
            let (x, y) = w.center_of_pressure();
            assert!(x.is_finite() && y.is_finite());
        }
        Frame::Cop { x, y } => assert!(x.is_finite() && y.is_finite()),
        Frame::Unrecognized { raw } => assert_eq!(raw, line),
    }
});

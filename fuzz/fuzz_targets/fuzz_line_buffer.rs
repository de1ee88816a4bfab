#![no_main]
use cop_serial::util::{LineBuffer, MAX_LINE_BYTES};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|chunks: Vec<Vec<u8>>| {
    let mut buf = LineBuffer::new();
    for chunk in &chunks {
        buf.extend(chunk);
        while let Some(line) = buf.next_line() {
            assert!(line.len() <= MAX_LINE_BYTES);
            assert!(!line.contains(&b'\n'));
        }
    }
});

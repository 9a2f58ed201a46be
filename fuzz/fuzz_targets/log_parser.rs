#![no_main]

use fragua::parser::LogParser;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // The tokenizer and the lifecycle router must survive any byte soup
    // a truncated or interleaved LogCompilation file can contain
    if let Ok(input) = std::str::from_utf8(data) {
        let mut parser = LogParser::new();
        let _ = parser.parse_str(input);
    }
});

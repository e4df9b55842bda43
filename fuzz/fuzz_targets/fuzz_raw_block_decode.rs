#![no_main]

use dao_parser::RawBlock;
use libfuzzer_sys::fuzz_target;

// Block dumps arrive as JSON and peer blocks as bincode; neither decoder may
// panic on malformed input.
fuzz_target!(|data: &[u8]| {
    let _ = bincode::deserialize::<RawBlock>(data);
    let _ = bincode::deserialize::<dao_ledger::Block>(data);
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = serde_json::from_str::<Vec<RawBlock>>(text);
    }
});

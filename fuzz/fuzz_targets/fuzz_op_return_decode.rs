#![no_main]

use libfuzzer_sys::fuzz_target;

// Any bytes in a tx's last output must decode or fail cleanly, and whatever
// decodes must survive an encode/decode pass unchanged.
fuzz_target!(|data: &[u8]| {
    let _ = dao_protocol::op_return::peek_type(data);
    if let Ok(decoded) = dao_protocol::decode(data) {
        let encoded = dao_protocol::encode(&decoded);
        assert_eq!(dao_protocol::decode(&encoded).ok(), Some(decoded));
    }
});

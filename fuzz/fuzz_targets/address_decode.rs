#![no_main]

use libfuzzer_sys::fuzz_target;
use vaporkit_core::address::decode_address;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // A decoded address must encode back to a valid program and address
    if let Ok(address) = decode_address(text) {
        let _ = address.to_program();
        let _ = address.encode();
    }
});

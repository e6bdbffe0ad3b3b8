#![no_main]

use libfuzzer_sys::fuzz_target;
use vaporkit_core::crypto::{decrypt_key, keystore_xpub};

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must come back as an error, never a panic.
    let _ = keystore_xpub(data);
    let _ = decrypt_key(data, "fuzz");
});

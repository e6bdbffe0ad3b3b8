#![no_main]

use libfuzzer_sys::fuzz_target;
use vaporkit_core::network::SIDECHAIN_MAIN;
use vaporkit_tx::annotate::annotate_tx;
use vaporkit_tx::tx::Tx;

fuzz_target!(|data: &[u8]| {
    let Ok(tx) = Tx::decode(data) else {
        return;
    };

    // Re-encoding is canonical, so it must decode to the same transaction
    let again = Tx::decode(&tx.encode()).expect("re-encoded transaction decodes");
    assert_eq!(again, tx);
    let _ = annotate_tx(&tx, &SIDECHAIN_MAIN);
});

#![no_main]

use libfuzzer_sys::fuzz_target;

use bolt11_codec::SignedInvoice;
use std::str::FromStr;

fuzz_target!(|data: &[u8]| {
    // Payment strings come straight from users, decoding must never panic.
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(invoice) = SignedInvoice::from_str(s) {
            assert_eq!(invoice.to_string(), s.to_lowercase());
        }
    }
});

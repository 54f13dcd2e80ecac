mod amount;
mod bits;
mod codec;
mod errors;
mod fallback;
mod invoice_impl;
mod tagged;
mod utils;

pub use amount::{
    shorten_amount, shorten_pico_btc, unshorten_amount, unshorten_pico_btc, SiPrefix,
    PICO_BTC_PER_BTC, PICO_BTC_PER_MSAT,
};
pub use codec::{decode_invoice, encode_invoice, InvoiceSignature, SignedInvoice};
pub use errors::InvoiceError;
pub use fallback::{
    decode_fallback, encode_fallback, FallbackAddress, MAX_WITNESS_VERSION, P2PKH_VERSION,
    P2SH_VERSION,
};
pub use invoice_impl::{Currency, Invoice, InvoiceBuilder, MAX_TIMESTAMP};
pub use tagged::{
    decode_fields, encode_fields, tag_to_char, InvoiceFeatures, RouteHop, TaggedField,
    MAX_FIELD_LENGTH, ROUTE_HOP_LENGTH,
};
pub use utils::{construct_invoice_preimage, invoice_signing_hash, parse_hrp};

#[cfg(test)]
mod tests;

//! Encoding and decoding of BOLT-11 Lightning invoices.

mod config;
pub use config::{
    InvoiceConfig, DEFAULT_CURRENCY, DEFAULT_EXPIRY_TIME, DEFAULT_MIN_FINAL_CLTV_EXPIRY,
};

pub mod invoice;
pub use invoice::{
    decode_invoice, encode_invoice, Currency, Invoice, InvoiceBuilder, InvoiceError,
    SignedInvoice,
};

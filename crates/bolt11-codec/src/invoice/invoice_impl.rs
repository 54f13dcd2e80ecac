use super::amount::shorten_amount;
use super::bits::U5Writer;
use super::fallback::FallbackAddress;
use super::tagged::{write_field, InvoiceFeatures, RouteHop, TaggedField, MAX_FIELD_LENGTH};
use super::utils::invoice_signing_hash;
use super::InvoiceError;
use crate::config::{InvoiceConfig, DEFAULT_EXPIRY_TIME, DEFAULT_MIN_FINAL_CLTV_EXPIRY};
use bech32::u5;
use secp256k1::{ecdsa::RecoverableSignature, Message, PublicKey};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use tracing::debug;

pub(crate) const MAX_DESCRIPTION_LENGTH: usize = 639;
pub(crate) const TIMESTAMP_U5_SIZE: usize = 7;
pub const MAX_TIMESTAMP: u64 = (1 << 35) - 1;

/// The network an invoice pays on, written after `ln` in the human readable part.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "bc")]
    Bitcoin,
    #[serde(rename = "tb")]
    BitcoinTestnet,
    #[serde(rename = "bcrt")]
    Regtest,
    #[serde(rename = "sb")]
    Simnet,
    #[serde(rename = "tbs")]
    Signet,
}

impl Currency {
    pub fn all() -> [Currency; 5] {
        [
            Currency::Bitcoin,
            Currency::BitcoinTestnet,
            Currency::Regtest,
            Currency::Simnet,
            Currency::Signet,
        ]
    }

    /// Prefix of segwit addresses on this network.
    pub fn segwit_hrp(&self) -> &'static str {
        match self {
            Currency::Bitcoin => "bc",
            Currency::BitcoinTestnet | Currency::Signet => "tb",
            Currency::Regtest => "bcrt",
            Currency::Simnet => "sb",
        }
    }

    /// Base58Check version bytes of P2PKH and P2SH addresses on this network.
    pub fn base58_versions(&self) -> (u8, u8) {
        match self {
            Currency::Bitcoin => (0, 5),
            Currency::BitcoinTestnet | Currency::Regtest | Currency::Signet => (111, 196),
            Currency::Simnet => (63, 123),
        }
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::Bitcoin => write!(f, "bc"),
            Currency::BitcoinTestnet => write!(f, "tb"),
            Currency::Regtest => write!(f, "bcrt"),
            Currency::Simnet => write!(f, "sb"),
            Currency::Signet => write!(f, "tbs"),
        }
    }
}

impl FromStr for Currency {
    type Err = InvoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bc" => Ok(Self::Bitcoin),
            "tb" => Ok(Self::BitcoinTestnet),
            "bcrt" => Ok(Self::Regtest),
            "sb" => Ok(Self::Simnet),
            "tbs" => Ok(Self::Signet),
            _ => Err(InvoiceError::UnknownCurrency(s.to_string())),
        }
    }
}

/// An unsigned BOLT-11 invoice.
///
/// There are two ways to obtain one:
///  1. using [`InvoiceBuilder`]
///  2. decoding a signed invoice and calling [`super::SignedInvoice::into_unsigned`]
///
/// Fields are only reachable through accessors, sign it with [`Invoice::sign`] to get
/// something that can be encoded.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Invoice {
    currency: Currency,
    amount_msat: Option<u64>,
    timestamp: u64,
    tags: Vec<TaggedField>,
}

macro_rules! attr_getter {
    ($name:ident, $variant:ident, $attr:ty) => {
        pub fn $name(&self) -> Option<&$attr> {
            self.tags.iter().find_map(|tag| match tag {
                TaggedField::$variant(val) => Some(val),
                _ => None,
            })
        }
    };
}

impl Invoice {
    pub(crate) fn from_parts(
        currency: Currency,
        amount_msat: Option<u64>,
        timestamp: u64,
        tags: Vec<TaggedField>,
    ) -> Self {
        Invoice {
            currency,
            amount_msat,
            timestamp,
            tags,
        }
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Amount requested, `None` lets the payer choose.
    pub fn amount_milli_satoshis(&self) -> Option<u64> {
        self.amount_msat
    }

    /// Seconds since the unix epoch.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// All fields in serialization order.
    pub fn tags(&self) -> &[TaggedField] {
        &self.tags
    }

    attr_getter!(payment_hash, PaymentHash, [u8; 32]);
    attr_getter!(payment_secret, PaymentSecret, [u8; 32]);
    attr_getter!(description, Description, String);
    attr_getter!(description_hash, DescriptionHash, [u8; 32]);
    attr_getter!(payee_pub_key, PayeePubKey, PublicKey);
    attr_getter!(features, Features, InvoiceFeatures);
    attr_getter!(payment_metadata, PaymentMetadata, Vec<u8>);

    pub fn expiry_time(&self) -> u64 {
        self.tags
            .iter()
            .find_map(|tag| match tag {
                TaggedField::ExpiryTime(value) => Some(*value),
                _ => None,
            })
            .unwrap_or(DEFAULT_EXPIRY_TIME)
    }

    pub fn min_final_cltv_expiry(&self) -> u64 {
        self.tags
            .iter()
            .find_map(|tag| match tag {
                TaggedField::MinFinalCltvExpiry(value) => Some(*value),
                _ => None,
            })
            .unwrap_or(DEFAULT_MIN_FINAL_CLTV_EXPIRY)
    }

    pub fn fallbacks(&self) -> Vec<&FallbackAddress> {
        self.tags
            .iter()
            .filter_map(|tag| match tag {
                TaggedField::Fallback(address) => Some(address),
                _ => None,
            })
            .collect()
    }

    /// Fallbacks rendered as address strings for this invoice's network.
    pub fn fallback_addresses(&self) -> Result<Vec<String>, InvoiceError> {
        self.fallbacks()
            .into_iter()
            .map(|address| address.to_address(self.currency))
            .collect()
    }

    /// One entry per `r` field, each a path of hops.
    pub fn routing_hints(&self) -> Vec<&[RouteHop]> {
        self.tags
            .iter()
            .filter_map(|tag| match tag {
                TaggedField::RoutingHint(hops) => Some(hops.as_slice()),
                _ => None,
            })
            .collect()
    }

    /// Whether the invoice has expired at `now`, in seconds since the unix epoch.
    pub fn is_expired_at(&self, now: u64) -> bool {
        now > self.timestamp.saturating_add(self.expiry_time())
    }

    pub fn is_expired(&self) -> bool {
        let now = std::time::UNIX_EPOCH
            .elapsed()
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        self.is_expired_at(now)
    }

    /// Checks the invariants every signed invoice has to satisfy.
    pub fn validate(&self) -> Result<(), InvoiceError> {
        if self.timestamp > MAX_TIMESTAMP {
            return Err(InvoiceError::InvariantViolation(format!(
                "timestamp {} does not fit in 35 bits",
                self.timestamp
            )));
        }

        let payment_hashes = self
            .tags
            .iter()
            .filter(|tag| matches!(tag, TaggedField::PaymentHash(_)))
            .count();
        if payment_hashes != 1 {
            return Err(InvoiceError::InvariantViolation(format!(
                "expected exactly one payment hash, found {}",
                payment_hashes
            )));
        }

        match (self.description(), self.description_hash()) {
            (Some(_), Some(_)) => {
                return Err(InvoiceError::InvariantViolation(
                    "both description and description hash are set".to_string(),
                ))
            }
            (None, None) => {
                return Err(InvoiceError::InvariantViolation(
                    "one of description or description hash is required".to_string(),
                ))
            }
            _ => {}
        }

        // check is there any duplicate single-valued field
        for (i, tag) in self.tags.iter().enumerate() {
            if tag.is_repeatable() {
                continue;
            }
            for other in self.tags.iter().skip(i + 1) {
                if std::mem::discriminant(tag) == std::mem::discriminant(other) {
                    return Err(InvoiceError::InvariantViolation(format!(
                        "duplicated `{}` field",
                        super::tagged::tag_to_char(tag.tag())
                    )));
                }
            }
        }

        if let Some(description) = self.description() {
            if description.len() > MAX_DESCRIPTION_LENGTH {
                return Err(InvoiceError::InvariantViolation(format!(
                    "description of {} bytes exceeds {}",
                    description.len(),
                    MAX_DESCRIPTION_LENGTH
                )));
            }
        }

        for tag in &self.tags {
            match tag {
                TaggedField::Fallback(address) => {
                    address.to_address(self.currency)?;
                }
                // a reader must see the same field list that was signed
                TaggedField::Unknown { tag, data } => {
                    if !matches!(
                        TaggedField::from_payload(*tag, data),
                        Ok(TaggedField::Unknown { .. })
                    ) {
                        return Err(InvoiceError::InvariantViolation(format!(
                            "unknown field would decode as a known `{}` field",
                            super::tagged::tag_to_char(*tag)
                        )));
                    }
                }
                _ => {}
            }
            let length = tag.payload().len();
            if length > MAX_FIELD_LENGTH {
                return Err(InvoiceError::InvariantViolation(format!(
                    "`{}` field has {} groups, at most {} fit",
                    super::tagged::tag_to_char(tag.tag()),
                    length,
                    MAX_FIELD_LENGTH
                )));
            }
        }

        Ok(())
    }

    /// `ln` + currency + optional short amount.
    pub fn hrp_part(&self) -> String {
        format!(
            "ln{}{}",
            self.currency,
            self.amount_msat.map(shorten_amount).unwrap_or_default()
        )
    }

    /// Timestamp followed by every tagged field, without the signature.
    pub fn data_part(&self) -> Result<Vec<u5>, InvoiceError> {
        let mut writer = U5Writer::new();
        writer.write_bits(self.timestamp, (TIMESTAMP_U5_SIZE * 5) as u8);
        debug_assert_eq!(writer.bit_len(), TIMESTAMP_U5_SIZE * 5);
        for tag in &self.tags {
            write_field(tag, &mut writer)?;
        }
        Ok(writer.finish())
    }

    /// Digest the payee signs: sha256 over the hrp bytes and the zero padded data part.
    pub fn signing_hash(&self) -> Result<[u8; 32], InvoiceError> {
        let hrp = self.hrp_part();
        let data = self.data_part()?;
        Ok(invoice_signing_hash(hrp.as_bytes(), &data))
    }
}

pub struct InvoiceBuilder {
    currency: Currency,
    amount_msat: Option<u64>,
    timestamp: Option<u64>,
    tags: Vec<TaggedField>,
    error: Option<InvoiceError>,
}

impl Default for InvoiceBuilder {
    fn default() -> Self {
        Self::new(Currency::Bitcoin)
    }
}

macro_rules! attr_setter {
    ($name:ident, $variant:ident, $param:ty) => {
        pub fn $name(self, value: $param) -> Self {
            self.set_tag(TaggedField::$variant(value))
        }
    };
}

impl InvoiceBuilder {
    pub fn new(currency: Currency) -> Self {
        Self {
            currency,
            amount_msat: None,
            timestamp: None,
            tags: Vec::new(),
            error: None,
        }
    }

    /// Seeds a builder with the network and default fields of `config`.
    pub fn from_config(config: &InvoiceConfig) -> Self {
        let mut builder = Self::new(config.currency());
        let expiry_time = config.expiry_time();
        if config.explicit_expiry_time() || expiry_time != DEFAULT_EXPIRY_TIME {
            builder = builder.expiry_time(expiry_time);
        }
        let min_final_cltv_expiry = config.min_final_cltv_expiry();
        if config.explicit_min_final_cltv_expiry()
            || min_final_cltv_expiry != DEFAULT_MIN_FINAL_CLTV_EXPIRY
        {
            builder = builder.min_final_cltv_expiry(min_final_cltv_expiry);
        }
        builder
    }

    pub fn amount_milli_satoshis(mut self, amount_msat: u64) -> Self {
        self.amount_msat = Some(amount_msat);
        self
    }

    /// Seconds since the unix epoch, the current time is used when unset.
    pub fn timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Appends a field as is, repeated single-valued fields are rejected by `build`.
    pub fn add_tag(mut self, tag: TaggedField) -> Self {
        self.tags.push(tag);
        self
    }

    /// Replaces a previous field of the same kind in place, or appends it.
    fn set_tag(mut self, tag: TaggedField) -> Self {
        let existing = if tag.is_repeatable() {
            None
        } else {
            self.tags
                .iter()
                .position(|t| std::mem::discriminant(t) == std::mem::discriminant(&tag))
        };
        match existing {
            Some(index) => self.tags[index] = tag,
            None => self.tags.push(tag),
        }
        self
    }

    attr_setter!(payment_hash, PaymentHash, [u8; 32]);
    attr_setter!(payment_secret, PaymentSecret, [u8; 32]);
    attr_setter!(description, Description, String);
    attr_setter!(description_hash, DescriptionHash, [u8; 32]);
    attr_setter!(payee_pub_key, PayeePubKey, PublicKey);
    attr_setter!(expiry_time, ExpiryTime, u64);
    attr_setter!(min_final_cltv_expiry, MinFinalCltvExpiry, u64);
    attr_setter!(features, Features, InvoiceFeatures);
    attr_setter!(payment_metadata, PaymentMetadata, Vec<u8>);

    pub fn fallback(self, address: FallbackAddress) -> Self {
        self.add_tag(TaggedField::Fallback(address))
    }

    /// Parses `address` against the builder's current network. A failure is
    /// reported by `build`.
    pub fn fallback_address(mut self, address: &str) -> Self {
        match FallbackAddress::parse(address, self.currency) {
            Ok(address) => self.fallback(address),
            Err(err) => {
                if self.error.is_none() {
                    self.error = Some(err);
                }
                self
            }
        }
    }

    pub fn routing_hint(self, hops: Vec<RouteHop>) -> Self {
        self.add_tag(TaggedField::RoutingHint(hops))
    }

    pub fn build(self) -> Result<Invoice, InvoiceError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let timestamp = match self.timestamp {
            Some(timestamp) => timestamp,
            None => std::time::UNIX_EPOCH
                .elapsed()
                .map_err(|e| InvoiceError::InvariantViolation(e.to_string()))?
                .as_secs(),
        };
        let invoice = Invoice::from_parts(self.currency, self.amount_msat, timestamp, self.tags);
        invoice.validate()?;
        debug!(
            "built invoice for `{}` with {} fields",
            invoice.currency,
            invoice.tags.len()
        );
        Ok(invoice)
    }

    pub fn build_with_sign<F>(self, sign_function: F) -> Result<super::SignedInvoice, InvoiceError>
    where
        F: FnOnce(&Message) -> RecoverableSignature,
    {
        self.build()?.sign(sign_function)
    }
}

//! Tagged fields of the data part.
//!
//! Every field is laid out as a 5-bit type, a 10-bit payload length counted in
//! 5-bit groups, then the payload itself.

use super::bits::{encode_int_be_base32, parse_int_be_base32, U5Reader, U5Writer};
use super::fallback::FallbackAddress;
use super::InvoiceError;
use bech32::{u5, FromBase32, ToBase32};
use secp256k1::PublicKey;
use tracing::{trace, warn};

pub const TAG_PAYMENT_HASH: u8 = 1;
pub const TAG_ROUTING_HINT: u8 = 3;
pub const TAG_FEATURES: u8 = 5;
pub const TAG_EXPIRY_TIME: u8 = 6;
pub const TAG_FALLBACK: u8 = 9;
pub const TAG_DESCRIPTION: u8 = 13;
pub const TAG_PAYMENT_SECRET: u8 = 16;
pub const TAG_PAYEE_PUB_KEY: u8 = 19;
pub const TAG_DESCRIPTION_HASH: u8 = 23;
pub const TAG_MIN_FINAL_CLTV_EXPIRY: u8 = 24;
pub const TAG_PAYMENT_METADATA: u8 = 27;

/// Largest payload a 10-bit length can describe.
pub const MAX_FIELD_LENGTH: usize = 1023;
/// Size of the type and length header in groups.
pub const FIELD_HEADER_LENGTH: usize = 3;

pub(crate) const HASH_U5_LENGTH: usize = 52;
pub(crate) const PUB_KEY_U5_LENGTH: usize = 53;

const BECH32_CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// The letter a tag code is written as.
pub fn tag_to_char(tag: u5) -> char {
    BECH32_CHARSET[tag.to_u8() as usize] as char
}

pub const ROUTE_HOP_LENGTH: usize = 51;

/// One private channel the payer may route through to reach the payee.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RouteHop {
    pub node_id: PublicKey,
    pub short_channel_id: u64,
    pub fee_base_msat: u32,
    pub fee_proportional_millionths: u32,
    pub cltv_expiry_delta: u16,
}

impl RouteHop {
    fn write_bytes(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.node_id.serialize());
        out.extend_from_slice(&self.short_channel_id.to_be_bytes());
        out.extend_from_slice(&self.fee_base_msat.to_be_bytes());
        out.extend_from_slice(&self.fee_proportional_millionths.to_be_bytes());
        out.extend_from_slice(&self.cltv_expiry_delta.to_be_bytes());
    }

    fn from_bytes(record: &[u8; ROUTE_HOP_LENGTH]) -> Result<Self, InvoiceError> {
        let node_id = PublicKey::from_slice(&record[0..33])
            .map_err(|e| InvoiceError::MalformedTag(format!("invalid hop node id: {}", e)))?;
        let mut short_channel_id = [0u8; 8];
        short_channel_id.copy_from_slice(&record[33..41]);
        let mut fee_base_msat = [0u8; 4];
        fee_base_msat.copy_from_slice(&record[41..45]);
        let mut fee_proportional_millionths = [0u8; 4];
        fee_proportional_millionths.copy_from_slice(&record[45..49]);
        let mut cltv_expiry_delta = [0u8; 2];
        cltv_expiry_delta.copy_from_slice(&record[49..51]);
        Ok(RouteHop {
            node_id,
            short_channel_id: u64::from_be_bytes(short_channel_id),
            fee_base_msat: u32::from_be_bytes(fee_base_msat),
            fee_proportional_millionths: u32::from_be_bytes(fee_proportional_millionths),
            cltv_expiry_delta: u16::from_be_bytes(cltv_expiry_delta),
        })
    }
}

/// Feature bits of the `9` field.
///
/// The raw groups are kept as received so an invoice re-encodes unchanged. Bit 0 is
/// the least significant bit of the last group.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct InvoiceFeatures(Vec<u5>);

impl InvoiceFeatures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_u5s(groups: Vec<u5>) -> Self {
        InvoiceFeatures(groups)
    }

    pub fn as_u5s(&self) -> &[u5] {
        &self.0
    }

    pub fn supports(&self, bit: usize) -> bool {
        let index = bit / 5;
        if index >= self.0.len() {
            return false;
        }
        let group = self.0[self.0.len() - 1 - index].to_u8();
        (group >> (bit % 5)) & 1 == 1
    }

    pub fn set(&mut self, bit: usize) {
        let index = bit / 5;
        if index >= self.0.len() {
            let missing = index + 1 - self.0.len();
            let zero = u5::try_from_u8(0).expect("0 < 32");
            self.0.splice(0..0, std::iter::repeat(zero).take(missing));
        }
        let position = self.0.len() - 1 - index;
        let group = self.0[position].to_u8() | (1 << (bit % 5));
        self.0[position] = u5::try_from_u8(group).expect("<32");
    }

    /// Builder-style variant of [`InvoiceFeatures::set`].
    pub fn with(mut self, bit: usize) -> Self {
        self.set(bit);
        self
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TaggedField {
    PaymentHash([u8; 32]),
    PaymentSecret([u8; 32]),
    Description(String),
    DescriptionHash([u8; 32]),
    PayeePubKey(PublicKey),
    ExpiryTime(u64),
    MinFinalCltvExpiry(u64),
    Fallback(FallbackAddress),
    RoutingHint(Vec<RouteHop>),
    Features(InvoiceFeatures),
    PaymentMetadata(Vec<u8>),
    /// A field this codec does not interpret, kept with its raw payload.
    Unknown { tag: u5, data: Vec<u5> },
}

fn to_hash(payload: &[u5]) -> Result<[u8; 32], InvoiceError> {
    let bytes = Vec::<u8>::from_base32(payload)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| InvoiceError::MalformedTag(format!("{} byte hash", bytes.len())))
}

fn to_int(payload: &[u5]) -> Result<u64, InvoiceError> {
    parse_int_be_base32(payload)
        .ok_or_else(|| InvoiceError::MalformedTag("integer does not fit in 64 bits".to_string()))
}

impl TaggedField {
    pub fn tag(&self) -> u5 {
        let code = match self {
            TaggedField::PaymentHash(_) => TAG_PAYMENT_HASH,
            TaggedField::PaymentSecret(_) => TAG_PAYMENT_SECRET,
            TaggedField::Description(_) => TAG_DESCRIPTION,
            TaggedField::DescriptionHash(_) => TAG_DESCRIPTION_HASH,
            TaggedField::PayeePubKey(_) => TAG_PAYEE_PUB_KEY,
            TaggedField::ExpiryTime(_) => TAG_EXPIRY_TIME,
            TaggedField::MinFinalCltvExpiry(_) => TAG_MIN_FINAL_CLTV_EXPIRY,
            TaggedField::Fallback(_) => TAG_FALLBACK,
            TaggedField::RoutingHint(_) => TAG_ROUTING_HINT,
            TaggedField::Features(_) => TAG_FEATURES,
            TaggedField::PaymentMetadata(_) => TAG_PAYMENT_METADATA,
            TaggedField::Unknown { tag, .. } => return *tag,
        };
        u5::try_from_u8(code).expect("tag codes are < 32")
    }

    /// Whether the field may appear more than once in an invoice.
    pub fn is_repeatable(&self) -> bool {
        matches!(
            self,
            TaggedField::Fallback(_) | TaggedField::RoutingHint(_) | TaggedField::Unknown { .. }
        )
    }

    /// The payload as 5-bit groups, without the type and length header.
    pub fn payload(&self) -> Vec<u5> {
        match self {
            TaggedField::PaymentHash(hash)
            | TaggedField::PaymentSecret(hash)
            | TaggedField::DescriptionHash(hash) => hash.to_base32(),
            TaggedField::Description(description) => description.as_bytes().to_base32(),
            TaggedField::PayeePubKey(pub_key) => pub_key.serialize().to_base32(),
            TaggedField::ExpiryTime(value) | TaggedField::MinFinalCltvExpiry(value) => {
                encode_int_be_base32(*value)
            }
            TaggedField::Fallback(address) => address.to_base32(),
            TaggedField::RoutingHint(hops) => {
                let mut bytes = Vec::with_capacity(hops.len() * ROUTE_HOP_LENGTH);
                for hop in hops {
                    hop.write_bytes(&mut bytes);
                }
                let mut writer = U5Writer::new();
                writer.write_bytes(&bytes);
                writer.finish()
            }
            TaggedField::Features(features) => features.as_u5s().to_vec(),
            TaggedField::PaymentMetadata(metadata) => metadata.to_base32(),
            TaggedField::Unknown { data, .. } => data.clone(),
        }
    }

    /// Interprets a payload. Known tags whose payload breaks the length rules are
    /// kept as [`TaggedField::Unknown`] so readers can skip them.
    pub fn from_payload(tag: u5, payload: &[u5]) -> Result<TaggedField, InvoiceError> {
        let unknown = || TaggedField::Unknown {
            tag,
            data: payload.to_vec(),
        };
        let demote = |expected: usize| -> Result<TaggedField, InvoiceError> {
            warn!(
                "skipping `{}` field with {} groups, expected {}",
                tag_to_char(tag),
                payload.len(),
                expected
            );
            Ok(unknown())
        };
        let field = match tag.to_u8() {
            TAG_PAYMENT_HASH | TAG_PAYMENT_SECRET | TAG_DESCRIPTION_HASH
                if payload.len() != HASH_U5_LENGTH =>
            {
                return demote(HASH_U5_LENGTH)
            }
            TAG_PAYMENT_HASH => TaggedField::PaymentHash(to_hash(payload)?),
            TAG_PAYMENT_SECRET => TaggedField::PaymentSecret(to_hash(payload)?),
            TAG_DESCRIPTION_HASH => TaggedField::DescriptionHash(to_hash(payload)?),
            TAG_PAYEE_PUB_KEY if payload.len() != PUB_KEY_U5_LENGTH => {
                return demote(PUB_KEY_U5_LENGTH)
            }
            TAG_PAYEE_PUB_KEY => {
                let bytes = Vec::<u8>::from_base32(payload)?;
                let pub_key = PublicKey::from_slice(&bytes).map_err(|e| {
                    InvoiceError::MalformedTag(format!("invalid payee public key: {}", e))
                })?;
                TaggedField::PayeePubKey(pub_key)
            }
            TAG_DESCRIPTION => {
                let bytes = Vec::<u8>::from_base32(payload)?;
                let description = String::from_utf8(bytes).map_err(|e| {
                    InvoiceError::MalformedTag(format!("description is not utf-8: {}", e))
                })?;
                TaggedField::Description(description)
            }
            TAG_EXPIRY_TIME => TaggedField::ExpiryTime(to_int(payload)?),
            TAG_MIN_FINAL_CLTV_EXPIRY => TaggedField::MinFinalCltvExpiry(to_int(payload)?),
            TAG_FALLBACK => match FallbackAddress::from_base32(payload) {
                Ok(address) => TaggedField::Fallback(address),
                Err(
                    err @ (InvoiceError::UnknownAddressType(_)
                    | InvoiceError::InvalidWitnessProgram { .. }),
                ) => {
                    warn!("skipping fallback address: {}", err);
                    unknown()
                }
                Err(err) => return Err(err),
            },
            TAG_ROUTING_HINT => {
                let bytes = Vec::<u8>::from_base32(payload)?;
                if bytes.len() % ROUTE_HOP_LENGTH != 0 {
                    return Err(InvoiceError::MalformedRouteHint(bytes.len()));
                }
                let hops = bytes
                    .chunks_exact(ROUTE_HOP_LENGTH)
                    .map(|record| {
                        let mut hop = [0u8; ROUTE_HOP_LENGTH];
                        hop.copy_from_slice(record);
                        RouteHop::from_bytes(&hop)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                TaggedField::RoutingHint(hops)
            }
            TAG_FEATURES => TaggedField::Features(InvoiceFeatures::from_u5s(payload.to_vec())),
            TAG_PAYMENT_METADATA => TaggedField::PaymentMetadata(Vec::<u8>::from_base32(payload)?),
            _ => unknown(),
        };
        Ok(field)
    }
}

/// Appends the type, length and payload of `field`.
pub(crate) fn write_field(field: &TaggedField, writer: &mut U5Writer) -> Result<(), InvoiceError> {
    if let TaggedField::Fallback(address) = field {
        address.check()?;
    }
    let payload = field.payload();
    if payload.len() > MAX_FIELD_LENGTH {
        return Err(InvoiceError::InvariantViolation(format!(
            "`{}` field has {} groups, at most {} fit",
            tag_to_char(field.tag()),
            payload.len(),
            MAX_FIELD_LENGTH
        )));
    }
    writer.write_u5(field.tag());
    writer.write_bits(payload.len() as u64, 10);
    writer.write_u5_slice(&payload);
    Ok(())
}

/// Serializes fields back to back in the given order.
pub fn encode_fields(fields: &[TaggedField]) -> Result<Vec<u5>, InvoiceError> {
    let mut writer = U5Writer::new();
    for field in fields {
        write_field(field, &mut writer)?;
    }
    Ok(writer.finish())
}

/// Reads fields until `data` is exhausted.
///
/// `base_offset` is the group offset of `data` inside the data part and is only used
/// to locate errors.
pub fn decode_fields(data: &[u5], base_offset: usize) -> Result<Vec<TaggedField>, InvoiceError> {
    let mut reader = U5Reader::new(data);
    let mut fields = Vec::new();
    while !reader.is_empty() {
        let offset = base_offset + reader.group_pos();
        let available = reader.remaining_groups();
        if available < FIELD_HEADER_LENGTH {
            return Err(InvoiceError::TruncatedTag {
                offset,
                needed: FIELD_HEADER_LENGTH,
                available,
            });
        }
        let tag = reader.read_bits(5).expect("header length checked") as u8;
        let tag = u5::try_from_u8(tag).expect("5 bits are < 32");
        let length = reader.read_bits(10).expect("header length checked") as usize;
        let available = reader.remaining_groups();
        let payload = reader
            .read_groups(length)
            .ok_or(InvoiceError::TruncatedTag {
                offset,
                needed: length,
                available,
            })?;
        let field = TaggedField::from_payload(tag, payload)
            .map_err(|e| e.in_field(tag_to_char(tag), offset))?;
        trace!("decoded `{}` field of {} groups at {}", tag_to_char(tag), length, offset);
        fields.push(field);
    }
    Ok(fields)
}

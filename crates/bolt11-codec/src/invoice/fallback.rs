//! On-chain fallback addresses carried by the `f` tag.
//!
//! The first group of the payload is a version: 0 to 16 are segwit witness versions,
//! 17 and 18 stand for legacy P2PKH and P2SH. The rest is the witness program or
//! the 20-byte hash.

use super::invoice_impl::Currency;
use super::InvoiceError;
use bech32::{u5, FromBase32, ToBase32, Variant, WriteBase32};
use bitcoin::base58;
use tracing::trace;

pub const MAX_WITNESS_VERSION: u8 = 16;
pub const P2PKH_VERSION: u8 = 17;
pub const P2SH_VERSION: u8 = 18;

const HASH_LENGTH: usize = 20;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum FallbackAddress {
    /// Witness versions above 16 fail [`FallbackAddress::check`].
    SegWitProgram { version: u5, program: Vec<u8> },
    PubKeyHash([u8; HASH_LENGTH]),
    ScriptHash([u8; HASH_LENGTH]),
}

fn check_witness_program(version: u8, program: &[u8]) -> Result<(), InvoiceError> {
    let valid = match version {
        0 => program.len() == 20 || program.len() == 32,
        1..=MAX_WITNESS_VERSION => (2..=40).contains(&program.len()),
        _ => return Err(InvoiceError::UnsupportedWitnessVersion(version)),
    };
    if !valid {
        return Err(InvoiceError::InvalidWitnessProgram {
            version,
            length: program.len(),
        });
    }
    Ok(())
}

fn witness_variant(version: u8) -> Variant {
    if version == 0 {
        Variant::Bech32
    } else {
        Variant::Bech32m
    }
}

fn to_hash(bytes: &[u8]) -> Result<[u8; HASH_LENGTH], InvoiceError> {
    bytes.try_into().map_err(|_| {
        InvoiceError::MalformedTag(format!(
            "legacy fallback carries {} bytes, expected {}",
            bytes.len(),
            HASH_LENGTH
        ))
    })
}

/// Segwit addresses are recognized by a known segwit prefix followed by the separator.
fn looks_like_segwit(address: &str) -> bool {
    let lower = address.to_lowercase();
    Currency::all().iter().any(|currency| {
        lower
            .strip_prefix(currency.segwit_hrp())
            .map_or(false, |rest| rest.starts_with('1'))
    })
}

impl FallbackAddress {
    /// Parses an address string, checking it belongs to the network of `currency`.
    pub fn parse(address: &str, currency: Currency) -> Result<Self, InvoiceError> {
        if looks_like_segwit(address) {
            Self::parse_segwit(address, currency)
        } else {
            Self::parse_base58(address, currency)
        }
    }

    fn parse_segwit(address: &str, currency: Currency) -> Result<Self, InvoiceError> {
        let (hrp, data, variant) = bech32::decode(address)?;
        if hrp != currency.segwit_hrp() {
            return Err(InvoiceError::NetworkMismatch {
                expected: currency.segwit_hrp().to_string(),
                found: hrp,
            });
        }
        let (&version, program) = data
            .split_first()
            .ok_or(InvoiceError::InvalidWitnessProgram {
                version: 0,
                length: 0,
            })?;
        if version.to_u8() > MAX_WITNESS_VERSION {
            return Err(InvoiceError::UnsupportedWitnessVersion(version.to_u8()));
        }
        let program = Vec::<u8>::from_base32(program)?;
        check_witness_program(version.to_u8(), &program)?;
        if variant != witness_variant(version.to_u8()) {
            return Err(InvoiceError::BadChecksum);
        }
        trace!(
            "parsed segwit v{} fallback of {} bytes",
            version.to_u8(),
            program.len()
        );
        Ok(FallbackAddress::SegWitProgram { version, program })
    }

    fn parse_base58(address: &str, currency: Currency) -> Result<Self, InvoiceError> {
        let payload = base58::decode_check(address).map_err(|err| match err {
            base58::Error::BadChecksum(..) => InvoiceError::BadChecksum,
            base58::Error::BadByte(b) => {
                InvoiceError::BadCharset(format!("invalid base58 character `{}`", b as char))
            }
            other => InvoiceError::UnknownAddressType(other.to_string()),
        })?;
        let (version, hash) = payload
            .split_first()
            .ok_or_else(|| InvoiceError::UnknownAddressType(address.to_string()))?;
        let (p2pkh, p2sh) = currency.base58_versions();
        let hash = to_hash(hash)?;
        if *version == p2pkh {
            Ok(FallbackAddress::PubKeyHash(hash))
        } else if *version == p2sh {
            Ok(FallbackAddress::ScriptHash(hash))
        } else {
            Err(InvoiceError::UnknownAddressType(format!(
                "{}, version byte {} is not known for `{}`",
                address, version, currency
            )))
        }
    }

    /// Checks a segwit version and program length, legacy hashes are always well formed.
    pub fn check(&self) -> Result<(), InvoiceError> {
        match self {
            FallbackAddress::SegWitProgram { version, program } => {
                check_witness_program(version.to_u8(), program)
            }
            FallbackAddress::PubKeyHash(_) | FallbackAddress::ScriptHash(_) => Ok(()),
        }
    }

    /// Renders the address for the network of `currency`.
    pub fn to_address(&self, currency: Currency) -> Result<String, InvoiceError> {
        self.check()?;
        match self {
            FallbackAddress::SegWitProgram { version, program } => {
                let mut data = vec![*version];
                data.extend_from_slice(&program.to_base32());
                Ok(bech32::encode(
                    currency.segwit_hrp(),
                    data,
                    witness_variant(version.to_u8()),
                )?)
            }
            FallbackAddress::PubKeyHash(hash) => {
                Ok(Self::encode_base58(currency.base58_versions().0, hash))
            }
            FallbackAddress::ScriptHash(hash) => {
                Ok(Self::encode_base58(currency.base58_versions().1, hash))
            }
        }
    }

    fn encode_base58(version: u8, hash: &[u8; HASH_LENGTH]) -> String {
        let mut payload = Vec::with_capacity(HASH_LENGTH + 1);
        payload.push(version);
        payload.extend_from_slice(hash);
        base58::encode_check(&payload)
    }

    /// The value of the leading version group.
    pub fn version(&self) -> u8 {
        match self {
            FallbackAddress::SegWitProgram { version, .. } => version.to_u8(),
            FallbackAddress::PubKeyHash(_) => P2PKH_VERSION,
            FallbackAddress::ScriptHash(_) => P2SH_VERSION,
        }
    }

    pub(crate) fn from_base32(payload: &[u5]) -> Result<Self, InvoiceError> {
        let (&version, rest) = payload
            .split_first()
            .ok_or_else(|| InvoiceError::MalformedTag("empty fallback address".to_string()))?;
        if version.to_u8() > P2SH_VERSION {
            return Err(InvoiceError::UnknownAddressType(format!(
                "fallback version {}",
                version.to_u8()
            )));
        }
        let bytes = Vec::<u8>::from_base32(rest)?;
        match version.to_u8() {
            P2PKH_VERSION => Ok(FallbackAddress::PubKeyHash(to_hash(&bytes)?)),
            P2SH_VERSION => Ok(FallbackAddress::ScriptHash(to_hash(&bytes)?)),
            _ => {
                check_witness_program(version.to_u8(), &bytes)?;
                Ok(FallbackAddress::SegWitProgram {
                    version,
                    program: bytes,
                })
            }
        }
    }
}

impl ToBase32 for FallbackAddress {
    fn write_base32<W: WriteBase32>(&self, writer: &mut W) -> Result<(), <W as WriteBase32>::Err> {
        match self {
            FallbackAddress::SegWitProgram { version, program } => {
                writer.write_u5(*version)?;
                program.write_base32(writer)
            }
            FallbackAddress::PubKeyHash(hash) => {
                writer.write_u5(u5::try_from_u8(P2PKH_VERSION).expect("17 < 32"))?;
                hash.write_base32(writer)
            }
            FallbackAddress::ScriptHash(hash) => {
                writer.write_u5(u5::try_from_u8(P2SH_VERSION).expect("18 < 32"))?;
                hash.write_base32(writer)
            }
        }
    }
}

/// Converts an address string into the payload of an `f` tag.
pub fn encode_fallback(address: &str, currency: Currency) -> Result<Vec<u5>, InvoiceError> {
    Ok(FallbackAddress::parse(address, currency)?.to_base32())
}

/// Converts the payload of an `f` tag back into an address string.
pub fn decode_fallback(payload: &[u5], currency: Currency) -> Result<String, InvoiceError> {
    FallbackAddress::from_base32(payload)?.to_address(currency)
}

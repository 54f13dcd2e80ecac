use super::bits::{U5Reader, U5Writer};
use super::invoice_impl::{Invoice, TIMESTAMP_U5_SIZE};
use super::tagged::decode_fields;
use super::utils::{invoice_signing_hash, parse_hrp};
use super::InvoiceError;
use bech32::{encode, u5, FromBase32, ToBase32, Variant, WriteBase32};
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, PublicKey, Secp256k1, SecretKey,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Display;
use std::str::FromStr;
use tracing::debug;

pub(crate) const SIGNATURE_U5_SIZE: usize = 104;

/// Recoverable signature
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InvoiceSignature(pub RecoverableSignature);

impl PartialOrd for InvoiceSignature {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InvoiceSignature {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .serialize_compact()
            .1
            .cmp(&other.0.serialize_compact().1)
    }
}

impl Serialize for InvoiceSignature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let (recovery_id, signature) = self.0.serialize_compact();
        let mut bytes = signature.to_vec();
        bytes.push(recovery_id.to_i32() as u8);
        hex::encode(bytes).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for InvoiceSignature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let signature_hex: String = String::deserialize(deserializer)?;
        let bytes = hex::decode(signature_hex).map_err(serde::de::Error::custom)?;
        if bytes.len() != 65 {
            return Err(serde::de::Error::invalid_length(bytes.len(), &"65 bytes"));
        }
        let recovery_id =
            RecoveryId::from_i32(bytes[64] as i32).map_err(serde::de::Error::custom)?;
        RecoverableSignature::from_compact(&bytes[..64], recovery_id)
            .map(InvoiceSignature)
            .map_err(serde::de::Error::custom)
    }
}

impl ToBase32 for InvoiceSignature {
    fn write_base32<W: WriteBase32>(&self, writer: &mut W) -> Result<(), <W as WriteBase32>::Err> {
        let (recovery_id, signature) = self.0.serialize_compact();
        let mut converter = U5Writer::new();
        converter.write_bytes(&signature[..]);
        converter.write_bits(recovery_id.to_i32() as u64, 8);
        writer.write(&converter.finish())
    }
}

impl InvoiceSignature {
    pub(crate) fn from_base32(signature: &[u5]) -> Result<Self, InvoiceError> {
        if signature.len() != SIGNATURE_U5_SIZE {
            return Err(InvoiceError::SignatureInvalid(format!(
                "signature has {} groups, expected {}",
                signature.len(),
                SIGNATURE_U5_SIZE
            )));
        }
        let recoverable_signature_bytes = Vec::<u8>::from_base32(signature)?;
        let signature = &recoverable_signature_bytes[0..64];
        let recovery_id = RecoveryId::from_i32(recoverable_signature_bytes[64] as i32)
            .map_err(|e| InvoiceError::SignatureInvalid(format!("recovery id: {}", e)))?;

        Ok(InvoiceSignature(
            RecoverableSignature::from_compact(signature, recovery_id)
                .map_err(|e| InvoiceError::SignatureInvalid(e.to_string()))?,
        ))
    }
}

/// Recovers the signer and checks it against any explicit payee node id.
fn check_signature(
    invoice: &Invoice,
    message: &Message,
    signature: &InvoiceSignature,
) -> Result<PublicKey, InvoiceError> {
    let secp_context = Secp256k1::new();
    let recovered = secp_context
        .recover_ecdsa(message, &signature.0)
        .map_err(|e| InvoiceError::SignatureInvalid(e.to_string()))?;
    if let Some(included) = invoice.payee_pub_key() {
        if *included != recovered {
            return Err(InvoiceError::SignatureInvalid(format!(
                "payee node id {} does not match signer {}",
                included, recovered
            )));
        }
    }
    secp_context
        .verify_ecdsa(message, &signature.0.to_standard(), &recovered)
        .map_err(|e| InvoiceError::SignatureInvalid(e.to_string()))?;
    Ok(recovered)
}

fn signing_message(hrp: &str, data_without_signature: &[u5]) -> Message {
    let hash = invoice_signing_hash(hrp.as_bytes(), data_without_signature);
    Message::from_digest_slice(&hash).expect("Hash is 32 bytes long, same as MESSAGE_SIZE")
}

/// An invoice together with the signature over its serialized form.
///
/// The human readable part and data part are kept exactly as they were signed, so
/// `to_string` reproduces a decoded invoice byte for byte. To change anything, take
/// the invoice back with [`SignedInvoice::into_unsigned`] and sign it again.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignedInvoice {
    hrp: String,
    data: Vec<u5>,
    invoice: Invoice,
    signature: InvoiceSignature,
    payee_pub_key: PublicKey,
}

impl SignedInvoice {
    pub fn invoice(&self) -> &Invoice {
        &self.invoice
    }

    pub fn signature(&self) -> &InvoiceSignature {
        &self.signature
    }

    /// The explicit `n` field if present, otherwise the key recovered from the signature.
    pub fn payee_pub_key(&self) -> &PublicKey {
        &self.payee_pub_key
    }

    pub fn into_parts(self) -> (Invoice, InvoiceSignature, PublicKey) {
        (self.invoice, self.signature, self.payee_pub_key)
    }

    /// Drops the signature so the invoice can be modified and signed again.
    pub fn into_unsigned(self) -> Invoice {
        self.invoice
    }
}

impl Invoice {
    /// Validates the invoice and signs the digest of its serialized form.
    ///
    /// `sign_function` receives the message to sign. The signature is checked by
    /// recovering the signer, which has to equal the `n` field when one is set.
    pub fn sign<F>(self, sign_function: F) -> Result<SignedInvoice, InvoiceError>
    where
        F: FnOnce(&Message) -> RecoverableSignature,
    {
        self.validate()?;
        let hrp = self.hrp_part();
        let data = self.data_part()?;
        let message = signing_message(&hrp, &data);
        let signature = InvoiceSignature(sign_function(&message));
        let payee_pub_key = check_signature(&self, &message, &signature)?;
        Ok(SignedInvoice {
            hrp,
            data,
            invoice: self,
            signature,
            payee_pub_key,
        })
    }
}

impl Display for SignedInvoice {
    ///   hrp: ln{currency}{amount}{multiplier}
    ///   data: timestamp + tagged fields + signature
    ///   signature: 64 bytes + 1 byte recovery id, 104 groups
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut data = self.data.clone();
        data.extend_from_slice(&self.signature.to_base32());
        let encoded = encode(&self.hrp, data, Variant::Bech32).map_err(|_| std::fmt::Error)?;
        f.write_str(&encoded)
    }
}

impl FromStr for SignedInvoice {
    type Err = InvoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hrp, data, var) = bech32::decode(s)?;

        if var == Variant::Bech32m {
            return Err(InvoiceError::BadChecksum);
        }

        if data.len() < TIMESTAMP_U5_SIZE + SIGNATURE_U5_SIZE {
            return Err(InvoiceError::TooShortDataPart(data.len()));
        }
        let (currency, amount) = parse_hrp(&hrp)?;
        let (data_part, signature) = data.split_at(data.len() - SIGNATURE_U5_SIZE);
        let timestamp = U5Reader::new(data_part)
            .read_bits((TIMESTAMP_U5_SIZE * 5) as u8)
            .ok_or(InvoiceError::TooShortDataPart(data.len()))?;
        let tags = decode_fields(&data_part[TIMESTAMP_U5_SIZE..], TIMESTAMP_U5_SIZE)?;
        let signature = InvoiceSignature::from_base32(signature)?;

        let invoice = Invoice::from_parts(currency, amount, timestamp, tags);
        let message = signing_message(&hrp, data_part);
        let payee_pub_key = check_signature(&invoice, &message, &signature)?;
        invoice.validate()?;
        debug!(
            "decoded invoice for `{}`, amount {:?} msat, {} fields",
            currency,
            amount,
            invoice.tags().len()
        );

        Ok(SignedInvoice {
            hrp,
            data: data_part.to_vec(),
            invoice,
            signature,
            payee_pub_key,
        })
    }
}

impl Serialize for SignedInvoice {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SignedInvoice {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let invoice: String = String::deserialize(deserializer)?;
        SignedInvoice::from_str(&invoice).map_err(serde::de::Error::custom)
    }
}

/// Signs `invoice` with `secret_key` and returns its BOLT-11 string.
pub fn encode_invoice(invoice: &Invoice, secret_key: &SecretKey) -> Result<String, InvoiceError> {
    let secp_context = Secp256k1::new();
    let signed = invoice
        .clone()
        .sign(|message| secp_context.sign_ecdsa_recoverable(message, secret_key))?;
    debug!(
        "encoded invoice for `{}` with {} fields",
        invoice.currency(),
        invoice.tags().len()
    );
    Ok(signed.to_string())
}

/// Decodes and verifies a BOLT-11 string, returning the invoice and the payee key.
pub fn decode_invoice(s: &str) -> Result<(Invoice, PublicKey), InvoiceError> {
    let (invoice, _, payee_pub_key) = SignedInvoice::from_str(s)?.into_parts();
    Ok((invoice, payee_pub_key))
}

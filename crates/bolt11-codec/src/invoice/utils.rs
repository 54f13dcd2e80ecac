use super::amount::unshorten_amount;
use super::invoice_impl::Currency;
use super::InvoiceError;
use bech32::{u5, FromBase32};
use bitcoin::hashes::{sha256::Hash as Sha256, Hash as _};
use nom::{branch::alt, bytes::complete::tag, IResult};
use std::str::FromStr;

const HRP_PREFIX: &str = "ln";

// Longer codes first, `bcrt` shares a prefix with `bc` and `tbs` with `tb`.
fn nom_scan_currency(input: &str) -> IResult<&str, &str> {
    alt((tag("bcrt"), tag("bc"), tag("tbs"), tag("tb"), tag("sb")))(input)
}

fn nom_scan_prefix(input: &str) -> IResult<&str, &str> {
    tag(HRP_PREFIX)(input)
}

/// Splits the human readable part into its currency and optional millisatoshi amount.
pub fn parse_hrp(input: &str) -> Result<(Currency, Option<u64>), InvoiceError> {
    let rest = match nom_scan_prefix(input) {
        Ok((rest, _)) => rest,
        Err(_) => {
            return Err(InvoiceError::MalformedHrp(format!(
                "{}, expected `{}` prefix",
                input, HRP_PREFIX
            )))
        }
    };
    let (amount, currency) = match nom_scan_currency(rest) {
        Ok(parts) => parts,
        Err(_) => return Err(InvoiceError::UnknownCurrency(rest.to_string())),
    };
    let currency = Currency::from_str(currency)?;
    let amount = if amount.is_empty() {
        None
    } else {
        Some(unshorten_amount(amount)?)
    };
    Ok((currency, amount))
}

/// Construct the invoice's HRP and signatureless data into a preimage to be hashed.
pub fn construct_invoice_preimage(hrp_bytes: &[u8], data_without_signature: &[u5]) -> Vec<u8> {
    let mut preimage = Vec::<u8>::from(hrp_bytes);

    let mut data_part = Vec::from(data_without_signature);
    let overhang = (data_part.len() * 5) % 8;
    if overhang > 0 {
        // add padding if data does not end at a byte boundary
        data_part.push(u5::try_from_u8(0).expect("0 < 32"));

        // if overhang is in (1..3) we need to add u5(0) padding two times
        if overhang < 3 {
            data_part.push(u5::try_from_u8(0).expect("0 < 32"));
        }
    }

    preimage.extend_from_slice(
        &Vec::<u8>::from_base32(&data_part)
            .expect("No padding error may occur due to appended zero above."),
    );
    preimage
}

/// The digest covered by the invoice signature.
pub fn invoice_signing_hash(hrp_bytes: &[u8], data_without_signature: &[u5]) -> [u8; 32] {
    let preimage = construct_invoice_preimage(hrp_bytes, data_without_signature);
    Sha256::hash(&preimage).to_byte_array()
}

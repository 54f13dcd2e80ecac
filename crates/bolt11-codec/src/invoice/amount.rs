//! Short-form amounts used in the human readable part, e.g. `2500u` or `10p`.
//!
//! All arithmetic is done on integer pico-bitcoin values, the finest unit the
//! multiplier table can express. One millisatoshi is ten pico-bitcoin.

use super::InvoiceError;
use nom::{
    character::complete::{digit1, one_of},
    combinator::{all_consuming, opt},
    sequence::pair,
    IResult,
};
use std::fmt::Display;
use std::str::FromStr;

pub const PICO_BTC_PER_BTC: u128 = 1_000_000_000_000;
pub const PICO_BTC_PER_MSAT: u128 = 10;

/// Multiplier letter appended to the amount digits.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Ord, PartialOrd)]
pub enum SiPrefix {
    /// 10^-3
    Milli,
    /// 10^-6
    Micro,
    /// 10^-9
    Nano,
    /// 10^-12
    Pico,
}

impl SiPrefix {
    /// Number of pico-bitcoin in one unit of this multiplier.
    pub fn pico_factor(&self) -> u128 {
        match self {
            SiPrefix::Milli => 1_000_000_000,
            SiPrefix::Micro => 1_000_000,
            SiPrefix::Nano => 1_000,
            SiPrefix::Pico => 1,
        }
    }

    /// Smallest multiplier first, the order in which trailing zeros are stripped.
    pub fn ascending() -> [SiPrefix; 4] {
        [
            SiPrefix::Pico,
            SiPrefix::Nano,
            SiPrefix::Micro,
            SiPrefix::Milli,
        ]
    }
}

impl Display for SiPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SiPrefix::Milli => write!(f, "m"),
            SiPrefix::Micro => write!(f, "u"),
            SiPrefix::Nano => write!(f, "n"),
            SiPrefix::Pico => write!(f, "p"),
        }
    }
}

impl TryFrom<char> for SiPrefix {
    type Error = InvoiceError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c {
            'm' => Ok(Self::Milli),
            'u' => Ok(Self::Micro),
            'n' => Ok(Self::Nano),
            'p' => Ok(Self::Pico),
            _ => Err(InvoiceError::MalformedAmount(format!(
                "unknown multiplier `{}`",
                c
            ))),
        }
    }
}

impl FromStr for SiPrefix {
    type Err = InvoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => SiPrefix::try_from(c),
            _ => Err(InvoiceError::MalformedAmount(format!(
                "unknown multiplier `{}`",
                s
            ))),
        }
    }
}

/// Renders a pico-bitcoin value with the largest multiplier that divides it exactly.
pub fn shorten_pico_btc(pico_btc: u128) -> String {
    let mut value = pico_btc;
    for prefix in SiPrefix::ascending() {
        if value % 1000 != 0 {
            return format!("{}{}", value, prefix);
        }
        value /= 1000;
    }
    value.to_string()
}

/// Renders a millisatoshi amount in its shortest BOLT-11 form.
pub fn shorten_amount(amount_msat: u64) -> String {
    shorten_pico_btc(amount_msat as u128 * PICO_BTC_PER_MSAT)
}

fn nom_scan_amount(input: &str) -> IResult<&str, (&str, Option<char>)> {
    all_consuming(pair(digit1, opt(one_of("munp"))))(input)
}

/// Parses `digits` optionally followed by one multiplier letter into pico-bitcoin.
pub fn unshorten_pico_btc(text: &str) -> Result<u128, InvoiceError> {
    let (digits, prefix) = match nom_scan_amount(text) {
        Ok((_, parts)) => parts,
        Err(_) => return Err(InvoiceError::MalformedAmount(text.to_string())),
    };
    let value: u128 = digits
        .parse()
        .map_err(|_| InvoiceError::MalformedAmount(format!("{} does not fit", text)))?;
    let factor = match prefix {
        Some(c) => SiPrefix::try_from(c)?.pico_factor(),
        None => PICO_BTC_PER_BTC,
    };
    value
        .checked_mul(factor)
        .ok_or_else(|| InvoiceError::MalformedAmount(format!("{} overflows", text)))
}

/// Parses a short-form amount into millisatoshi.
///
/// Fails when the amount carries sub-millisatoshi precision or exceeds `u64`.
pub fn unshorten_amount(text: &str) -> Result<u64, InvoiceError> {
    let pico_btc = unshorten_pico_btc(text)?;
    if pico_btc % PICO_BTC_PER_MSAT != 0 {
        return Err(InvoiceError::MalformedAmount(format!(
            "{} is not a whole number of millisatoshi",
            text
        )));
    }
    u64::try_from(pico_btc / PICO_BTC_PER_MSAT)
        .map_err(|_| InvoiceError::MalformedAmount(format!("{} overflows", text)))
}

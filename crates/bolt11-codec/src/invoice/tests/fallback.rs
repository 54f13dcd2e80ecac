use crate::invoice::{
    decode_fallback, encode_fallback, encode_fields, Currency, FallbackAddress, InvoiceError,
    TaggedField, P2PKH_VERSION, P2SH_VERSION,
};
use bech32::{u5, ToBase32};

#[test]
fn test_fallback_round_trip() {
    let cases = [
        ("mk2QpYatsKicvFVuTAQLBryyccRXMUaGHP", Currency::BitcoinTestnet),
        ("1RustyRX2oai4EYYDpQGWvEL62BBGqN9T", Currency::Bitcoin),
        ("3EktnHQD7RiAE6uzMj2ZifT9YgRrkSgzQX", Currency::Bitcoin),
        ("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4", Currency::Bitcoin),
        (
            "bc1qrp33g0q5c5txsp9arysrx4k6zdkfs4nce4xj0gdcccefvpysxf3qccfmv3",
            Currency::Bitcoin,
        ),
        (
            "tb1qrp33g0q5c5txsp9arysrx4k6zdkfs4nce4xj0gdcccefvpysxf3q0sl5k7",
            Currency::BitcoinTestnet,
        ),
        (
            "bc1pw508d6qejxtdg4y5r3zarvary0c5xw7kw508d6qejxtdg4y5r3zarvary0c5xw7kt5nd6y",
            Currency::Bitcoin,
        ),
        ("bcrt1qw508d6qejxtdg4y5r3zarvary0c5xw7kygt080", Currency::Regtest),
    ];
    for (address, currency) in cases {
        let payload = encode_fallback(address, currency).unwrap();
        assert_eq!(decode_fallback(&payload, currency).unwrap(), address);
    }
}

#[test]
fn test_legacy_hashes() {
    assert_eq!(
        FallbackAddress::parse("1RustyRX2oai4EYYDpQGWvEL62BBGqN9T", Currency::Bitcoin),
        Ok(FallbackAddress::PubKeyHash([
            4, 182, 31, 125, 193, 234, 13, 201, 148, 36, 70, 76, 196, 6, 77, 197, 100, 217, 30,
            137
        ]))
    );
    assert_eq!(
        FallbackAddress::parse("mk2QpYatsKicvFVuTAQLBryyccRXMUaGHP", Currency::BitcoinTestnet),
        Ok(FallbackAddress::PubKeyHash([
            49, 114, 181, 101, 79, 102, 131, 200, 251, 20, 105, 89, 211, 71, 206, 48, 60, 174, 76,
            167
        ]))
    );
    assert_eq!(
        FallbackAddress::parse("3EktnHQD7RiAE6uzMj2ZifT9YgRrkSgzQX", Currency::Bitcoin),
        Ok(FallbackAddress::ScriptHash([
            143, 85, 86, 59, 154, 25, 243, 33, 194, 17, 233, 185, 243, 140, 223, 104, 110, 160,
            120, 69
        ]))
    );
}

#[test]
fn test_payload_layout() {
    let address =
        FallbackAddress::parse("1RustyRX2oai4EYYDpQGWvEL62BBGqN9T", Currency::Bitcoin).unwrap();
    let payload = address.to_base32();
    // version group + 160 bits
    assert_eq!(payload.len(), 33);
    assert_eq!(payload[0].to_u8(), P2PKH_VERSION);

    let address =
        FallbackAddress::parse("3EktnHQD7RiAE6uzMj2ZifT9YgRrkSgzQX", Currency::Bitcoin).unwrap();
    assert_eq!(address.to_base32()[0].to_u8(), P2SH_VERSION);

    let address = FallbackAddress::parse(
        "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4",
        Currency::Bitcoin,
    )
    .unwrap();
    assert_eq!(address.version(), 0);
    assert_eq!(address.to_base32()[0].to_u8(), 0);
}

#[test]
fn test_segwit_network_mismatch() {
    assert_eq!(
        FallbackAddress::parse(
            "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4",
            Currency::BitcoinTestnet
        ),
        Err(InvoiceError::NetworkMismatch {
            expected: "tb".to_string(),
            found: "bc".to_string(),
        })
    );
}

#[test]
fn test_signet_uses_testnet_addresses() {
    let address = "tb1qrp33g0q5c5txsp9arysrx4k6zdkfs4nce4xj0gdcccefvpysxf3q0sl5k7";
    let payload = encode_fallback(address, Currency::Signet).unwrap();
    assert_eq!(decode_fallback(&payload, Currency::Signet).unwrap(), address);
    let payload = encode_fallback("mk2QpYatsKicvFVuTAQLBryyccRXMUaGHP", Currency::Signet).unwrap();
    assert_eq!(
        decode_fallback(&payload, Currency::Signet).unwrap(),
        "mk2QpYatsKicvFVuTAQLBryyccRXMUaGHP"
    );
}

#[test]
fn test_legacy_version_mismatch() {
    assert!(matches!(
        FallbackAddress::parse("1RustyRX2oai4EYYDpQGWvEL62BBGqN9T", Currency::BitcoinTestnet),
        Err(InvoiceError::UnknownAddressType(_))
    ));
}

#[test]
fn test_legacy_bad_checksum() {
    assert_eq!(
        FallbackAddress::parse("1RustyRX2oai4EYYDpQGWvEL62BBGqN9U", Currency::Bitcoin),
        Err(InvoiceError::BadChecksum)
    );
}

#[test]
fn test_segwit_bad_checksum() {
    assert_eq!(
        FallbackAddress::parse(
            "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t5",
            Currency::Bitcoin
        ),
        Err(InvoiceError::BadChecksum)
    );
}

#[test]
fn test_segwit_variant_must_match_version() {
    // v0 program with a Bech32m checksum
    let mut data = vec![u5::try_from_u8(0).unwrap()];
    data.extend_from_slice(&[0u8; 20].to_base32());
    let address = bech32::encode("bc", data, bech32::Variant::Bech32m).unwrap();
    assert_eq!(
        FallbackAddress::parse(&address, Currency::Bitcoin),
        Err(InvoiceError::BadChecksum)
    );

    // v1 program with a Bech32 checksum
    let mut data = vec![u5::try_from_u8(1).unwrap()];
    data.extend_from_slice(&[0u8; 32].to_base32());
    let address = bech32::encode("bc", data, bech32::Variant::Bech32).unwrap();
    assert_eq!(
        FallbackAddress::parse(&address, Currency::Bitcoin),
        Err(InvoiceError::BadChecksum)
    );
}

#[test]
fn test_invalid_witness_program_length() {
    let mut data = vec![u5::try_from_u8(0).unwrap()];
    data.extend_from_slice(&[0u8; 21].to_base32());
    let address = bech32::encode("bc", data, bech32::Variant::Bech32).unwrap();
    assert_eq!(
        FallbackAddress::parse(&address, Currency::Bitcoin),
        Err(InvoiceError::InvalidWitnessProgram {
            version: 0,
            length: 21
        })
    );

    let address = FallbackAddress::SegWitProgram {
        version: u5::try_from_u8(2).unwrap(),
        program: vec![0u8; 41],
    };
    assert_eq!(
        address.to_address(Currency::Bitcoin),
        Err(InvoiceError::InvalidWitnessProgram {
            version: 2,
            length: 41
        })
    );
}

#[test]
fn test_unsupported_witness_version() {
    let mut data = vec![u5::try_from_u8(17).unwrap()];
    data.extend_from_slice(&[0u8; 20].to_base32());
    let address = bech32::encode("bc", data, bech32::Variant::Bech32m).unwrap();
    assert_eq!(
        FallbackAddress::parse(&address, Currency::Bitcoin),
        Err(InvoiceError::UnsupportedWitnessVersion(17))
    );
}

#[test]
fn test_decode_unknown_version() {
    let mut payload = vec![u5::try_from_u8(19).unwrap()];
    payload.extend_from_slice(&[0u8; 20].to_base32());
    assert!(matches!(
        decode_fallback(&payload, Currency::Bitcoin),
        Err(InvoiceError::UnknownAddressType(_))
    ));
}

#[test]
fn test_decode_legacy_wrong_length() {
    let mut payload = vec![u5::try_from_u8(P2PKH_VERSION).unwrap()];
    payload.extend_from_slice(&[0u8; 19].to_base32());
    assert!(matches!(
        decode_fallback(&payload, Currency::Bitcoin),
        Err(InvoiceError::MalformedTag(_))
    ));
}

#[test]
fn test_decode_empty_payload() {
    assert!(matches!(
        decode_fallback(&[], Currency::Bitcoin),
        Err(InvoiceError::MalformedTag(_))
    ));
}

#[test]
fn test_encode_rejects_invalid_witness_version() {
    for version in 17..32 {
        let fields = [TaggedField::Fallback(FallbackAddress::SegWitProgram {
            version: u5::try_from_u8(version).unwrap(),
            program: vec![0u8; 20],
        })];
        assert_eq!(
            encode_fields(&fields),
            Err(InvoiceError::UnsupportedWitnessVersion(version))
        );
    }

    let fields = [TaggedField::Fallback(FallbackAddress::SegWitProgram {
        version: u5::try_from_u8(1).unwrap(),
        program: vec![0u8; 41],
    })];
    assert_eq!(
        encode_fields(&fields),
        Err(InvoiceError::InvalidWitnessProgram {
            version: 1,
            length: 41
        })
    );
}

use crate::invoice::{
    decode_fields, encode_fields, tag_to_char, Currency, FallbackAddress, InvoiceError,
    InvoiceFeatures, RouteHop, TaggedField,
};
use bech32::{u5, ToBase32};
use secp256k1::PublicKey;

fn u5s(values: &[u8]) -> Vec<u5> {
    values
        .iter()
        .map(|v| u5::try_from_u8(*v).unwrap())
        .collect()
}

fn to_chars(groups: &[u5]) -> String {
    groups.iter().map(|g| tag_to_char(*g)).collect()
}

fn payment_hash() -> [u8; 32] {
    hex::decode("0001020304050607080900010203040506070809000102030405060708090102")
        .unwrap()
        .try_into()
        .unwrap()
}

fn node_id() -> PublicKey {
    PublicKey::from_slice(
        &hex::decode("029e03a901b85534ff1e92c43c74431f7ce72046060fcf7a95c37e148f78c77255")
            .unwrap(),
    )
    .unwrap()
}

fn mock_hop(short_channel_id: u64) -> RouteHop {
    RouteHop {
        node_id: node_id(),
        short_channel_id,
        fee_base_msat: 1,
        fee_proportional_millionths: 20,
        cltv_expiry_delta: 3,
    }
}

#[test]
fn test_tag_to_char() {
    assert_eq!(tag_to_char(u5::try_from_u8(1).unwrap()), 'p');
    assert_eq!(tag_to_char(u5::try_from_u8(3).unwrap()), 'r');
    assert_eq!(tag_to_char(u5::try_from_u8(5).unwrap()), '9');
    assert_eq!(tag_to_char(u5::try_from_u8(13).unwrap()), 'd');
    assert_eq!(tag_to_char(u5::try_from_u8(27).unwrap()), 'm');
}

#[test]
fn test_features_bits() {
    let features = InvoiceFeatures::new().with(8).with(14);
    assert_eq!(features.as_u5s(), u5s(&[16, 8, 0]).as_slice());
    assert!(features.supports(8));
    assert!(features.supports(14));
    assert!(!features.supports(9));
    assert!(!features.supports(100));

    let mut features = InvoiceFeatures::from_u5s(u5s(&[1]));
    assert!(features.supports(0));
    features.set(5);
    assert_eq!(features.as_u5s(), u5s(&[1, 1]).as_slice());
    assert!(features.supports(0));
    assert!(features.supports(5));
}

#[test]
fn test_encode_known_fields() {
    let encoded = encode_fields(&[TaggedField::PaymentHash(payment_hash())]).unwrap();
    assert_eq!(
        to_chars(&encoded),
        "pp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypq"
    );

    let encoded = encode_fields(&[TaggedField::ExpiryTime(60)]).unwrap();
    assert_eq!(to_chars(&encoded), "xqzpu");

    let encoded = encode_fields(&[TaggedField::Features(
        InvoiceFeatures::new().with(8).with(14),
    )])
    .unwrap();
    assert_eq!(to_chars(&encoded), "9qrsgq");
}

#[test]
fn test_fields_round_trip() {
    let fallback =
        FallbackAddress::parse("1RustyRX2oai4EYYDpQGWvEL62BBGqN9T", Currency::Bitcoin).unwrap();
    let fields = vec![
        TaggedField::PaymentHash(payment_hash()),
        TaggedField::PaymentSecret([0x11; 32]),
        TaggedField::Description("1 cup coffee".to_string()),
        TaggedField::DescriptionHash([0x42; 32]),
        TaggedField::PayeePubKey(node_id()),
        TaggedField::ExpiryTime(0),
        TaggedField::MinFinalCltvExpiry(144),
        TaggedField::Fallback(fallback),
        TaggedField::RoutingHint(vec![mock_hop(1), mock_hop(2)]),
        TaggedField::Features(InvoiceFeatures::new().with(8).with(14)),
        TaggedField::PaymentMetadata(vec![1, 2, 3, 4, 5]),
        TaggedField::Unknown {
            tag: u5::try_from_u8(2).unwrap(),
            data: u5s(&[7, 0, 31]),
        },
    ];
    let encoded = encode_fields(&fields).unwrap();
    assert_eq!(decode_fields(&encoded, 0).unwrap(), fields);
}

#[test]
fn test_expiry_time_zero_has_empty_payload() {
    assert!(TaggedField::ExpiryTime(0).payload().is_empty());
    let encoded = encode_fields(&[TaggedField::ExpiryTime(0)]).unwrap();
    assert_eq!(encoded.len(), 3);
}

#[test]
fn test_routing_hint_layout() {
    let field = TaggedField::RoutingHint(vec![mock_hop(0x0102030405060708)]);
    // 51 bytes pad up to 82 groups
    assert_eq!(field.payload().len(), 82);
}

#[test]
fn test_repeatable_fields() {
    assert!(TaggedField::RoutingHint(vec![]).is_repeatable());
    assert!(TaggedField::Fallback(FallbackAddress::PubKeyHash([0; 20])).is_repeatable());
    assert!(!TaggedField::PaymentHash([0; 32]).is_repeatable());
    assert!(!TaggedField::ExpiryTime(1).is_repeatable());
}

#[test]
fn test_truncated_header() {
    let data = u5s(&[1, 1]);
    assert_eq!(
        decode_fields(&data, 7),
        Err(InvoiceError::TruncatedTag {
            offset: 7,
            needed: 3,
            available: 2
        })
    );
}

#[test]
fn test_truncated_payload() {
    // `p` announcing 52 groups with only 10 following
    let mut data = u5s(&[1, 1, 20]);
    data.extend(u5s(&[0; 10]));
    assert_eq!(
        decode_fields(&data, 7),
        Err(InvoiceError::TruncatedTag {
            offset: 7,
            needed: 52,
            available: 10
        })
    );
}

#[test]
fn test_malformed_route_hint_is_located() {
    let mut fields = vec![TaggedField::ExpiryTime(60)];
    fields.push(TaggedField::Unknown {
        tag: u5::try_from_u8(3).unwrap(),
        data: [0u8; 50].to_base32(),
    });
    let encoded = encode_fields(&fields).unwrap();
    let err = decode_fields(&encoded, 7).unwrap_err();
    assert_eq!(err.root_cause(), &InvoiceError::MalformedRouteHint(50));
    match err {
        InvoiceError::InvalidTaggedField { tag, offset, .. } => {
            assert_eq!(tag, 'r');
            assert_eq!(offset, 12);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_invalid_description() {
    let fields = vec![TaggedField::Unknown {
        tag: u5::try_from_u8(13).unwrap(),
        data: vec![0xffu8, 0xfe].to_base32(),
    }];
    let encoded = encode_fields(&fields).unwrap();
    let err = decode_fields(&encoded, 0).unwrap_err();
    assert!(matches!(err.root_cause(), InvoiceError::MalformedTag(_)));
}

#[test]
fn test_integer_overflow() {
    let fields = vec![TaggedField::Unknown {
        tag: u5::try_from_u8(6).unwrap(),
        data: u5s(&[31; 13]),
    }];
    let encoded = encode_fields(&fields).unwrap();
    let err = decode_fields(&encoded, 0).unwrap_err();
    assert!(matches!(err, InvoiceError::InvalidTaggedField { tag: 'x', .. }));
    assert!(matches!(err.root_cause(), InvoiceError::MalformedTag(_)));
}

#[test]
fn test_wrong_length_hash_is_skipped() {
    let data = u5s(&[0; 51]);
    let fields = vec![TaggedField::Unknown {
        tag: u5::try_from_u8(1).unwrap(),
        data: data.clone(),
    }];
    let encoded = encode_fields(&fields).unwrap();
    let decoded = decode_fields(&encoded, 0).unwrap();
    assert_eq!(
        decoded,
        vec![TaggedField::Unknown {
            tag: u5::try_from_u8(1).unwrap(),
            data,
        }]
    );
}

#[test]
fn test_wrong_length_pub_key_is_skipped() {
    let fields = vec![TaggedField::Unknown {
        tag: u5::try_from_u8(19).unwrap(),
        data: u5s(&[0; 52]),
    }];
    let encoded = encode_fields(&fields).unwrap();
    let decoded = decode_fields(&encoded, 0).unwrap();
    assert!(matches!(decoded[0], TaggedField::Unknown { .. }));
}

#[test]
fn test_unknown_fallback_version_is_skipped() {
    let mut data = u5s(&[19]);
    data.extend([0u8; 20].to_base32());
    let fields = vec![TaggedField::Unknown {
        tag: u5::try_from_u8(9).unwrap(),
        data,
    }];
    let encoded = encode_fields(&fields).unwrap();
    assert_eq!(decode_fields(&encoded, 0).unwrap(), fields);
}

#[test]
fn test_oversized_field_rejected() {
    let field = TaggedField::PaymentMetadata(vec![0u8; 640]);
    // 640 bytes need 1024 groups
    assert_eq!(field.payload().len(), 1024);
    assert!(matches!(
        encode_fields(&[field]),
        Err(InvoiceError::InvariantViolation(_))
    ));
}

//! Unit tests for GRIB2 section parsing functions.
//!
//! These tests don't require test data files and focus on individual functions.

use grib2_parser::sections::{
    decode_grib2_signed, find_section, parse_identification, parse_indicator, sections,
};
use test_utils::{encode_grib2_signed, Grib2MessageBuilder};

// ============================================================================
// decode_grib2_signed tests
// ============================================================================

#[test]
fn test_decode_grib2_signed_zero() {
    assert_eq!(decode_grib2_signed(&[0x00, 0x00, 0x00, 0x00]), 0);
}

#[test]
fn test_decode_grib2_signed_positive() {
    assert_eq!(decode_grib2_signed(&[0x00, 0x00, 0x03, 0xE8]), 1000);
    assert_eq!(decode_grib2_signed(&90_000_000_u32.to_be_bytes()), 90_000_000);
}

#[test]
fn test_decode_grib2_signed_negative() {
    // Sign-magnitude: MSB=1 means negative
    assert_eq!(decode_grib2_signed(&[0x80, 0x00, 0x00, 0x01]), -1);
    assert_eq!(decode_grib2_signed(&[0x80, 0x00, 0x03, 0xE8]), -1000);
}

#[test]
fn test_decode_grib2_signed_negative_zero() {
    assert_eq!(decode_grib2_signed(&[0x80, 0x00, 0x00, 0x00]), 0);
}

#[test]
fn test_decode_grib2_signed_wrong_length() {
    assert_eq!(decode_grib2_signed(&[0x00, 0x00, 0x01]), 0);
    assert_eq!(decode_grib2_signed(&[0x00, 0x00, 0x00, 0x00, 0x01]), 0);
}

#[test]
fn test_decode_matches_encoder() {
    for v in [-2_147_483_647, -90_000_000, -1, 0, 1, 500, 2_147_483_647] {
        assert_eq!(decode_grib2_signed(&encode_grib2_signed(v)), v);
    }
}

// ============================================================================
// section walking
// ============================================================================

#[test]
fn test_section_layout_single_field() {
    let msg = Grib2MessageBuilder::new().build();
    let numbers: Vec<u8> = sections(&msg).unwrap().iter().map(|s| s.number).collect();
    assert_eq!(numbers, vec![1, 3, 4, 5, 6, 7]);
}

#[test]
fn test_find_section_missing() {
    let msg = Grib2MessageBuilder::new().build();
    assert!(find_section(&msg, 2).is_err());
    assert_eq!(find_section(&msg, 4).unwrap().length, 34);
}

#[test]
fn test_indicator_and_identification() {
    let msg = Grib2MessageBuilder::new()
        .with_discipline(10)
        .with_reference_time(2023, 7, 4, 18)
        .with_reference_minute(30)
        .build();

    let indicator = parse_indicator(&msg, 0).unwrap();
    assert_eq!(indicator.discipline, 10);
    assert_eq!(indicator.edition, 2);
    assert_eq!(indicator.message_length as usize, msg.len());

    let s1 = find_section(&msg, 1).unwrap();
    let id = parse_identification(&msg[s1.offset..s1.offset + s1.length]).unwrap();
    assert_eq!(id.centre, 7);
    assert_eq!(id.reference_time.to_rfc3339(), "2023-07-04T18:30:00+00:00");
}

#[test]
fn test_invalid_reference_date() {
    let msg = Grib2MessageBuilder::new().with_reference_time(2023, 2, 30, 0).build();
    let s1 = find_section(&msg, 1).unwrap();
    assert!(parse_identification(&msg[s1.offset..s1.offset + s1.length]).is_err());
}

//! CNPJ identifier validation
//!
//! Architecture: Pure Domain Service - an ordered, fail-fast guard chain
//! - Every stage is a pure predicate over the candidate; nothing is retained
//! - The ASCII gate runs first and is the primary anti-spoofing barrier
//! - Normalization and invisible-character scanning stay behind the gate so that
//!   relaxing the gate later cannot silently widen the accepted language
//! - Check digits use the weighted modulo-11 scheme of the federal registry

use crate::unicode::{contains_invisible, contains_whitespace, is_ascii_only, nfkc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of digits in a CNPJ
pub const CNPJ_DIGITS: usize = 14;

/// Check digit weights; the first check digit uses `WEIGHTS[1..]`
const WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

lazy_static! {
    // ASCII classes only: `\d` would admit every Unicode decimal digit.
    static ref CNPJ_SHAPE: Regex =
        Regex::new(r"^(?:[0-9]{2}\.[0-9]{3}\.[0-9]{3}/[0-9]{4}-[0-9]{2}|[0-9]{14})$")
            .expect("CNPJ shape pattern is a valid literal");
}

/// Reason a candidate was rejected as a CNPJ, one variant per guard stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum CnpjRejection {
    #[error("CNPJ is empty")]
    Empty,
    #[error("CNPJ contains non-ASCII characters")]
    NonAscii,
    #[error("CNPJ contains invisible formatting characters")]
    InvisibleCharacter,
    #[error("CNPJ contains whitespace")]
    Whitespace,
    #[error("CNPJ may only contain digits, '.', '/' and '-'")]
    ForbiddenCharacter,
    #[error("CNPJ must be 14 digits or follow the mask DD.DDD.DDD/DDDD-DD")]
    Malformed,
    #[error("CNPJ digits are all identical")]
    RepeatedDigits,
    #[error("CNPJ check digits do not match")]
    CheckDigitMismatch,
}

/// A CNPJ that passed every validation stage, held as its 14 digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cnpj([u8; CNPJ_DIGITS]);

impl Cnpj {
    /// Parse and validate a candidate
    pub fn parse(candidate: &str) -> Result<Self, CnpjRejection> {
        check_cnpj(candidate)
    }

    /// Unmasked 14-digit form
    pub fn digits(&self) -> String {
        self.0.iter().map(|d| char::from(b'0' + d)).collect()
    }

    /// The 8-digit company root
    pub fn root(&self) -> String {
        self.digits()[..8].to_string()
    }

    /// The 4-digit branch number
    pub fn branch(&self) -> String {
        self.digits()[8..12].to_string()
    }

    /// The two trailing check digits
    pub fn check_digits(&self) -> String {
        self.digits()[12..].to_string()
    }

    /// Whether this CNPJ identifies the headquarters (branch 0001)
    pub fn is_headquarters(&self) -> bool {
        self.0[8..12] == [0, 0, 0, 1]
    }
}

impl fmt::Display for Cnpj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&mask_cnpj(&self.digits()))
    }
}

impl FromStr for Cnpj {
    type Err = CnpjRejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        check_cnpj(s)
    }
}

impl Serialize for Cnpj {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cnpj {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        check_cnpj(&raw).map_err(serde::de::Error::custom)
    }
}

/// Validate a CNPJ candidate. Absent or empty input is invalid.
///
/// Accepts the masked form `DD.DDD.DDD/DDDD-DD` or 14 bare digits; never panics.
pub fn validate_cnpj<'a>(candidate: impl Into<Option<&'a str>>) -> bool {
    candidate.into().is_some_and(|c| check_cnpj(c).is_ok())
}

/// Validate a CNPJ candidate, reporting the first stage that rejected it
pub fn check_cnpj(candidate: &str) -> Result<Cnpj, CnpjRejection> {
    if candidate.is_empty() {
        return Err(CnpjRejection::Empty);
    }
    if !is_ascii_only(candidate) {
        return Err(CnpjRejection::NonAscii);
    }

    let normalized = nfkc(candidate);
    if contains_invisible(&normalized) {
        return Err(CnpjRejection::InvisibleCharacter);
    }
    if contains_whitespace(&normalized) {
        return Err(CnpjRejection::Whitespace);
    }
    if !normalized.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | '/' | '-')) {
        return Err(CnpjRejection::ForbiddenCharacter);
    }
    if !CNPJ_SHAPE.is_match(&normalized) {
        return Err(CnpjRejection::Malformed);
    }

    let mut digits = [0u8; CNPJ_DIGITS];
    for (slot, byte) in digits.iter_mut().zip(normalized.bytes().filter(u8::is_ascii_digit)) {
        *slot = byte - b'0';
    }

    if digits.iter().all(|&d| d == digits[0]) {
        return Err(CnpjRejection::RepeatedDigits);
    }

    let mut base = [0u8; 12];
    base.copy_from_slice(&digits[..12]);
    if check_digits(&base) != [digits[12], digits[13]] {
        return Err(CnpjRejection::CheckDigitMismatch);
    }

    Ok(Cnpj(digits))
}

/// Compute the two check digits for the first 12 digits of a CNPJ
pub fn check_digits(base: &[u8; 12]) -> [u8; 2] {
    let first = modulo_eleven(base, &WEIGHTS[1..]);

    let mut extended = [0u8; 13];
    extended[..12].copy_from_slice(base);
    extended[12] = first;
    let second = modulo_eleven(&extended, &WEIGHTS);

    [first, second]
}

fn modulo_eleven(digits: &[u8], weights: &[u32]) -> u8 {
    let sum: u32 = digits.iter().zip(weights).map(|(&d, &w)| u32::from(d) * w).sum();
    match sum % 11 {
        0 | 1 => 0,
        remainder => (11 - remainder) as u8,
    }
}

/// Apply the CNPJ input mask progressively to whatever digits are present.
///
/// Non-digits are dropped and at most 14 digits are kept. This is a display
/// helper: the result is not validated.
pub fn mask_cnpj(text: &str) -> String {
    let mut masked = String::with_capacity(CNPJ_DIGITS + 4);
    for (index, digit) in text.chars().filter(char::is_ascii_digit).take(CNPJ_DIGITS).enumerate() {
        match index {
            2 | 5 => masked.push('.'),
            8 => masked.push('/'),
            12 => masked.push('-'),
            _ => {}
        }
        masked.push(digit);
    }
    masked
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("12.345.678/0001-95")]
    #[case("12345678000195")]
    #[case("45.723.174/0001-10")]
    #[case("45723174000110")]
    #[case("33.000.167/0001-01")]
    #[case("00.623.904/0001-73")]
    #[case("00623904000173")]
    fn test_valid_cnpj(#[case] candidate: &str) {
        assert!(validate_cnpj(candidate), "rejected {candidate}");
    }

    #[rstest]
    #[case("00000000000000")]
    #[case("11111111111111")]
    #[case("00.000.000/0000-00")]
    #[case("1234567890123")]
    #[case("123456789012345")]
    #[case("12.345.678/0001-9A")]
    #[case("12.345.678/0001-9@")]
    #[case("12.345.678/0001-9ç")]
    #[case("")]
    #[case("12.345.678/0001-96")]
    #[case("33.000.167/0001-00")]
    #[case("12.345.678/0001.95")]
    #[case("12.345.678-0001/95")]
    #[case("12.345678/0001-95")]
    #[case("12.345.678/000A-95")]
    #[case("ABCDEFGHIJKLMN")]
    #[case("１２.３４５.６７８/０００１-９５")]
    #[case("               ")]
    #[case("#12.345.678/0001-95#")]
    #[case("12-345-678/0001-95")]
    #[case("12.345.678/0001-9")]
    #[case("12.345.678/0001-95!")]
    #[case("12.345.678/0001-95$")]
    #[case("12.345.678/0001-95%")]
    fn test_invalid_cnpj(#[case] candidate: &str) {
        assert!(!validate_cnpj(candidate), "accepted {candidate:?}");
    }

    #[test]
    fn test_absent_is_invalid() {
        assert!(!validate_cnpj(None::<&str>));
        assert!(validate_cnpj(Some("33.000.167/0001-01")));
    }

    #[rstest]
    #[case(" 12.345.678/0001-95")]
    #[case("12.345.678/0001-95 ")]
    #[case("12.345. 678/0001-95")]
    #[case("12.345.678/ 0001-95")]
    #[case("12.345.678/0001- 95")]
    #[case("12.345.678/0001-9 5")]
    #[case("12.345.\t678/0001-95")]
    #[case("12.345.678/0001-\n95")]
    #[case("\t12.345.678/0001-95")]
    #[case("12.345.678/0001-95\n")]
    #[case("12.345.\t \n678/0001-95")]
    #[case("12.345.\t\t\t678/0001-95")]
    #[case("12.345.\n\n678/0001-95")]
    #[case("12.345.\t \r\n678/0001-95")]
    fn test_rejects_any_whitespace(#[case] candidate: &str) {
        assert_eq!(check_cnpj(candidate), Err(CnpjRejection::Whitespace));
    }

    #[rstest]
    #[case("12.345.678/0001\u{200B}-95")]
    #[case("12.345.678/0001\u{200E}-95")]
    #[case("12.345.678/0001\u{200F}-95")]
    #[case("12.345.678/0001\u{202A}-95")]
    #[case("12.345.678/0001\u{202B}-95")]
    #[case("12.345.678/0001\u{2060}-95")]
    #[case("12.345.678/0001\u{202F}-95")]
    #[case("12.345.678/0001\u{3000}-95")]
    #[case("\u{FEFF}12.345.678/0001-95")]
    fn test_rejects_invisible_characters(#[case] candidate: &str) {
        // The ASCII gate catches these before the invisible-character stage.
        assert_eq!(check_cnpj(candidate), Err(CnpjRejection::NonAscii));
    }

    #[rstest]
    #[case("12.345.678/0001-95😀")]
    #[case("12.345.678/0001-9é")]
    #[case("12.345.678/0001-9≤")]
    #[case("12.345.678/0001-9α")]
    #[case("١٢.٣٤٥.٦٧٨/٠٠٠١-٩٥")]
    #[case("12.345.678/0001-9\u{0435}")]
    #[case("12.345.678/0001-9\u{03B5}")]
    #[case("12.345.678/0001-9\u{0301}")]
    fn test_rejects_homoglyphs_and_non_ascii(#[case] candidate: &str) {
        assert!(!validate_cnpj(candidate));
    }

    #[test]
    fn test_rejects_control_characters() {
        assert!(!validate_cnpj("12.345.678/0001-\u{0}\u{1}\u{2}-95"));
    }

    #[test]
    fn test_very_long_input() {
        let mut candidate = String::from("12.345.678/0001-95");
        candidate.push_str(&"0".repeat(1000));
        assert_eq!(check_cnpj(&candidate), Err(CnpjRejection::Malformed));
    }

    #[test]
    fn test_rejection_reasons_follow_stage_order() {
        assert_eq!(check_cnpj(""), Err(CnpjRejection::Empty));
        assert_eq!(check_cnpj("12.345.678/0001-9A"), Err(CnpjRejection::ForbiddenCharacter));
        assert_eq!(check_cnpj("1234567890123"), Err(CnpjRejection::Malformed));
        assert_eq!(check_cnpj("11.111.111/1111-11"), Err(CnpjRejection::RepeatedDigits));
        assert_eq!(check_cnpj("12.345.678/0001-96"), Err(CnpjRejection::CheckDigitMismatch));
    }

    #[test]
    fn test_checksum_sensitivity() {
        assert!(validate_cnpj("33.000.167/0001-01"));
        assert!(!validate_cnpj("33.000.167/0001-00"));
        assert!(!validate_cnpj("33.000.167/0001-11"));
    }

    #[test]
    fn test_check_digits() {
        assert_eq!(check_digits(&[1, 2, 3, 4, 5, 6, 7, 8, 0, 0, 0, 1]), [9, 5]);
        assert_eq!(check_digits(&[3, 3, 0, 0, 0, 1, 6, 7, 0, 0, 0, 1]), [0, 1]);
    }

    #[test]
    fn test_cnpj_value_type() {
        let masked: Cnpj = "00.623.904/0001-73".parse().unwrap();
        let bare: Cnpj = "00623904000173".parse().unwrap();

        assert_eq!(masked, bare);
        assert_eq!(bare.to_string(), "00.623.904/0001-73");
        assert_eq!(masked.digits(), "00623904000173");
        assert_eq!(masked.root(), "00623904");
        assert_eq!(masked.branch(), "0001");
        assert_eq!(masked.check_digits(), "73");
        assert!(masked.is_headquarters());
    }

    #[test]
    fn test_cnpj_serde() {
        let cnpj = Cnpj::parse("12345678000195").unwrap();
        let json = serde_json::to_string(&cnpj).unwrap();
        assert_eq!(json, "\"12.345.678/0001-95\"");

        let back: Cnpj = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cnpj);
        assert!(serde_json::from_str::<Cnpj>("\"12.345.678/0001-96\"").is_err());
    }

    #[rstest]
    #[case("", "")]
    #[case("12", "12")]
    #[case("1234", "12.34")]
    #[case("12345", "12.345")]
    #[case("123456", "12.345.6")]
    #[case("123456789", "12.345.678/9")]
    #[case("1234567890123", "12.345.678/9012-3")]
    #[case("12345678000195", "12.345.678/0001-95")]
    #[case("123456789012345", "12.345.678/9012-34")]
    #[case("12.345.678/0001-95", "12.345.678/0001-95")]
    #[case("ab12cd34", "12.34")]
    fn test_mask_cnpj(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(mask_cnpj(input), expected);
    }

    fn base_digits() -> impl Strategy<Value = [u8; 12]> {
        prop::array::uniform12(0u8..10)
    }

    proptest! {
        /// Repeated validation of arbitrary text always agrees with itself.
        #[test]
        fn validation_is_deterministic(candidate in ".*") {
            prop_assert_eq!(validate_cnpj(candidate.as_str()), validate_cnpj(candidate.as_str()));
            prop_assert_eq!(check_cnpj(&candidate), check_cnpj(&candidate));
        }

        /// Masked and unmasked spellings of the same digits agree.
        #[test]
        fn mask_equivalence(digits in prop::collection::vec(0u8..10, 14)) {
            let bare: String = digits.iter().map(|d| char::from(b'0' + d)).collect();
            let masked = mask_cnpj(&bare);
            prop_assert_eq!(validate_cnpj(bare.as_str()), validate_cnpj(masked.as_str()));
        }

        /// Appending computed check digits yields a valid CNPJ unless all digits repeat.
        #[test]
        fn computed_check_digits_validate(base in base_digits()) {
            let [first, second] = check_digits(&base);
            let mut digits: String = base.iter().map(|d| char::from(b'0' + d)).collect();
            digits.push(char::from(b'0' + first));
            digits.push(char::from(b'0' + second));

            let repeated = digits.bytes().all(|b| b == digits.as_bytes()[0]);
            prop_assert_eq!(validate_cnpj(digits.as_str()), !repeated);
        }

        /// Changing the last check digit always invalidates a valid CNPJ.
        #[test]
        fn flipped_check_digit_invalidates(base in base_digits(), bump in 1u8..10) {
            let [first, second] = check_digits(&base);
            let mut digits: String = base.iter().map(|d| char::from(b'0' + d)).collect();
            digits.push(char::from(b'0' + first));
            digits.push(char::from(b'0' + (second + bump) % 10));
            prop_assert!(!validate_cnpj(digits.as_str()));
        }
    }
}

//! Email address syntax validation
//!
//! Architecture: Pure Domain Service - a constrained, ASCII-only address grammar
//! - Deliberately narrower than RFC 5321/5322: bounded lengths, fixed character classes
//! - Edge whitespace is rejected, never trimmed
//! - Each stage is a pure predicate; the first failing stage decides the rejection

use crate::unicode::{contains_invisible, contains_whitespace, is_ascii_only};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a whole address
pub const MAX_ADDRESS_LENGTH: usize = 100;
/// Maximum length of the local-part
pub const MAX_LOCAL_PART_LENGTH: usize = 64;
/// Maximum length of one domain label
pub const MAX_LABEL_LENGTH: usize = 63;
/// Accepted top-level domain lengths
pub const TLD_LENGTH: std::ops::RangeInclusive<usize> = 2..=20;

/// Printable ASCII characters that may never appear in a local-part
const LOCAL_PROHIBITED: &str = "!# \"(),:;<>[]\\";

lazy_static! {
    static ref ADDRESS_SHAPE: Regex = Regex::new(concat!(
        r"^[-A-Za-z0-9$%&'*+/=?^_`{|}~]+(?:\.[-A-Za-z0-9$%&'*+/=?^_`{|}~]+)*",
        r"@(?:[A-Za-z0-9-]+\.)+[A-Za-z]{2,20}$"
    ))
    .expect("address shape pattern is a valid literal");
}

/// Reason a candidate was rejected as an email address, one variant per guard stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum EmailRejection {
    #[error("e-mail is empty")]
    Empty,
    #[error("e-mail contains whitespace")]
    Whitespace,
    #[error("e-mail contains invisible formatting characters")]
    InvisibleCharacter,
    #[error("e-mail contains non-ASCII characters")]
    NonAscii,
    #[error("e-mail must contain exactly one '@'")]
    AtSignCount,
    #[error("e-mail is longer than 100 characters")]
    TooLong,
    #[error("local-part must be 1 to 64 characters")]
    LocalPartLength,
    #[error("local-part contains a forbidden character")]
    LocalPartCharacter,
    #[error("local-part has a leading, trailing or doubled '.'")]
    LocalPartDots,
    #[error("e-mail does not match the accepted address syntax")]
    Syntax,
    #[error("top-level domain must be 2 to 20 characters")]
    TopLevelDomain,
    #[error("domain label is empty, too long, or starts or ends with '-'")]
    DomainLabel,
}

/// An address that passed every validation stage
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress {
    address: String,
    at: usize,
}

impl EmailAddress {
    /// Parse and validate a candidate
    pub fn parse(candidate: &str) -> Result<Self, EmailRejection> {
        check_email(candidate)
    }

    /// The part before the `@`
    pub fn local_part(&self) -> &str {
        &self.address[..self.at]
    }

    /// The part after the `@`
    pub fn domain(&self) -> &str {
        &self.address[self.at + 1..]
    }

    /// The address as given
    pub fn as_str(&self) -> &str {
        &self.address
    }

    /// Local-part verbatim, domain lowercased. Used as a uniqueness key.
    pub fn canonical_key(&self) -> String {
        format!("{}@{}", self.local_part(), self.domain().to_ascii_lowercase())
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

impl FromStr for EmailAddress {
    type Err = EmailRejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        check_email(s)
    }
}

impl Serialize for EmailAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.address)
    }
}

impl<'de> Deserialize<'de> for EmailAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        check_email(&raw).map_err(serde::de::Error::custom)
    }
}

/// Validate an email candidate. Absent or empty input is invalid.
pub fn validate_email<'a>(candidate: impl Into<Option<&'a str>>) -> bool {
    candidate.into().is_some_and(|c| check_email(c).is_ok())
}

/// Validate an email candidate, reporting the first stage that rejected it
pub fn check_email(candidate: &str) -> Result<EmailAddress, EmailRejection> {
    if candidate.is_empty() {
        return Err(EmailRejection::Empty);
    }
    if contains_whitespace(candidate) {
        return Err(EmailRejection::Whitespace);
    }
    if contains_invisible(candidate) {
        return Err(EmailRejection::InvisibleCharacter);
    }
    if !is_ascii_only(candidate) {
        return Err(EmailRejection::NonAscii);
    }
    if candidate.bytes().filter(|&b| b == b'@').count() != 1 {
        return Err(EmailRejection::AtSignCount);
    }
    // ASCII from here on, so byte length is character count.
    if candidate.len() > MAX_ADDRESS_LENGTH {
        return Err(EmailRejection::TooLong);
    }

    let Some(at) = candidate.find('@') else {
        return Err(EmailRejection::AtSignCount);
    };
    let local = &candidate[..at];
    let domain = &candidate[at + 1..];

    check_local_part(local)?;

    if !ADDRESS_SHAPE.is_match(candidate) {
        return Err(EmailRejection::Syntax);
    }

    check_domain(domain)?;

    Ok(EmailAddress { address: candidate.to_string(), at })
}

fn check_local_part(local: &str) -> Result<(), EmailRejection> {
    if local.is_empty() || local.len() > MAX_LOCAL_PART_LENGTH {
        return Err(EmailRejection::LocalPartLength);
    }
    if local.bytes().any(|b| !(33..=126).contains(&b) || LOCAL_PROHIBITED.as_bytes().contains(&b)) {
        return Err(EmailRejection::LocalPartCharacter);
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return Err(EmailRejection::LocalPartDots);
    }
    Ok(())
}

fn check_domain(domain: &str) -> Result<(), EmailRejection> {
    let Some(last_dot) = domain.rfind('.') else {
        return Err(EmailRejection::TopLevelDomain);
    };
    if !TLD_LENGTH.contains(&domain[last_dot + 1..].len()) {
        return Err(EmailRejection::TopLevelDomain);
    }

    let label_ok = |label: &str| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LENGTH
            && !label.starts_with('-')
            && !label.ends_with('-')
    };
    if !domain.split('.').all(label_ok) {
        return Err(EmailRejection::DomainLabel);
    }
    Ok(())
}

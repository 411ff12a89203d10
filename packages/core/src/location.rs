//! Country codes and country sets used for geofencing.
//!
//! A [`CountryCode`] is an ISO 3166-1 alpha-2 code packed into two bytes, with
//! [`CountryCode::NONE`] standing in for "not geolocated". A [`CountrySet`] is
//! a fixed bitset over every possible letter pair, so membership tests on the
//! selection hot path are a shift and a mask.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned when parsing a [`CountryCode`].
#[derive(Debug, Error, PartialEq)]
pub enum CountryCodeError {
    #[error("country code must be two ASCII letters (ISO 3166-1 alpha-2), got: {0:?}")]
    Invalid(String),
}

/// An ISO 3166-1 alpha-2 country code.
///
/// Serialises as the upper-case two-letter string (`"DE"`); the unknown code
/// serialises as `""`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(u16);

impl CountryCode {
    /// The unknown / not geolocated country.
    pub const NONE: CountryCode = CountryCode(0);

    /// Build a code from two ASCII letters. Lower-case letters are folded to
    /// upper case.
    pub const fn new(code: [u8; 2]) -> Self {
        let a = code[0].to_ascii_uppercase();
        let b = code[1].to_ascii_uppercase();
        Self(((a as u16) << 8) | b as u16)
    }

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    /// The two letters, or `None` for [`CountryCode::NONE`].
    pub fn letters(self) -> Option<[u8; 2]> {
        if self.is_none() {
            return None;
        }
        Some([(self.0 >> 8) as u8, self.0 as u8])
    }

    // Bit position inside a CountrySet; None unless both bytes are A-Z.
    fn index(self) -> Option<usize> {
        let [a, b] = self.letters()?;
        if !a.is_ascii_uppercase() || !b.is_ascii_uppercase() {
            return None;
        }
        Some((a - b'A') as usize * 26 + (b - b'A') as usize)
    }

    fn from_index(i: usize) -> Self {
        Self::new([b'A' + (i / 26) as u8, b'A' + (i % 26) as u8])
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.letters() {
            Some([a, b]) => write!(f, "{}{}", a as char, b as char),
            None => Ok(()),
        }
    }
}

/// Parses two ASCII letters, case-insensitively. The empty string is
/// [`CountryCode::NONE`].
impl FromStr for CountryCode {
    type Err = CountryCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.as_bytes() {
            [] => Ok(Self::NONE),
            [a, b] if a.is_ascii_alphabetic() && b.is_ascii_alphabetic() => {
                Ok(Self::new([a.to_ascii_uppercase(), b.to_ascii_uppercase()]))
            }
            _ => Err(CountryCodeError::Invalid(s.to_string())),
        }
    }
}

impl TryFrom<String> for CountryCode {
    type Error = CountryCodeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CountryCode> for String {
    fn from(code: CountryCode) -> Self {
        code.to_string()
    }
}

pub const AUSTRIA: CountryCode = CountryCode::new(*b"AT");
pub const BELGIUM: CountryCode = CountryCode::new(*b"BE");
pub const BULGARIA: CountryCode = CountryCode::new(*b"BG");
pub const CROATIA: CountryCode = CountryCode::new(*b"HR");
pub const CYPRUS: CountryCode = CountryCode::new(*b"CY");
pub const CZECHIA: CountryCode = CountryCode::new(*b"CZ");
pub const DENMARK: CountryCode = CountryCode::new(*b"DK");
pub const ESTONIA: CountryCode = CountryCode::new(*b"EE");
pub const FINLAND: CountryCode = CountryCode::new(*b"FI");
pub const FRANCE: CountryCode = CountryCode::new(*b"FR");
pub const GERMANY: CountryCode = CountryCode::new(*b"DE");
pub const GREECE: CountryCode = CountryCode::new(*b"GR");
pub const HUNGARY: CountryCode = CountryCode::new(*b"HU");
pub const IRELAND: CountryCode = CountryCode::new(*b"IE");
pub const ITALY: CountryCode = CountryCode::new(*b"IT");
pub const LATVIA: CountryCode = CountryCode::new(*b"LV");
pub const LITHUANIA: CountryCode = CountryCode::new(*b"LT");
pub const LUXEMBOURG: CountryCode = CountryCode::new(*b"LU");
pub const MALTA: CountryCode = CountryCode::new(*b"MT");
pub const NETHERLANDS: CountryCode = CountryCode::new(*b"NL");
pub const POLAND: CountryCode = CountryCode::new(*b"PL");
pub const PORTUGAL: CountryCode = CountryCode::new(*b"PT");
pub const ROMANIA: CountryCode = CountryCode::new(*b"RO");
pub const SLOVAKIA: CountryCode = CountryCode::new(*b"SK");
pub const SLOVENIA: CountryCode = CountryCode::new(*b"SI");
pub const SPAIN: CountryCode = CountryCode::new(*b"ES");
pub const SWEDEN: CountryCode = CountryCode::new(*b"SE");

pub const ICELAND: CountryCode = CountryCode::new(*b"IS");
pub const LIECHTENSTEIN: CountryCode = CountryCode::new(*b"LI");
pub const NORWAY: CountryCode = CountryCode::new(*b"NO");
pub const SWITZERLAND: CountryCode = CountryCode::new(*b"CH");
pub const UNITED_KINGDOM: CountryCode = CountryCode::new(*b"GB");
pub const UNITED_STATES: CountryCode = CountryCode::new(*b"US");

/// Member states of the European Union.
pub const EU_COUNTRIES: [CountryCode; 27] = [
    AUSTRIA,
    BELGIUM,
    BULGARIA,
    CROATIA,
    CYPRUS,
    CZECHIA,
    DENMARK,
    ESTONIA,
    FINLAND,
    FRANCE,
    GERMANY,
    GREECE,
    HUNGARY,
    IRELAND,
    ITALY,
    LATVIA,
    LITHUANIA,
    LUXEMBOURG,
    MALTA,
    NETHERLANDS,
    POLAND,
    PORTUGAL,
    ROMANIA,
    SLOVAKIA,
    SLOVENIA,
    SPAIN,
    SWEDEN,
];

/// The European Economic Area: the EU plus Iceland, Liechtenstein and Norway.
pub const EEA_COUNTRIES: [CountryCode; 30] = [
    AUSTRIA,
    BELGIUM,
    BULGARIA,
    CROATIA,
    CYPRUS,
    CZECHIA,
    DENMARK,
    ESTONIA,
    FINLAND,
    FRANCE,
    GERMANY,
    GREECE,
    HUNGARY,
    IRELAND,
    ITALY,
    LATVIA,
    LITHUANIA,
    LUXEMBOURG,
    MALTA,
    NETHERLANDS,
    POLAND,
    PORTUGAL,
    ROMANIA,
    SLOVAKIA,
    SLOVENIA,
    SPAIN,
    SWEDEN,
    ICELAND,
    LIECHTENSTEIN,
    NORWAY,
];

const SET_WORDS: usize = (26 * 26 + 63) / 64;

/// A set of country codes.
///
/// [`CountryCode::NONE`] is never a member, even if it was passed to the
/// constructor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountrySet {
    bits: [u64; SET_WORDS],
}

impl CountrySet {
    /// Build a set from explicit codes. Unknown codes are ignored.
    pub fn new(codes: impl IntoIterator<Item = CountryCode>) -> Self {
        let mut bits = [0u64; SET_WORDS];
        for i in codes.into_iter().filter_map(CountryCode::index) {
            bits[i / 64] |= 1u64 << (i % 64);
        }
        Self { bits }
    }

    /// A named region (`"EU"` or `"EEA"`, case-insensitive).
    pub fn region(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "EU" => Some(Self::new(EU_COUNTRIES)),
            "EEA" => Some(Self::new(EEA_COUNTRIES)),
            _ => None,
        }
    }

    pub fn contains(&self, code: CountryCode) -> bool {
        match code.index() {
            Some(i) => self.bits[i / 64] & (1u64 << (i % 64)) != 0,
            None => false,
        }
    }

    /// A new set holding the members of both sets.
    pub fn union(&self, other: &CountrySet) -> Self {
        let mut bits = self.bits;
        for (word, theirs) in bits.iter_mut().zip(other.bits) {
            *word |= theirs;
        }
        Self { bits }
    }

    pub fn len(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|w| *w == 0)
    }

    /// Members in alphabetical order.
    pub fn iter(&self) -> impl Iterator<Item = CountryCode> + '_ {
        (0..26 * 26)
            .filter(|i| self.bits[i / 64] & (1u64 << (i % 64)) != 0)
            .map(CountryCode::from_index)
    }
}

impl FromIterator<CountryCode> for CountrySet {
    fn from_iter<I: IntoIterator<Item = CountryCode>>(iter: I) -> Self {
        Self::new(iter)
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("de".parse::<CountryCode>(), Ok(GERMANY));
        assert_eq!("De".parse::<CountryCode>(), Ok(GERMANY));
        assert_eq!(GERMANY.to_string(), "DE");
    }

    #[test]
    fn new_folds_case() {
        assert_eq!(CountryCode::new(*b"de"), GERMANY);
        assert_eq!(CountryCode::new(*b"dE").to_string(), "DE");
        assert!(CountrySet::new(EU_COUNTRIES).contains(CountryCode::new(*b"at")));
    }

    #[test]
    fn empty_string_is_none() {
        assert_eq!("".parse::<CountryCode>(), Ok(CountryCode::NONE));
        assert_eq!(CountryCode::NONE.to_string(), "");
    }

    #[test]
    fn parse_rejects_garbage() {
        for bad in ["D", "DEU", "1A", "é"] {
            assert!(
                matches!(bad.parse::<CountryCode>(), Err(CountryCodeError::Invalid(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn eu_region() {
        let eu = CountrySet::region("eu").unwrap();
        assert_eq!(eu.len(), 27);
        assert!(eu.contains(GERMANY));
        assert!(eu.contains(HUNGARY));
        assert!(!eu.contains(UNITED_STATES));
        assert!(!eu.contains(NORWAY));
        assert!(CountrySet::region("EEA").unwrap().contains(NORWAY));
        assert!(CountrySet::region("APAC").is_none());
    }

    #[test]
    fn none_is_never_a_member() {
        let set = CountrySet::new([CountryCode::NONE, GERMANY]);
        assert_eq!(set.len(), 1);
        assert!(!set.contains(CountryCode::NONE));
    }

    #[test]
    fn non_letter_codes_are_never_members() {
        let odd = CountryCode::new(*b"1?");
        let set = CountrySet::new([odd]);
        assert!(set.is_empty());
        assert!(!set.contains(odd));
    }

    #[test]
    fn iter_is_alphabetical() {
        let set = CountrySet::new([UNITED_STATES, AUSTRIA, GERMANY]);
        let codes: Vec<String> = set.iter().map(|c| c.to_string()).collect();
        assert_eq!(codes, ["AT", "DE", "US"]);
    }

    #[test]
    fn union_combines_members() {
        let a = CountrySet::new([GERMANY]);
        let b = CountrySet::new([FRANCE]);
        let both = a.union(&b);
        assert!(both.contains(GERMANY) && both.contains(FRANCE));
        assert_eq!(both.len(), 2);
    }

    #[test]
    fn boundary_codes() {
        let aa = CountryCode::new(*b"AA");
        let zz = CountryCode::new(*b"ZZ");
        let set = CountrySet::new([aa, zz]);
        assert!(set.contains(aa));
        assert!(set.contains(zz));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![aa, zz]);
    }
}

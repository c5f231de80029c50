//! National Drug Code normalisation.
//!
//! Labelers print NDCs as 10 digits in one of three hyphenated layouts
//! (4-4-2, 5-3-2, 5-4-1). Billing and the local catalog use the 11-digit
//! 5-4-2 layout, obtained by zero-padding the short segment.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EmrError;

/// An NDC in canonical 11-digit 5-4-2 form
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ndc(String);

impl Ndc {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 11 digits without hyphens
    pub fn digits(&self) -> String {
        self.0.replace('-', "")
    }
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl FromStr for Ndc {
    type Err = EmrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || EmrError::Invalid(format!("Invalid NDC: {s}"));

        let (labeler, product, package) = if s.contains('-') {
            let parts: Vec<&str> = s.split('-').collect();
            let [l, p, k] = parts.as_slice() else {
                return Err(invalid());
            };
            if !(all_digits(l) && all_digits(p) && all_digits(k)) {
                return Err(invalid());
            }
            match (l.len(), p.len(), k.len()) {
                (4, 4, 2) => (format!("0{l}"), p.to_string(), k.to_string()),
                (5, 3, 2) => (l.to_string(), format!("0{p}"), k.to_string()),
                (5, 4, 1) => (l.to_string(), p.to_string(), format!("0{k}")),
                (5, 4, 2) => (l.to_string(), p.to_string(), k.to_string()),
                _ => return Err(invalid()),
            }
        } else if s.len() == 11 && all_digits(s) {
            (s[..5].to_string(), s[5..9].to_string(), s[9..].to_string())
        } else {
            return Err(invalid());
        };

        Ok(Ndc(format!("{labeler}-{product}-{package}")))
    }
}

impl TryFrom<String> for Ndc {
    type Error = EmrError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Ndc> for String {
    fn from(ndc: Ndc) -> Self {
        ndc.0
    }
}

impl fmt::Display for Ndc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_each_ten_digit_layout() {
        assert_eq!("1234-5678-90".parse::<Ndc>().unwrap().as_str(), "01234-5678-90");
        assert_eq!("12345-678-90".parse::<Ndc>().unwrap().as_str(), "12345-0678-90");
        assert_eq!("12345-6789-0".parse::<Ndc>().unwrap().as_str(), "12345-6789-00");
    }

    #[test]
    fn accepts_eleven_digit_forms() {
        assert_eq!("00071-0155-23".parse::<Ndc>().unwrap().as_str(), "00071-0155-23");
        let bare = "00071015523".parse::<Ndc>().unwrap();
        assert_eq!(bare.as_str(), "00071-0155-23");
        assert_eq!(bare.digits(), "00071015523");
    }

    #[test]
    fn rejects_malformed_codes() {
        for bad in ["", "1234567890", "123-4567-89", "1234-5678-9a", "12345-6789-01-2", "abc"] {
            assert!(bad.parse::<Ndc>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn deserializes_through_normalisation() {
        let ndc: Ndc = serde_json::from_str("\"1234-5678-90\"").unwrap();
        assert_eq!(ndc.as_str(), "01234-5678-90");
        assert!(serde_json::from_str::<Ndc>("\"nope\"").is_err());
    }
}

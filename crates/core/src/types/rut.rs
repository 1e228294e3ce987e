//! Chilean RUT (Rol Único Tributario).
//!
//! A RUT is a body number followed by a modulo-11 check digit (`0`-`9` or
//! `K`). Customers type it in many shapes (`12.345.678-5`, `12345678-5`,
//! `123456785`); [`Rut::parse`] accepts all of them and [`Rut`] displays the
//! canonical dotted form.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Rut`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RutError {
    #[error("RUT is too short")]
    TooShort,
    #[error("RUT contains invalid characters")]
    InvalidCharacters,
    #[error("RUT check digit does not match")]
    CheckDigitMismatch,
}

/// A validated RUT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rut {
    body: u32,
    check_digit: char,
}

impl Rut {
    /// Parse a RUT with or without dots and dash.
    ///
    /// # Errors
    ///
    /// Returns [`RutError`] if the input is not a number followed by a
    /// check digit, or if the check digit is wrong.
    pub fn parse(input: &str) -> Result<Self, RutError> {
        let compact: String = input
            .chars()
            .filter(|c| !matches!(c, '.' | '-' | ' '))
            .collect::<String>()
            .to_uppercase();

        let mut chars = compact.chars();
        let check_digit = chars.next_back().ok_or(RutError::TooShort)?;
        let body_str = chars.as_str();

        if body_str.is_empty() {
            return Err(RutError::TooShort);
        }
        if !body_str.chars().all(|c| c.is_ascii_digit())
            || !(check_digit.is_ascii_digit() || check_digit == 'K')
        {
            return Err(RutError::InvalidCharacters);
        }

        let body: u32 = body_str
            .parse()
            .map_err(|_| RutError::InvalidCharacters)?;

        if compute_check_digit(body) != check_digit {
            return Err(RutError::CheckDigitMismatch);
        }

        Ok(Self { body, check_digit })
    }

    /// The number before the dash.
    #[must_use]
    pub const fn body(&self) -> u32 {
        self.body
    }

    /// The check digit (`0`-`9` or `K`).
    #[must_use]
    pub const fn check_digit(&self) -> char {
        self.check_digit
    }
}

/// Modulo-11 check digit for a RUT body.
#[must_use]
pub fn compute_check_digit(body: u32) -> char {
    let mut sum = 0u32;
    let mut factor = 2u32;
    let mut rest = body;

    while rest > 0 {
        sum += (rest % 10) * factor;
        rest /= 10;
        factor = if factor == 7 { 2 } else { factor + 1 };
    }

    match 11 - (sum % 11) {
        11 => '0',
        10 => 'K',
        d => char::from_digit(d, 10).unwrap_or('0'),
    }
}

impl fmt::Display for Rut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.body.to_string();
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                f.write_str(".")?;
            }
            write!(f, "{ch}")?;
        }
        write!(f, "-{}", self.check_digit)
    }
}

impl std::str::FromStr for Rut {
    type Err = RutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Rut {
    type Error = RutError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Rut> for String {
    fn from(rut: Rut) -> Self {
        rut.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_check_digit() {
        assert_eq!(compute_check_digit(12_345_678), '5');
        assert_eq!(compute_check_digit(11_111_111), '1');
        assert_eq!(compute_check_digit(10_000_013), 'K');
        assert_eq!(compute_check_digit(6), 'K');
    }

    #[test]
    fn test_parse_accepts_common_shapes() {
        for input in ["12.345.678-5", "12345678-5", "123456785", " 12345678 - 5 "] {
            let rut = Rut::parse(input).unwrap();
            assert_eq!(rut.body(), 12_345_678);
            assert_eq!(rut.to_string(), "12.345.678-5");
        }
    }

    #[test]
    fn test_parse_lowercase_k() {
        let rut = Rut::parse("10000013-k").unwrap();
        assert_eq!(rut.check_digit(), 'K');
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(Rut::parse("12.345.678-9"), Err(RutError::CheckDigitMismatch));
        assert_eq!(Rut::parse("5"), Err(RutError::TooShort));
        assert_eq!(Rut::parse(""), Err(RutError::TooShort));
        assert_eq!(Rut::parse("12a45678-5"), Err(RutError::InvalidCharacters));
    }
}

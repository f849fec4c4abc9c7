//! Monetary amounts in Brazilian reais, held as integer cents.
//!
//! The record service sends `valorCapa` either as a JSON number or as a
//! string (`"1234.50"` or `"1.234,50"`). Keeping cents as `i64` makes the
//! per-collaborator totals exact regardless of how many records are summed.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

/// Error returned when a monetary string cannot be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMoneyError(pub String);

impl fmt::Display for ParseMoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid monetary value: '{}'", self.0)
    }
}

impl std::error::Error for ParseMoneyError {}

impl Money {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Convert a floating point amount, rounding to the nearest cent.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_f64(value: f64) -> Self {
        Self((value * 100.0).round() as i64)
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Money {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// `R$ 1.234,56`
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let reais = (abs / 100).to_string();
        let cents = abs % 100;

        let mut grouped = String::with_capacity(reais.len() + reais.len() / 3);
        for (i, digit) in reais.chars().enumerate() {
            if i > 0 && (reais.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(digit);
        }
        write!(f, "{sign}R$ {grouped},{cents:02}")
    }
}

impl FromStr for Money {
    type Err = ParseMoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseMoneyError(s.to_string());
        let trimmed = s.trim().trim_start_matches("R$").trim();
        if trimmed.is_empty() {
            return Ok(Self::ZERO);
        }

        // A comma marks Brazilian notation: dots group thousands.
        let normalized = if trimmed.contains(',') {
            trimmed.replace('.', "").replace(',', ".")
        } else {
            trimmed.to_string()
        };

        let (negative, body) = match normalized.strip_prefix('-') {
            Some(rest) => (true, rest.trim()),
            None => (false, normalized.as_str()),
        };
        let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(err());
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(err());
        }

        let reais: i64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| err())?
        };
        let digits: Vec<i64> = frac_part
            .bytes()
            .take(3)
            .map(|b| i64::from(b - b'0'))
            .collect();
        let tenths = digits.first().copied().unwrap_or(0);
        let hundredths = digits.get(1).copied().unwrap_or(0);
        let round_up = i64::from(digits.get(2).is_some_and(|d| *d >= 5));

        let cents = reais
            .checked_mul(100)
            .and_then(|c| c.checked_add(tenths * 10 + hundredths + round_up))
            .ok_or_else(err)?;
        Ok(Self(if negative { -cents } else { cents }))
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number or a decimal string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        v.checked_mul(100)
            .map(Money)
            .ok_or_else(|| E::custom("monetary value out of range"))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        i64::try_from(v)
            .map_err(E::custom)
            .and_then(|v| self.visit_i64(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        if v.is_finite() {
            Ok(Money::from_f64(v))
        } else {
            Err(E::custom("monetary value must be finite"))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Money, E> {
        Ok(Money::ZERO)
    }

    fn visit_none<E: de::Error>(self) -> Result<Money, E> {
        Ok(Money::ZERO)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Money, D::Error> {
        d.deserialize_any(Self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::Money;

    #[test]
    fn parses_plain_and_brazilian_notation() {
        assert_eq!("1234.5".parse::<Money>(), Ok(Money::from_cents(123_450)));
        assert_eq!("1.234,50".parse::<Money>(), Ok(Money::from_cents(123_450)));
        assert_eq!("R$ 10,00".parse::<Money>(), Ok(Money::from_cents(1_000)));
        assert_eq!("-3,25".parse::<Money>(), Ok(Money::from_cents(-325)));
        assert_eq!("0.005".parse::<Money>(), Ok(Money::from_cents(1)));
        assert_eq!("".parse::<Money>(), Ok(Money::ZERO));
    }

    #[test]
    fn rejects_garbage() {
        assert!("doze reais".parse::<Money>().is_err());
        assert!("1.2.3".parse::<Money>().is_err());
        assert!(".".parse::<Money>().is_err());
    }

    #[test]
    fn displays_in_brl_format() {
        assert_eq!(Money::from_cents(12_345_678).to_string(), "R$ 123.456,78");
        assert_eq!(Money::from_cents(5).to_string(), "R$ 0,05");
        assert_eq!(Money::from_cents(-100_000).to_string(), "-R$ 1.000,00");
    }

    #[test]
    fn json_accepts_numbers_strings_and_null() {
        let values: Vec<Money> =
            serde_json::from_str(r#"[1500, 99.99, "2.000,10", null]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Money::from_cents(150_000),
                Money::from_cents(9_999),
                Money::from_cents(200_010),
                Money::ZERO,
            ]
        );
        assert_eq!(serde_json::to_string(&Money::from_cents(9_999)).unwrap(), "99.99");
    }

    #[test]
    fn sums_are_exact() {
        let total: Money = std::iter::repeat_n(Money::from_cents(10), 1_000).sum();
        assert_eq!(total, Money::from_cents(10_000));
    }
}

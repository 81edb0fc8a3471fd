use anyhow::{anyhow, Result};
use serde::{Deserialize, Deserializer, Serializer};

pub type RationalNumber = num_rational::Ratio<u64>;

pub fn rational_number_from_f64(f: f64) -> Result<RationalNumber> {
    RationalNumber::approximate_float_unsigned(f)
        .ok_or_else(|| anyhow!("Cannot convert {f} to Rational"))
}

/// `ceil(value * ratio)` without intermediate overflow
pub fn mul_ceil(value: u64, ratio: &RationalNumber) -> u128 {
    let numer = value as u128 * *ratio.numer() as u128;
    let denom = *ratio.denom() as u128;
    numer.div_ceil(denom)
}

/// Serde adapter accepting `[n, d]`, `{"numerator", "denominator"}` or a
/// decimal number. Always writes the pair form.
pub mod flexible {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Pair(u64, u64),
        Fraction { numerator: u64, denominator: u64 },
        Float(f64),
    }

    pub fn serialize<S: Serializer>(value: &RationalNumber, s: S) -> Result<S::Ok, S::Error> {
        serde::Serialize::serialize(&(*value.numer(), *value.denom()), s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<RationalNumber, D::Error> {
        let (numer, denom) = match Repr::deserialize(d)? {
            Repr::Pair(n, d) => (n, d),
            Repr::Fraction {
                numerator,
                denominator,
            } => (numerator, denominator),
            Repr::Float(f) => {
                let r = rational_number_from_f64(f).map_err(serde::de::Error::custom)?;
                (*r.numer(), *r.denom())
            }
        };
        if denom == 0 {
            return Err(serde::de::Error::custom("zero denominator"));
        }
        Ok(RationalNumber::new(numer, denom))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractions_from_decimals() -> Result<()> {
        assert_eq!(rational_number_from_f64(0.5)?, RationalNumber::new(1, 2));
        assert_eq!(rational_number_from_f64(0.75)?, RationalNumber::new(3, 4));
        Ok(())
    }

    #[test]
    fn mul_ceil_rounds_up() {
        let price = RationalNumber::new(577, 10_000);
        // 1000 * 0.0577 = 57.7
        assert_eq!(mul_ceil(1000, &price), 58);
        assert_eq!(mul_ceil(10_000, &price), 577);
        assert_eq!(mul_ceil(0, &price), 0);
    }

    #[derive(serde::Deserialize)]
    struct Holder {
        #[serde(with = "flexible")]
        value: RationalNumber,
    }

    #[test]
    fn flexible_accepts_all_forms() {
        let pair: Holder = serde_json::from_str(r#"{"value":[577,10000]}"#).unwrap();
        let frac: Holder =
            serde_json::from_str(r#"{"value":{"numerator":577,"denominator":10000}}"#).unwrap();
        let half: Holder = serde_json::from_str(r#"{"value":0.5}"#).unwrap();
        assert_eq!(pair.value, RationalNumber::new(577, 10_000));
        assert_eq!(frac.value, pair.value);
        assert_eq!(half.value, RationalNumber::new(1, 2));
    }
}

use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------      Points       -----------------------------------------------------------
/// A loyalty point amount with two decimal places, stored as an integer number of hundredths.
///
/// The external wire format (accrual service responses, the ledger's JSON) carries point amounts as decimal numbers
/// such as `500.5`, so serde converts through `f64` at the boundary. All arithmetic stays in integer space.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd)]
#[sqlx(transparent)]
pub struct Points(i64);

op!(binary Points, Add, add);
op!(binary Points, Sub, sub);
op!(inplace Points, AddAssign, add_assign);
op!(inplace Points, SubAssign, sub_assign);
op!(unary Points, Neg, neg);

impl Sum for Points {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in points: {0}")]
pub struct PointsConversionError(String);

impl Points {
    /// The raw number of hundredths of a point.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// A whole number of points.
    pub fn from_points(points: i64) -> Self {
        Self(points * 100)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Converts a decimal amount as it appears on the wire, rounding to the nearest hundredth.
    pub fn try_from_f64(value: f64) -> Result<Self, PointsConversionError> {
        if !value.is_finite() {
            return Err(PointsConversionError(format!("{value} is not a finite number")));
        }
        let hundredths = (value * 100.0).round();
        if hundredths > i64::MAX as f64 || hundredths < i64::MIN as f64 {
            return Err(PointsConversionError(format!("{value} is out of range")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(hundredths as i64))
    }
}

impl From<i64> for Points {
    fn from(hundredths: i64) -> Self {
        Self(hundredths)
    }
}

impl PartialEq for Points {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Points {}

impl Display for Points {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0 as f64 / 100.0)
    }
}

impl FromStr for Points {
    type Err = PointsConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().parse::<f64>().map_err(|e| PointsConversionError(e.to_string()))?;
        Self::try_from_f64(value)
    }
}

impl Serialize for Points {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0 as f64 / 100.0)
    }
}

impl<'de> Deserialize<'de> for Points {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Points::try_from_f64(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::Points;

    #[test]
    fn display_has_two_decimals() {
        assert_eq!(Points::from(50_000).to_string(), "500.00");
        assert_eq!(Points::from(1).to_string(), "0.01");
        assert_eq!(Points::from(-12_345).to_string(), "-123.45");
    }

    #[test]
    fn wire_conversion_rounds_to_hundredths() {
        assert_eq!(Points::try_from_f64(500.0).unwrap(), Points::from(50_000));
        assert_eq!(Points::try_from_f64(729.98).unwrap(), Points::from(72_998));
        assert_eq!(Points::try_from_f64(0.004).unwrap(), Points::from(0));
        assert!(Points::try_from_f64(f64::NAN).is_err());
        assert!(Points::try_from_f64(f64::INFINITY).is_err());
    }

    #[test]
    fn arithmetic() {
        let a = Points::from_points(500);
        let b = Points::from_points(200);
        assert_eq!(a - b, Points::from_points(300));
        assert_eq!(a + b, Points::from_points(700));
        assert_eq!(-b, Points::from(-20_000));
        assert!(a.is_positive());
        assert!(!Points::default().is_positive());
    }

    #[test]
    fn json_round_trip() {
        let amount = Points::try_from_f64(500.5).unwrap();
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "500.5");
        let back: Points = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amount);
    }
}

//! Unit algebra
//!
//! A [`Unit`] is a product of the seven base dimensions (gram, metre, second,
//! ampere, kelvin, candela, mole) raised to real exponents, together with a
//! multiplier relative to those base units. SBML unit kinds are expressed in
//! terms of these through [`UnitKind::unit`].

use std::{
    fmt::{self, Display},
    ops::{Div, Mul},
    str::FromStr,
};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Symbols of the base dimensions, in exponent order.
pub const BASE_SYMBOLS: [&str; 7] = ["g", "m", "s", "A", "K", "cd", "mol"];

const TOLERANCE: f64 = 1e-9;

/// A unit represented as base exponents plus a multiplier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Unit {
    exponents: [f64; 7],
    multiplier: f64,
}

impl Unit {
    /// Creates a unit from raw base exponents and a multiplier.
    pub fn new(exponents: [f64; 7], multiplier: f64) -> Self {
        Self {
            exponents,
            multiplier,
        }
    }

    pub fn dimensionless() -> Self {
        Self::new([0.0; 7], 1.0)
    }

    pub fn gram() -> Self {
        Self::base(0)
    }

    pub fn metre() -> Self {
        Self::base(1)
    }

    pub fn second() -> Self {
        Self::base(2)
    }

    pub fn ampere() -> Self {
        Self::base(3)
    }

    pub fn kelvin() -> Self {
        Self::base(4)
    }

    pub fn candela() -> Self {
        Self::base(5)
    }

    pub fn mole() -> Self {
        Self::base(6)
    }

    fn base(index: usize) -> Self {
        let mut exponents = [0.0; 7];
        exponents[index] = 1.0;
        Self::new(exponents, 1.0)
    }

    pub fn exponents(&self) -> &[f64; 7] {
        &self.exponents
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Returns true if all base exponents are zero, whatever the multiplier.
    pub fn is_dimensionless(&self) -> bool {
        self.exponents.iter().all(|e| e.abs() < TOLERANCE)
    }

    /// Raises the unit to a real power.
    pub fn powf(&self, exponent: f64) -> Self {
        let mut exponents = self.exponents;
        exponents.iter_mut().for_each(|e| *e *= exponent);
        Self::new(exponents, self.multiplier.powf(exponent))
    }

    /// Returns the same dimensions with the multiplier scaled by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.exponents, self.multiplier * factor)
    }

    /// Builds the unit of a single SBML unit term,
    /// `(multiplier * 10^scale * kind)^exponent`.
    pub fn from_term(
        kind: UnitKind,
        exponent: f64,
        scale: f64,
        multiplier: f64,
    ) -> Result<Self, UnitError> {
        let factor = multiplier * 10f64.powf(scale);
        let unit = kind.unit().scaled(factor).powf(exponent);
        if !unit.multiplier.is_finite() || unit.multiplier == 0.0 {
            return Err(UnitError::InvalidTerm {
                kind: kind.name().to_string(),
                exponent,
                scale,
                multiplier,
            });
        }
        Ok(unit)
    }
}

impl Default for Unit {
    fn default() -> Self {
        Self::dimensionless()
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        let same_dims = self
            .exponents
            .iter()
            .zip(other.exponents.iter())
            .all(|(a, b)| (a - b).abs() < TOLERANCE);
        let scale = self.multiplier.abs().max(other.multiplier.abs());
        same_dims && (self.multiplier - other.multiplier).abs() <= TOLERANCE * scale
    }
}

impl Mul for Unit {
    type Output = Unit;

    fn mul(self, rhs: Unit) -> Unit {
        let mut exponents = self.exponents;
        exponents
            .iter_mut()
            .zip(rhs.exponents.iter())
            .for_each(|(a, b)| *a += b);
        Unit::new(exponents, self.multiplier * rhs.multiplier)
    }
}

impl Div for Unit {
    type Output = Unit;

    fn div(self, rhs: Unit) -> Unit {
        self * rhs.powf(-1.0)
    }
}

impl Mul<f64> for Unit {
    type Output = Unit;

    fn mul(self, rhs: f64) -> Unit {
        self.scaled(rhs)
    }
}

impl Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let format_term = |symbol: &str, exponent: f64| {
            if (exponent - 1.0).abs() < TOLERANCE {
                symbol.to_string()
            } else {
                format!("{}^{}", symbol, exponent)
            }
        };

        let positive = BASE_SYMBOLS
            .iter()
            .zip(self.exponents.iter())
            .filter(|(_, e)| **e > TOLERANCE)
            .map(|(s, e)| format_term(s, *e))
            .join("*");
        let negative = BASE_SYMBOLS
            .iter()
            .zip(self.exponents.iter())
            .filter(|(_, e)| **e < -TOLERANCE)
            .map(|(s, e)| format_term(s, -*e))
            .join("/");

        let mut text = if positive.is_empty() {
            "1".to_string()
        } else {
            positive
        };
        if !negative.is_empty() {
            text = format!("{}/{}", text, negative);
        }

        if (self.multiplier - 1.0).abs() > TOLERANCE {
            write!(f, "[{} ({})]", text, self.multiplier)
        } else {
            write!(f, "[{}]", text)
        }
    }
}

/// The SBML base unit kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    Ampere,
    Avogadro,
    Becquerel,
    Candela,
    Celsius,
    Coulomb,
    Dimensionless,
    Farad,
    Gram,
    Gray,
    Henry,
    Hertz,
    Item,
    Joule,
    Katal,
    Kelvin,
    Kilogram,
    Litre,
    Lumen,
    Lux,
    Metre,
    Mole,
    Newton,
    Ohm,
    Pascal,
    Radian,
    Second,
    Siemens,
    Sievert,
    Steradian,
    Tesla,
    Volt,
    Watt,
    Weber,
}

impl UnitKind {
    /// The canonical SBML name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            UnitKind::Ampere => "ampere",
            UnitKind::Avogadro => "avogadro",
            UnitKind::Becquerel => "becquerel",
            UnitKind::Candela => "candela",
            UnitKind::Celsius => "celsius",
            UnitKind::Coulomb => "coulomb",
            UnitKind::Dimensionless => "dimensionless",
            UnitKind::Farad => "farad",
            UnitKind::Gram => "gram",
            UnitKind::Gray => "gray",
            UnitKind::Henry => "henry",
            UnitKind::Hertz => "hertz",
            UnitKind::Item => "item",
            UnitKind::Joule => "joule",
            UnitKind::Katal => "katal",
            UnitKind::Kelvin => "kelvin",
            UnitKind::Kilogram => "kilogram",
            UnitKind::Litre => "litre",
            UnitKind::Lumen => "lumen",
            UnitKind::Lux => "lux",
            UnitKind::Metre => "metre",
            UnitKind::Mole => "mole",
            UnitKind::Newton => "newton",
            UnitKind::Ohm => "ohm",
            UnitKind::Pascal => "pascal",
            UnitKind::Radian => "radian",
            UnitKind::Second => "second",
            UnitKind::Siemens => "siemens",
            UnitKind::Sievert => "sievert",
            UnitKind::Steradian => "steradian",
            UnitKind::Tesla => "tesla",
            UnitKind::Volt => "volt",
            UnitKind::Watt => "watt",
            UnitKind::Weber => "weber",
        }
    }

    /// The value of this kind in base units.
    pub fn unit(&self) -> Unit {
        let g = Unit::gram();
        let m = Unit::metre();
        let s = Unit::second();
        let a = Unit::ampere();
        let kg = g * 1e3;

        match self {
            UnitKind::Ampere => a,
            UnitKind::Avogadro => Unit::dimensionless() * 6.02214076e23,
            UnitKind::Becquerel | UnitKind::Hertz => s.powf(-1.0),
            UnitKind::Candela | UnitKind::Lumen => Unit::candela(),
            UnitKind::Celsius | UnitKind::Kelvin => Unit::kelvin(),
            UnitKind::Coulomb => a * s,
            UnitKind::Dimensionless
            | UnitKind::Item
            | UnitKind::Radian
            | UnitKind::Steradian => Unit::dimensionless(),
            UnitKind::Farad => a.powf(2.0) * s.powf(4.0) / (kg * m.powf(2.0)),
            UnitKind::Gram => g,
            UnitKind::Gray | UnitKind::Sievert => m.powf(2.0) / s.powf(2.0),
            UnitKind::Henry => kg * m.powf(2.0) / (s.powf(2.0) * a.powf(2.0)),
            UnitKind::Joule => kg * m.powf(2.0) / s.powf(2.0),
            UnitKind::Katal => Unit::mole() / s,
            UnitKind::Kilogram => kg,
            UnitKind::Litre => m.powf(3.0) * 1e-3,
            UnitKind::Lux => Unit::candela() / m.powf(2.0),
            UnitKind::Metre => m,
            UnitKind::Mole => Unit::mole(),
            UnitKind::Newton => kg * m / s.powf(2.0),
            UnitKind::Ohm => kg * m.powf(2.0) / (s.powf(3.0) * a.powf(2.0)),
            UnitKind::Pascal => kg / (m * s.powf(2.0)),
            UnitKind::Second => s,
            UnitKind::Siemens => s.powf(3.0) * a.powf(2.0) / (kg * m.powf(2.0)),
            UnitKind::Tesla => kg / (s.powf(2.0) * a),
            UnitKind::Volt => kg * m.powf(2.0) / (s.powf(3.0) * a),
            UnitKind::Watt => kg * m.powf(2.0) / s.powf(3.0),
            UnitKind::Weber => kg * m.powf(2.0) / (s.powf(2.0) * a),
        }
    }
}

impl FromStr for UnitKind {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "ampere" => UnitKind::Ampere,
            "avogadro" => UnitKind::Avogadro,
            "becquerel" => UnitKind::Becquerel,
            "candela" => UnitKind::Candela,
            "celsius" => UnitKind::Celsius,
            "coulomb" => UnitKind::Coulomb,
            "dimensionless" => UnitKind::Dimensionless,
            "farad" => UnitKind::Farad,
            "gram" => UnitKind::Gram,
            "gray" => UnitKind::Gray,
            "henry" => UnitKind::Henry,
            "hertz" => UnitKind::Hertz,
            "item" => UnitKind::Item,
            "joule" => UnitKind::Joule,
            "katal" => UnitKind::Katal,
            "kelvin" => UnitKind::Kelvin,
            "kilogram" => UnitKind::Kilogram,
            "litre" | "liter" => UnitKind::Litre,
            "lumen" => UnitKind::Lumen,
            "lux" => UnitKind::Lux,
            "metre" | "meter" => UnitKind::Metre,
            "mole" => UnitKind::Mole,
            "newton" => UnitKind::Newton,
            "ohm" => UnitKind::Ohm,
            "pascal" => UnitKind::Pascal,
            "radian" => UnitKind::Radian,
            "second" => UnitKind::Second,
            "siemens" => UnitKind::Siemens,
            "sievert" => UnitKind::Sievert,
            "steradian" => UnitKind::Steradian,
            "tesla" => UnitKind::Tesla,
            "volt" => UnitKind::Volt,
            "watt" => UnitKind::Watt,
            "weber" => UnitKind::Weber,
            other => return Err(UnitError::UnknownKind(other.to_string())),
        };
        Ok(kind)
    }
}

impl Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Errors raised by the unit engine
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UnitError {
    /// The kind is not one of the SBML base unit kinds
    #[error("Unknown unit kind \"{0}\".")]
    UnknownKind(String),

    /// The term evaluates to a zero, infinite or undefined multiplier
    #[error(
        "Invalid unit term: kind \"{kind}\" with exponent {exponent}, scale {scale} and multiplier {multiplier}."
    )]
    InvalidTerm {
        kind: String,
        exponent: f64,
        scale: f64,
        multiplier: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centimetre() {
        let unit = Unit::from_term(UnitKind::Metre, 1.0, -2.0, 1.0).unwrap();
        assert_eq!(unit, Unit::metre() * 1e-2);
    }

    #[test]
    fn test_supervolt() {
        let volt = UnitKind::Volt.unit();
        let unit = Unit::from_term(UnitKind::Volt, 2.0, 3.0, 2.3).unwrap()
            * Unit::from_term(UnitKind::Metre, -1.0, 0.0, 1.0).unwrap();
        let expected = (volt * 2.3e3).powf(2.0) / Unit::metre();
        assert_eq!(unit, expected);
    }

    #[test]
    fn test_kind_aliases() {
        assert_eq!("liter".parse::<UnitKind>().unwrap(), UnitKind::Litre);
        assert_eq!("meter".parse::<UnitKind>().unwrap(), UnitKind::Metre);
    }

    #[test]
    fn test_unknown_kind() {
        let err = "furlong".parse::<UnitKind>().unwrap_err();
        assert!(err.to_string().contains("Unknown unit kind"));
    }

    #[test]
    fn test_derived_kinds() {
        assert_eq!(UnitKind::Litre.unit(), Unit::metre().powf(3.0) * 1e-3);
        assert_eq!(UnitKind::Kilogram.unit(), Unit::gram() * 1e3);
        assert_eq!(
            UnitKind::Siemens.unit(),
            UnitKind::Ohm.unit().powf(-1.0),
        );
        assert!(UnitKind::Radian.unit().is_dimensionless());
        assert!(UnitKind::Avogadro.unit().is_dimensionless());
    }

    #[test]
    fn test_equality_tolerance() {
        let a = Unit::mole() / UnitKind::Litre.unit();
        let b = Unit::mole() * 1000.0 / Unit::metre().powf(3.0);
        assert_eq!(a, b);
        assert_ne!(a, Unit::mole());
        assert_ne!(Unit::metre(), Unit::metre() * 1e-3);
    }

    #[test]
    fn test_zero_multiplier_is_rejected() {
        let err = Unit::from_term(UnitKind::Metre, 1.0, 0.0, 0.0).unwrap_err();
        assert!(matches!(err, UnitError::InvalidTerm { .. }));
    }

    #[test]
    fn test_display() {
        assert_eq!(UnitKind::Newton.unit().to_string(), "[g*m/s^2 (1000)]");
        assert_eq!(Unit::dimensionless().to_string(), "[1]");
    }
}

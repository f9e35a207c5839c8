//! SBML unit definitions
//!
//! Converts `<unitDefinition>` elements into [`UnitDefinition`] records and
//! resolves unit references. A reference is looked up in this order: unit
//! definitions of the document, the Level 2 built-in units (Level 2 documents
//! only), and finally the base unit kinds.

use indexmap::IndexMap;

use crate::{
    sbml::{
        entities::{UnitDefinition, UnitTerm},
        error::SBMLError,
        extract::{optional_string, parse_f64, required},
        ident,
        xml::XmlElement,
    },
    units::{Unit, UnitKind},
};

/// The value of a Level 2 built-in unit.
pub fn level2_builtin(name: &str) -> Option<Unit> {
    let unit = match name {
        "substance" => Unit::mole(),
        "time" => Unit::second(),
        "volume" => UnitKind::Litre.unit(),
        "area" => Unit::metre().powf(2.0),
        "length" => Unit::metre(),
        _ => return None,
    };
    Some(unit)
}

/// Reads a `<unit>` element.
impl TryFrom<&XmlElement> for UnitTerm {
    type Error = SBMLError;

    fn try_from(element: &XmlElement) -> Result<Self, Self::Error> {
        let kind = required(element, "kind")?.trim().parse::<UnitKind>()?;

        Ok(UnitTerm {
            kind,
            exponent: parse_f64(element, "exponent")?.unwrap_or(1.0),
            scale: parse_f64(element, "scale")?.unwrap_or(0.0),
            multiplier: parse_f64(element, "multiplier")?.unwrap_or(1.0),
        })
    }
}

impl UnitTerm {
    pub fn unit(&self) -> Result<Unit, SBMLError> {
        Ok(Unit::from_term(
            self.kind,
            self.exponent,
            self.scale,
            self.multiplier,
        )?)
    }
}

/// Reads a `<unitDefinition>` element.
///
/// A definition without terms is dimensionless.
impl TryFrom<&XmlElement> for UnitDefinition {
    type Error = SBMLError;

    fn try_from(element: &XmlElement) -> Result<Self, Self::Error> {
        let id = required(element, "id")?.to_string();
        ident::check_unit_sid(&id)?;
        if id.parse::<UnitKind>().is_ok() {
            return Err(SBMLError::ReservedUnitId(id));
        }

        let terms = element
            .child("listOfUnits")
            .map(|list| {
                list.children_named("unit")
                    .map(UnitTerm::try_from)
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        let unit = terms
            .iter()
            .try_fold(Unit::dimensionless(), |acc, term| Ok::<_, SBMLError>(acc * term.unit()?))?;

        Ok(UnitDefinition {
            id,
            name: optional_string(element, "name"),
            terms,
            unit,
        })
    }
}

/// Unit references known to a document.
#[derive(Debug, Clone)]
pub struct UnitTable {
    level: u32,
    definitions: IndexMap<String, Unit>,
}

impl UnitTable {
    pub fn new(level: u32) -> Self {
        Self {
            level,
            definitions: IndexMap::new(),
        }
    }

    /// Registers a unit definition under its UnitSId.
    pub fn define(&mut self, definition: &UnitDefinition) -> Result<(), SBMLError> {
        if self.definitions.contains_key(&definition.id) {
            return Err(SBMLError::DuplicateUnitSId(definition.id.clone()));
        }
        self.definitions
            .insert(definition.id.clone(), definition.unit);
        Ok(())
    }

    /// Resolves a unit reference.
    pub fn resolve(&self, reference: &str) -> Result<Unit, SBMLError> {
        if let Some(unit) = self.definitions.get(reference) {
            return Ok(*unit);
        }
        if self.level < 3 {
            if let Some(unit) = level2_builtin(reference) {
                return Ok(unit);
            }
        }
        reference
            .parse::<UnitKind>()
            .map(|kind| kind.unit())
            .map_err(|_| SBMLError::UnknownUnit(reference.to_string()))
    }

    /// Resolves an optional reference.
    pub fn resolve_optional(&self, reference: Option<&str>) -> Result<Option<Unit>, SBMLError> {
        reference.map(|r| self.resolve(r)).transpose()
    }
}

/// Expresses a unit as terms of base kinds, for writing it back out.
pub fn terms_for(unit: &Unit) -> Vec<UnitTerm> {
    let kinds = [
        UnitKind::Gram,
        UnitKind::Metre,
        UnitKind::Second,
        UnitKind::Ampere,
        UnitKind::Kelvin,
        UnitKind::Candela,
        UnitKind::Mole,
    ];

    let mut terms = kinds
        .iter()
        .zip(unit.exponents().iter())
        .filter(|(_, exponent)| **exponent != 0.0)
        .map(|(kind, exponent)| UnitTerm {
            kind: *kind,
            exponent: *exponent,
            scale: 0.0,
            multiplier: 1.0,
        })
        .collect::<Vec<_>>();

    if terms.is_empty() || unit.multiplier() != 1.0 {
        terms.insert(
            0,
            UnitTerm {
                kind: UnitKind::Dimensionless,
                exponent: 1.0,
                scale: 0.0,
                multiplier: unit.multiplier(),
            },
        );
    }
    terms
}

//! Identifier rules
//!
//! SBML distinguishes two identifier namespaces: SIds name compartments,
//! species, parameters, reactions and species references, while UnitSIds name
//! unit definitions. Both follow the same grammar.

use std::fmt::{self, Display};

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::sbml::error::SBMLError;

/// Name of the component that holds global variables.
pub const GLOBAL_COMPONENT: &str = "myokit";

/// Name of the variable holding the model-wide conversion factor.
pub const GLOBAL_CONVERSION_FACTOR: &str = "globalConversionFactor";

pub const TIME_URI: &str = "http://www.sbml.org/sbml/symbols/time";
pub const AVOGADRO_URI: &str = "http://www.sbml.org/sbml/symbols/avogadro";
pub const DELAY_URI: &str = "http://www.sbml.org/sbml/symbols/delay";
pub const RATE_OF_URI: &str = "http://www.sbml.org/sbml/symbols/rateOf";

lazy_static! {
    static ref SID_PATTERN: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// The kinds of entity that share the SId namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SIdKind {
    Compartment,
    Species,
    Parameter,
    Reaction,
    SpeciesReference,
}

impl Display for SIdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SIdKind::Compartment => "compartment",
            SIdKind::Species => "species",
            SIdKind::Parameter => "parameter",
            SIdKind::Reaction => "reaction",
            SIdKind::SpeciesReference => "species reference",
        };
        write!(f, "{}", name)
    }
}

pub fn is_valid_sid(id: &str) -> bool {
    SID_PATTERN.is_match(id)
}

/// Rejects identifiers that are withheld from documents.
pub fn check_reserved(id: &str) -> Result<(), SBMLError> {
    match id {
        GLOBAL_COMPONENT => Err(SBMLError::ReservedComponentId(id.to_string())),
        GLOBAL_CONVERSION_FACTOR => Err(SBMLError::ReservedConversionFactorId(id.to_string())),
        TIME_URI => Err(SBMLError::ReservedTimeSymbol(id.to_string())),
        _ => Ok(()),
    }
}

/// Validates an SId read from the attribute of `element`.
pub fn check_sid(id: &str, element: &str) -> Result<(), SBMLError> {
    check_reserved(id)?;
    if !is_valid_sid(id) {
        return Err(SBMLError::InvalidSId {
            element: element.to_string(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn check_unit_sid(id: &str) -> Result<(), SBMLError> {
    if !is_valid_sid(id) {
        return Err(SBMLError::InvalidUnitSId(id.to_string()));
    }
    Ok(())
}

/// Tracks which SIds have been claimed and by what kind of entity.
#[derive(Debug, Clone, Default)]
pub struct SIdRegistry {
    ids: IndexMap<String, SIdKind>,
}

impl SIdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: &str, kind: SIdKind) -> Result<(), SBMLError> {
        check_reserved(id)?;
        if let Some(existing) = self.ids.get(id) {
            return Err(SBMLError::DuplicateSId {
                id: id.to_string(),
                kind,
                existing: *existing,
            });
        }
        self.ids.insert(id.to_string(), kind);
        Ok(())
    }

    pub fn kind(&self, id: &str) -> Option<SIdKind> {
        self.ids.get(id).copied()
    }
}

/// Returns `base`, or `base_1`, `base_2`, ... if it is taken.
pub fn free_name(base: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(base) {
        return base.to_string();
    }
    let mut index = 1;
    loop {
        let candidate = format!("{}_{}", base, index);
        if !is_taken(&candidate) {
            return candidate;
        }
        index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sid_grammar() {
        assert!(is_valid_sid("S1"));
        assert!(is_valid_sid("_k"));
        assert!(!is_valid_sid("1S"));
        assert!(!is_valid_sid("a-b"));
        assert!(!is_valid_sid(""));
    }

    #[test]
    fn test_reserved_ids() {
        assert!(matches!(
            check_sid("myokit", "compartment"),
            Err(SBMLError::ReservedComponentId(_))
        ));
        assert!(matches!(
            check_sid("globalConversionFactor", "parameter"),
            Err(SBMLError::ReservedConversionFactorId(_))
        ));
        assert!(matches!(
            check_sid(TIME_URI, "parameter"),
            Err(SBMLError::ReservedTimeSymbol(_))
        ));
        assert!(matches!(
            check_sid("bad id", "parameter"),
            Err(SBMLError::InvalidSId { .. })
        ));
    }

    #[test]
    fn test_registry_duplicates() {
        let mut registry = SIdRegistry::new();
        registry.register("c", SIdKind::Compartment).unwrap();
        registry.register("s", SIdKind::Species).unwrap();

        let err = registry.register("c", SIdKind::Parameter).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Duplicate SId \"c\" for parameter: already used by a compartment."
        );
        assert_eq!(registry.kind("s"), Some(SIdKind::Species));
    }

    #[test]
    fn test_free_name() {
        let taken = ["time", "time_1"];
        assert_eq!(free_name("time", |name| taken.contains(&name)), "time_2");
        assert_eq!(free_name("size", |name| taken.contains(&name)), "size");
    }
}

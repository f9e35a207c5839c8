//! SBML records
//!
//! One immutable record per SBML entity, as read from the document. Unit
//! references are kept as written, next to the units they resolve to. Math is
//! kept as the `<math>` element so it can be resolved once all identifiers are
//! known.

use serde::{Deserialize, Serialize};

use crate::{
    sbml::xml::XmlElement,
    units::{Unit, UnitKind},
};

/// Attributes of the `<model>` element.
///
/// Unit references hold the effective defaults: for Level 2 documents these
/// are the built-in unit names such as `substance` or `volume`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelAttributes {
    pub id: Option<String>,
    pub name: Option<String>,
    pub substance_units: Option<String>,
    pub time_units: Option<String>,
    pub volume_units: Option<String>,
    pub area_units: Option<String>,
    pub length_units: Option<String>,
    pub extent_units: Option<String>,
    pub conversion_factor: Option<String>,
}

/// A single `<unit>` term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitTerm {
    pub kind: UnitKind,
    pub exponent: f64,
    pub scale: f64,
    pub multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDefinition {
    pub id: String,
    pub name: Option<String>,
    pub terms: Vec<UnitTerm>,
    /// The product of all terms.
    pub unit: Unit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compartment {
    pub id: String,
    pub name: Option<String>,
    pub spatial_dimensions: Option<f64>,
    pub size: Option<f64>,
    pub units: Option<String>,
    pub constant: Option<bool>,
    /// Units of the size: the `units` attribute, else implied by the spatial
    /// dimensions.
    pub size_units: Option<Unit>,
}

impl Compartment {
    /// True unless the compartment is zero-dimensional.
    pub fn is_sized(&self) -> bool {
        self.spatial_dimensions != Some(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub id: String,
    pub name: Option<String>,
    pub compartment: String,
    pub initial_amount: Option<f64>,
    pub initial_concentration: Option<f64>,
    pub substance_units: Option<String>,
    pub has_only_substance_units: bool,
    pub boundary_condition: bool,
    pub constant: bool,
    pub conversion_factor: Option<String>,
    /// Units of the substance amount.
    pub amount_units: Option<Unit>,
}

impl Species {
    /// True if the species variable holds an amount rather than a concentration.
    pub fn is_amount(&self) -> bool {
        self.has_only_substance_units
    }

    /// True if reactions may not change this species.
    pub fn is_fixed(&self) -> bool {
        self.boundary_condition || self.constant
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub id: String,
    pub name: Option<String>,
    pub value: Option<f64>,
    pub units: Option<String>,
    pub constant: Option<bool>,
    pub unit: Option<Unit>,
}

/// A reactant or product of a reaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesReference {
    pub id: Option<String>,
    pub species: String,
    pub stoichiometry: Option<f64>,
}

impl SpeciesReference {
    /// The stoichiometry, defaulting to 1.
    pub fn coefficient(&self) -> f64 {
        self.stoichiometry.unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierReference {
    pub species: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: Option<String>,
    pub name: Option<String>,
    pub compartment: Option<String>,
    pub reversible: Option<bool>,
    pub reactants: Vec<SpeciesReference>,
    pub products: Vec<SpeciesReference>,
    pub modifiers: Vec<ModifierReference>,
    /// The `<math>` element of the kinetic law.
    pub kinetic_law: Option<XmlElement>,
    /// Position in the list of reactions, used to describe unnamed reactions.
    pub index: usize,
}

impl Reaction {
    /// A short description for messages.
    pub fn describe(&self) -> String {
        match &self.id {
            Some(id) => format!("reaction \"{}\"", id),
            None => format!("reaction #{}", self.index + 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    Assignment,
    Rate,
}

impl RuleKind {
    pub fn tag(&self) -> &'static str {
        match self {
            RuleKind::Assignment => "assignmentRule",
            RuleKind::Rate => "rateRule",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub kind: RuleKind,
    pub variable: String,
    pub math: XmlElement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialAssignment {
    pub symbol: String,
    pub math: XmlElement,
}

/// All records of a model, in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelRecords {
    pub attributes: ModelAttributes,
    pub unit_definitions: Vec<UnitDefinition>,
    pub compartments: Vec<Compartment>,
    pub species: Vec<Species>,
    pub parameters: Vec<Parameter>,
    pub reactions: Vec<Reaction>,
    pub initial_assignments: Vec<InitialAssignment>,
    pub rules: Vec<Rule>,
}

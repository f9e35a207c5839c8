use thiserror::Error;

use crate::{sbml::ident::SIdKind, units::UnitError};

/// Errors that can occur while importing an SBML document
///
/// Every variant is fatal: the import stops at the first error and no partial
/// model is returned. The messages are stable and name the violated rule.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SBMLError {
    /// The input could not be read or is not well-formed XML
    #[error("Unable to parse XML: {0}")]
    Xml(String),

    /// The document does not match the supported SBML level and version
    #[error("Document does not adhere to standards: {0}")]
    Standards(String),

    /// The document has no `<model>` element
    #[error("Model element not found.")]
    MissingModel,

    /// A required attribute is absent
    #[error("Element <{element}> is missing required attribute \"{attribute}\".")]
    MissingAttribute { element: String, attribute: String },

    /// An attribute value cannot be interpreted
    #[error("Invalid value \"{value}\" for attribute \"{attribute}\" of <{element}>: expected {expected}.")]
    InvalidAttribute {
        element: String,
        attribute: String,
        value: String,
        expected: &'static str,
    },

    /// An identifier does not follow the SId grammar
    #[error("Invalid SId \"{id}\" on <{element}>.")]
    InvalidSId { element: String, id: String },

    /// An identifier does not follow the UnitSId grammar
    #[error("Invalid UnitSId \"{0}\".")]
    InvalidUnitSId(String),

    /// An SId is used more than once
    #[error("Duplicate SId \"{id}\" for {kind}: already used by a {existing}.")]
    DuplicateSId {
        id: String,
        kind: SIdKind,
        existing: SIdKind,
    },

    /// A UnitSId is used more than once
    #[error("Duplicate UnitSId \"{0}\".")]
    DuplicateUnitSId(String),

    /// A unit definition uses the name of a base unit kind
    #[error("Unit definition \"{0}\" redefines a base unit kind.")]
    ReservedUnitId(String),

    /// The reserved name of the global component is used as an identifier
    #[error("The ID \"{0}\" is protected in an SBML import: it names the global component. Please rename IDs.")]
    ReservedComponentId(String),

    /// The reserved name of the global conversion factor is used as an identifier
    #[error("The ID \"{0}\" is protected in an SBML import: it names the global conversion factor. Please rename IDs.")]
    ReservedConversionFactorId(String),

    /// The time symbol URI is used as an identifier
    #[error("The time symbol \"{0}\" cannot be used as an ID.")]
    ReservedTimeSymbol(String),

    /// A unit reference does not resolve
    #[error("Unknown units \"{0}\".")]
    UnknownUnit(String),

    /// A species or reaction refers to a compartment that does not exist
    #[error("Unknown compartment \"{compartment}\" referenced by {owner}.")]
    UnknownCompartment { owner: String, compartment: String },

    /// A species reference points to a species that does not exist
    #[error("Species ID not existent: \"{species}\" referenced in {reaction}.")]
    UnknownSpecies { reaction: String, species: String },

    /// A species conversion factor points to a parameter that does not exist
    #[error("conversionFactor refers to non-existent ID \"{factor}\" on species \"{species}\".")]
    UnknownConversionFactor { species: String, factor: String },

    /// The model conversion factor points to a parameter that does not exist
    #[error("The model conversionFactor points to non-existent ID \"{0}\".")]
    UnknownModelConversionFactor(String),

    /// A rule or initial assignment targets something that is not a variable
    #[error("Unknown variable \"{variable}\" referenced by <{element}>.")]
    UnknownVariable { element: String, variable: String },

    /// An identifier in a math expression does not resolve
    #[error("Unable to create Name: unknown identifier \"{0}\".")]
    UnresolvedName(String),

    /// A reaction has neither reactants nor products
    #[error("Reaction must have at least one reactant or product: {0}.")]
    EmptyReaction(String),

    /// A reaction is marked as fast
    #[error("Fast reactions are not supported: the importer does not support the conversion of <fast> reactions ({0}).")]
    FastReaction(String),

    /// A kinetic law declares local parameters
    #[error("The importer does not support the definition of local parameters ({0}). Please move them to the global <listOfParameters>.")]
    LocalParameters(String),

    /// A species reference uses `<stoichiometryMath>`
    #[error("The importer does not support <stoichiometryMath> ({0}).")]
    StoichiometryMath(String),

    /// A `<model>` contains the same list element twice
    #[error("Element <{0}> appears more than once in <model>.")]
    DuplicateList(String),

    /// The document defines functions
    #[error("Function definitions are not supported.")]
    FunctionDefinitions,

    /// The document contains an algebraic rule
    #[error("Algebraic assignments are not supported.")]
    AlgebraicRule,

    /// Two rules target the same variable
    #[error("Variable \"{0}\" is defined by more than one rule.")]
    DuplicateRule(String),

    /// A variable is defined by both an assignment rule and an initial assignment
    #[error("Variable \"{0}\" is defined by both an assignment rule and an initial assignment.")]
    AssignmentConflict(String),

    /// A species is set by a rule and changed by reactions
    #[error("Species \"{0}\" is changed by reactions and set by a rule. Set boundaryCondition=\"true\" to allow this.")]
    RuleConflict(String),

    /// An operator received no operands
    #[error("Operator needs at least one operand: <{0}>.")]
    MissingOperand(String),

    /// An operator received the wrong number of operands
    #[error("Operator <{operator}> needs {expected}.")]
    OperatorArity {
        operator: String,
        expected: &'static str,
    },

    /// A MathML element is not supported
    #[error("Unsupported MathML element <{0}>.")]
    UnsupportedMath(String),

    /// A MathML element is malformed
    #[error("Invalid MathML: {0}")]
    InvalidMath(String),

    /// Failure in the unit engine
    #[error(transparent)]
    Unit(#[from] UnitError),
}

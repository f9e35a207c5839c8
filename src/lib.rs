//! SBML Import Library
//!
//! This library imports models written in the Systems Biology Markup Language
//! (SBML) into a simple model of components and variables:
//! - Reading SBML documents into typed records with full identifier and unit checks
//! - Converting MathML into expressions
//! - Assembling compartments, species, parameters, reactions and rules into
//!   state, intermediary and constant variables
//! - Writing imported models back out as SBML Level 3 Version 2
//! - Saving and loading imported models as JSON

#![warn(unused_imports)]

/// Commonly used types and functionality re-exported for convenience
pub mod prelude {
    pub use crate::io::*;
    pub use crate::model::component::Component;
    pub use crate::model::expr::{BinaryOp, Expr, Function};
    pub use crate::model::graph::Model;
    pub use crate::model::variable::{Variable, VariableRole};
    pub use crate::sbml::error::SBMLError;
    pub use crate::sbml::read::{ParserOptions, ParserOptionsBuilder, SBMLParser};
    pub use crate::sbml::version::Strictness;
    pub use crate::sbml::warnings::WarningCollector;
    pub use crate::sbml::writer::{to_sbml_string, write_sbml_file};
    pub use crate::units::{Unit, UnitKind};
}

/// Physical units and unit kinds
pub mod units;

/// Saving and loading of imported models
pub mod io;

/// Table display of imported models
pub mod info;

/// The imported model: components, variables and expressions
pub mod model {
    /// Components grouping variables
    pub mod component;
    /// Expression trees
    pub mod expr;
    /// The model and its queries
    pub mod graph;
    /// Variables and their roles
    pub mod variable;
}

/// Reading and writing of SBML documents
pub mod sbml {
    pub use crate::sbml::read::SBMLParser;

    /// Records read from SBML entities
    pub mod entities;
    /// Errors raised during an import
    pub mod error;
    /// Extraction of records from SBML elements
    pub mod extract;
    /// Identifier syntax and uniqueness
    pub mod ident;
    /// MathML to expression conversion
    pub mod mathml;
    /// Conversion of XHTML notes to plain text
    pub mod notes;
    /// Entry points for importing documents
    pub mod read;
    /// Assembly of models from records
    pub(crate) mod reader;
    /// Unit definitions and unit resolution
    pub mod units;
    /// Level and version checks
    pub mod version;
    /// Collection of import warnings
    pub mod warnings;
    /// Export of models as SBML
    pub mod writer;
    /// Generic XML tree
    pub mod xml;
}

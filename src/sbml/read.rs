//! SBML Reading Module
//!
//! Entry points for importing SBML documents from files or strings. The
//! [`SBMLParser`] reads the XML, checks the document and hands it to the
//! assembler, which produces a [`Model`].
//!
//! Non-fatal problems are reported through a [`WarningCollector`] supplied by
//! the caller, so that a single collector can gather the warnings of several
//! imports.

use std::path::Path;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::model::graph::Model;

use super::{
    error::SBMLError, reader::assemble, version::Strictness, warnings::WarningCollector,
    xml::XmlElement,
};

/// Options that control an SBML import
///
/// # Fields
///
/// * `strictness` - How to treat documents that do not follow the standard (default: lenient)
/// * `default_model_name` - Name used when the model has neither a name nor an id
/// * `notes_width` - Column at which model notes are wrapped (default: 79)
///
/// # Examples
///
/// ```
/// use sbml_import::prelude::*;
///
/// let options = ParserOptionsBuilder::default()
///     .strictness(Strictness::Strict)
///     .notes_width(60usize)
///     .build()
///     .unwrap();
///
/// assert_eq!(options.default_model_name, "Imported SBML model");
/// ```
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(setter(into))]
pub struct ParserOptions {
    #[builder(default)]
    pub strictness: Strictness,
    #[builder(default = "String::from(\"Imported SBML model\")")]
    pub default_model_name: String,
    #[builder(default = "79")]
    pub notes_width: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            strictness: Strictness::Lenient,
            default_model_name: String::from("Imported SBML model"),
            notes_width: 79,
        }
    }
}

/// Imports SBML documents.
#[derive(Debug, Clone, Default)]
pub struct SBMLParser {
    options: ParserOptions,
}

impl SBMLParser {
    /// Creates a lenient parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// A parser that warns about documents that do not follow the standard.
    pub fn lenient() -> Self {
        Self::default()
    }

    /// A parser that rejects documents that do not follow the standard.
    pub fn strict() -> Self {
        Self::with_options(ParserOptions {
            strictness: Strictness::Strict,
            ..ParserOptions::default()
        })
    }

    pub fn with_options(options: ParserOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Reads and imports an SBML file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SBML file
    /// * `warnings` - Collector that receives all warnings of the import
    ///
    /// # Returns
    ///
    /// The imported model, or the first error that stopped the import.
    pub fn parse_file(
        &self,
        path: impl AsRef<Path>,
        warnings: &mut WarningCollector,
    ) -> Result<Model, SBMLError> {
        let path = path.as_ref();
        log::info!("Importing SBML file {}", path.display());
        let xml = std::fs::read_to_string(path)
            .map_err(|e| SBMLError::Xml(format!("{}: {}", path.display(), e)))?;
        self.parse_string(&xml, warnings)
    }

    /// Imports an SBML document held in a string.
    pub fn parse_string(
        &self,
        xml: &str,
        warnings: &mut WarningCollector,
    ) -> Result<Model, SBMLError> {
        let root = XmlElement::parse(xml)?;
        let model = assemble(&root, &self.options, warnings)?;
        log::info!(
            "Imported model \"{}\" with {} variables and {} warnings",
            model.name(),
            model.count_variables(None),
            warnings.count()
        );
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_constructors() {
        assert_eq!(SBMLParser::new().options().strictness, Strictness::Lenient);
        assert_eq!(SBMLParser::lenient().options().strictness, Strictness::Lenient);
        assert_eq!(SBMLParser::strict().options().strictness, Strictness::Strict);
    }

    #[test]
    fn test_builder_defaults_match_default() {
        let built = ParserOptionsBuilder::default().build().unwrap();
        assert_eq!(built, ParserOptions::default());
    }

    #[test]
    fn test_missing_file() {
        let mut warnings = WarningCollector::new();
        let result = SBMLParser::new().parse_file("does/not/exist.xml", &mut warnings);
        assert!(matches!(result, Err(SBMLError::Xml(_))));
    }

    #[test]
    fn test_malformed_xml() {
        let mut warnings = WarningCollector::new();
        let result = SBMLParser::new().parse_string("<sbml><model>", &mut warnings);
        assert!(matches!(result, Err(SBMLError::Xml(_))));
    }
}

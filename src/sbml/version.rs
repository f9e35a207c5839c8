//! SBML level and version handling
//!
//! The importer targets SBML Level 3 Version 2. Other levels and versions are
//! accepted with a warning under the lenient policy and rejected under the
//! strict one.

use serde::{Deserialize, Serialize};

use crate::sbml::{error::SBMLError, warnings::WarningCollector, xml::XmlElement};

pub const SBML_L3V2_NAMESPACE: &str = "http://www.sbml.org/sbml/level3/version2/core";

/// Namespaces of the SBML levels and versions the importer knows about.
const KNOWN_NAMESPACES: [(&str, u32, u32); 8] = [
    ("http://www.sbml.org/sbml/level2", 2, 1),
    ("http://www.sbml.org/sbml/level2/version2", 2, 2),
    ("http://www.sbml.org/sbml/level2/version3", 2, 3),
    ("http://www.sbml.org/sbml/level2/version4", 2, 4),
    ("http://www.sbml.org/sbml/level2/version5", 2, 5),
    ("http://www.sbml.org/sbml/level3/version1/core", 3, 1),
    (SBML_L3V2_NAMESPACE, 3, 2),
    ("http://www.sbml.org/sbml/level1", 1, 2),
];

/// How strictly a document is checked against the SBML standard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strictness {
    /// Version mismatches produce warnings and missing flags take defaults.
    #[default]
    Lenient,
    /// Version mismatches and missing required attributes are errors.
    Strict,
}

/// Level and version information read from the `<sbml>` root.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentInfo {
    pub namespace: Option<String>,
    pub level: Option<u32>,
    pub version: Option<u32>,
}

impl DocumentInfo {
    pub fn from_root(root: &XmlElement) -> Self {
        Self {
            namespace: root.namespace.clone(),
            level: root.attribute("level").and_then(|l| l.trim().parse().ok()),
            version: root.attribute("version").and_then(|v| v.trim().parse().ok()),
        }
    }

    /// The level and version implied by the namespace, if it is a known one.
    fn namespace_level(&self) -> Option<(u32, u32)> {
        let namespace = self.namespace.as_deref()?;
        KNOWN_NAMESPACES
            .iter()
            .find(|(uri, _, _)| *uri == namespace)
            .map(|(_, level, version)| (*level, *version))
    }

    /// The level the document is read as. Defaults to 3.
    pub fn effective_level(&self) -> u32 {
        self.level
            .or_else(|| self.namespace_level().map(|(level, _)| level))
            .unwrap_or(3)
    }

    pub fn is_reference(&self) -> bool {
        self.namespace.as_deref() == Some(SBML_L3V2_NAMESPACE)
            && self.level == Some(3)
            && self.version == Some(2)
    }

    fn describe(&self) -> String {
        let show = |value: Option<u32>| value.map_or("none".to_string(), |v| v.to_string());
        format!(
            "found namespace \"{}\" with level {} and version {}, expected level 3 version 2",
            self.namespace.as_deref().unwrap_or(""),
            show(self.level),
            show(self.version),
        )
    }
}

/// Checks the document root against the supported SBML version.
///
/// Under [`Strictness::Lenient`] a mismatch is recorded as a warning and the
/// import continues; under [`Strictness::Strict`] it is an error.
pub fn check_document(
    root: &XmlElement,
    strictness: Strictness,
    warnings: &mut WarningCollector,
) -> Result<DocumentInfo, SBMLError> {
    let info = DocumentInfo::from_root(root);

    let problem = if root.name != "sbml" {
        Some(format!("root element is <{}>, expected <sbml>", root.name))
    } else if !info.is_reference() {
        Some(info.describe())
    } else {
        None
    };

    if let Some(problem) = problem {
        match strictness {
            Strictness::Strict => return Err(SBMLError::Standards(problem)),
            Strictness::Lenient => {
                warnings.warn(format!("This version of SBML may not be supported: {}.", problem))
            }
        }
    }

    log::debug!(
        "Reading SBML level {} (version {:?})",
        info.effective_level(),
        info.version
    );
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(xml: &str) -> XmlElement {
        XmlElement::parse(xml).unwrap()
    }

    #[test]
    fn test_reference_version_passes() {
        let root = root(&format!(
            r#"<sbml xmlns="{}" level="3" version="2"/>"#,
            SBML_L3V2_NAMESPACE
        ));
        let mut warnings = WarningCollector::new();
        let info = check_document(&root, Strictness::Strict, &mut warnings).unwrap();
        assert!(info.is_reference());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_older_version_lenient_warns() {
        let root = root(
            r#"<sbml xmlns="http://www.sbml.org/sbml/level2/version4" level="2" version="4"/>"#,
        );
        let mut warnings = WarningCollector::new();
        let info = check_document(&root, Strictness::Lenient, &mut warnings).unwrap();
        assert_eq!(info.effective_level(), 2);
        assert_eq!(warnings.count(), 1);
        assert!(warnings
            .text()
            .starts_with("This version of SBML may not be supported:"));
    }

    #[test]
    fn test_older_version_strict_fails() {
        let root = root(
            r#"<sbml xmlns="http://www.sbml.org/sbml/level2/version4" level="2" version="4"/>"#,
        );
        let mut warnings = WarningCollector::new();
        let err = check_document(&root, Strictness::Strict, &mut warnings).unwrap_err();
        assert!(err.to_string().contains("not adhere to standards"));
    }

    #[test]
    fn test_level_from_namespace() {
        let root = root(r#"<sbml xmlns="http://www.sbml.org/sbml/level2/version4"/>"#);
        assert_eq!(DocumentInfo::from_root(&root).effective_level(), 2);

        let root = self::root("<model/>");
        let mut warnings = WarningCollector::new();
        let info = check_document(&root, Strictness::Lenient, &mut warnings).unwrap();
        assert_eq!(info.effective_level(), 3);
        assert!(warnings.text().contains("root element is <model>"));
    }
}

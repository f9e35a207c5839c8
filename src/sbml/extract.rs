//! Entity extraction
//!
//! Reads SBML elements into the records of [`crate::sbml::entities`]. Each
//! extractor validates required attributes first, then identifier syntax, then
//! references to entities registered earlier.

use crate::{
    sbml::{
        entities::{
            Compartment, InitialAssignment, ModelAttributes, ModifierReference, Parameter,
            Reaction, Rule, RuleKind, Species, SpeciesReference,
        },
        error::SBMLError,
        ident::{self, SIdKind, SIdRegistry},
        units::UnitTable,
        version::Strictness,
        warnings::WarningCollector,
        xml::XmlElement,
    },
    units::Unit,
};

/// Returns the value of a required attribute.
pub fn required<'a>(element: &'a XmlElement, attribute: &str) -> Result<&'a str, SBMLError> {
    element
        .attribute(attribute)
        .ok_or_else(|| SBMLError::MissingAttribute {
            element: element.name.clone(),
            attribute: attribute.to_string(),
        })
}

pub fn optional_string(element: &XmlElement, attribute: &str) -> Option<String> {
    element.attribute(attribute).map(|v| v.trim().to_string())
}

/// Parses an optional floating point attribute.
pub fn parse_f64(element: &XmlElement, attribute: &str) -> Result<Option<f64>, SBMLError> {
    element
        .attribute(attribute)
        .map(|value| {
            value
                .trim()
                .parse::<f64>()
                .map_err(|_| SBMLError::InvalidAttribute {
                    element: element.name.clone(),
                    attribute: attribute.to_string(),
                    value: value.to_string(),
                    expected: "a number",
                })
        })
        .transpose()
}

/// Parses an optional boolean attribute.
pub fn parse_bool(element: &XmlElement, attribute: &str) -> Result<Option<bool>, SBMLError> {
    element
        .attribute(attribute)
        .map(|value| match value.trim() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(SBMLError::InvalidAttribute {
                element: element.name.clone(),
                attribute: attribute.to_string(),
                value: value.to_string(),
                expected: "\"true\" or \"false\"",
            }),
        })
        .transpose()
}

/// Reads a required SId attribute and checks it.
fn required_sid(element: &XmlElement, attribute: &str) -> Result<String, SBMLError> {
    let id = required(element, attribute)?.trim().to_string();
    ident::check_sid(&id, &element.name)?;
    Ok(id)
}

fn optional_sid(element: &XmlElement, attribute: &str) -> Result<Option<String>, SBMLError> {
    optional_string(element, attribute)
        .map(|id| ident::check_sid(&id, &element.name).map(|_| id))
        .transpose()
}

/// Lists that may appear in a `<model>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    FunctionDefinitions,
    UnitDefinitions,
    Compartments,
    Species,
    Parameters,
    InitialAssignments,
    Rules,
    Constraints,
    Reactions,
    Events,
}

impl ListKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        let kind = match tag {
            "listOfFunctionDefinitions" => ListKind::FunctionDefinitions,
            "listOfUnitDefinitions" => ListKind::UnitDefinitions,
            "listOfCompartments" => ListKind::Compartments,
            "listOfSpecies" => ListKind::Species,
            "listOfParameters" => ListKind::Parameters,
            "listOfInitialAssignments" => ListKind::InitialAssignments,
            "listOfRules" => ListKind::Rules,
            "listOfConstraints" => ListKind::Constraints,
            "listOfReactions" => ListKind::Reactions,
            "listOfEvents" => ListKind::Events,
            _ => return None,
        };
        Some(kind)
    }
}

/// Model-wide default units, resolved.
#[derive(Debug, Clone, Default)]
pub struct ModelDefaults {
    pub substance: Option<Unit>,
    pub time: Option<Unit>,
    pub volume: Option<Unit>,
    pub area: Option<Unit>,
    pub length: Option<Unit>,
    pub extent: Option<Unit>,
}

impl ModelDefaults {
    pub fn resolve(attributes: &ModelAttributes, units: &UnitTable) -> Result<Self, SBMLError> {
        Ok(Self {
            substance: units.resolve_optional(attributes.substance_units.as_deref())?,
            time: units.resolve_optional(attributes.time_units.as_deref())?,
            volume: units.resolve_optional(attributes.volume_units.as_deref())?,
            area: units.resolve_optional(attributes.area_units.as_deref())?,
            length: units.resolve_optional(attributes.length_units.as_deref())?,
            extent: units.resolve_optional(attributes.extent_units.as_deref())?,
        })
    }
}

/// Everything an extractor needs besides the element itself.
pub struct ExtractContext<'a> {
    pub strictness: Strictness,
    pub level: u32,
    pub units: &'a UnitTable,
    pub defaults: &'a ModelDefaults,
    pub registry: &'a SIdRegistry,
}

impl ExtractContext<'_> {
    /// Reads a boolean flag that is required under the strict policy and
    /// defaults to false otherwise.
    fn flag(&self, element: &XmlElement, attribute: &str) -> Result<bool, SBMLError> {
        match (parse_bool(element, attribute)?, self.strictness) {
            (Some(value), _) => Ok(value),
            (None, Strictness::Lenient) => Ok(false),
            (None, Strictness::Strict) => Err(SBMLError::MissingAttribute {
                element: element.name.clone(),
                attribute: attribute.to_string(),
            }),
        }
    }

    fn check_compartment(&self, owner: String, compartment: &str) -> Result<(), SBMLError> {
        match self.registry.kind(compartment) {
            Some(SIdKind::Compartment) => Ok(()),
            _ => Err(SBMLError::UnknownCompartment {
                owner,
                compartment: compartment.to_string(),
            }),
        }
    }
}

/// Reads the attributes of the `<model>` element.
///
/// Level 2 has no model-wide unit attributes; its built-in units take their
/// place.
pub fn extract_model_attributes(model: &XmlElement, level: u32) -> ModelAttributes {
    let unit = |attribute: &str, builtin: &str| {
        optional_string(model, attribute).or_else(|| (level < 3).then(|| builtin.to_string()))
    };

    ModelAttributes {
        id: optional_string(model, "id"),
        name: optional_string(model, "name").filter(|n| !n.is_empty()),
        substance_units: unit("substanceUnits", "substance"),
        time_units: unit("timeUnits", "time"),
        volume_units: unit("volumeUnits", "volume"),
        area_units: unit("areaUnits", "area"),
        length_units: unit("lengthUnits", "length"),
        extent_units: unit("extentUnits", "substance"),
        conversion_factor: optional_string(model, "conversionFactor"),
    }
}

pub fn extract_compartment(
    element: &XmlElement,
    ctx: &ExtractContext,
) -> Result<Compartment, SBMLError> {
    let id = required_sid(element, "id")?;
    let spatial_dimensions = parse_f64(element, "spatialDimensions")?
        .or_else(|| (ctx.level < 3).then_some(3.0));
    let units = optional_string(element, "units");

    let size_units = match &units {
        Some(reference) => Some(ctx.units.resolve(reference)?),
        None => match spatial_dimensions {
            None => Some(Unit::dimensionless()),
            Some(d) if d == 0.0 => Some(Unit::dimensionless()),
            Some(d) if d == 1.0 => ctx.defaults.length,
            Some(d) if d == 2.0 => ctx.defaults.area,
            Some(d) if d == 3.0 => ctx.defaults.volume,
            Some(_) => None,
        },
    };

    Ok(Compartment {
        id,
        name: optional_string(element, "name"),
        spatial_dimensions,
        size: parse_f64(element, "size")?,
        units,
        constant: parse_bool(element, "constant")?,
        size_units,
    })
}

pub fn extract_species(element: &XmlElement, ctx: &ExtractContext) -> Result<Species, SBMLError> {
    let id = required_sid(element, "id")?;
    let compartment = required(element, "compartment")?.trim().to_string();
    let has_only_substance_units = ctx.flag(element, "hasOnlySubstanceUnits")?;
    let constant = ctx.flag(element, "constant")?;
    let boundary_condition = ctx.flag(element, "boundaryCondition")?;
    ctx.check_compartment(format!("species \"{}\"", id), &compartment)?;

    let initial_amount = parse_f64(element, "initialAmount")?;
    let initial_concentration = parse_f64(element, "initialConcentration")?;
    if let (Some(_), Some(concentration)) = (initial_amount, initial_concentration) {
        return Err(SBMLError::InvalidAttribute {
            element: element.name.clone(),
            attribute: "initialConcentration".to_string(),
            value: concentration.to_string(),
            expected: "either initialAmount or initialConcentration, not both",
        });
    }

    let substance_units = optional_string(element, "substanceUnits");
    let amount_units = match &substance_units {
        Some(reference) => Some(ctx.units.resolve(reference)?),
        None => ctx.defaults.substance,
    };

    Ok(Species {
        id,
        name: optional_string(element, "name"),
        compartment,
        initial_amount,
        initial_concentration,
        substance_units,
        has_only_substance_units,
        boundary_condition,
        constant,
        conversion_factor: optional_string(element, "conversionFactor"),
        amount_units,
    })
}

pub fn extract_parameter(
    element: &XmlElement,
    ctx: &ExtractContext,
) -> Result<Parameter, SBMLError> {
    let id = required_sid(element, "id")?;
    let units = optional_string(element, "units");
    let unit = ctx.units.resolve_optional(units.as_deref())?;

    Ok(Parameter {
        id,
        name: optional_string(element, "name"),
        value: parse_f64(element, "value")?,
        units,
        constant: parse_bool(element, "constant")?,
        unit,
    })
}

fn extract_species_reference(
    element: &XmlElement,
    reaction: &str,
    ctx: &ExtractContext,
    warnings: &mut WarningCollector,
) -> Result<SpeciesReference, SBMLError> {
    let species = required(element, "species")?.trim().to_string();
    let id = optional_sid(element, "id")?;

    if ctx.registry.kind(&species) != Some(SIdKind::Species) {
        return Err(SBMLError::UnknownSpecies {
            reaction: reaction.to_string(),
            species,
        });
    }
    if element.child("stoichiometryMath").is_some() {
        return Err(SBMLError::StoichiometryMath(reaction.to_string()));
    }

    let stoichiometry = parse_f64(element, "stoichiometry")?;
    if stoichiometry.is_none() {
        warnings.warn(format!(
            "Stoichiometry has not been set for species \"{}\" in {}; assuming 1.",
            species, reaction
        ));
    }

    Ok(SpeciesReference {
        id,
        species,
        stoichiometry,
    })
}

/// Reads a `<reaction>` element.
///
/// `index` is the position of the reaction in its list.
pub fn extract_reaction(
    element: &XmlElement,
    index: usize,
    ctx: &ExtractContext,
    warnings: &mut WarningCollector,
) -> Result<Reaction, SBMLError> {
    let id = match ctx.strictness {
        Strictness::Strict => Some(required_sid(element, "id")?),
        Strictness::Lenient => optional_sid(element, "id")?,
    };
    let description = match &id {
        Some(id) => format!("reaction \"{}\"", id),
        None => format!("reaction #{}", index + 1),
    };

    let compartment = optional_string(element, "compartment");
    if let Some(compartment) = &compartment {
        ctx.check_compartment(description.clone(), compartment)?;
    }

    if parse_bool(element, "fast")? == Some(true) {
        return Err(SBMLError::FastReaction(description));
    }

    let mut reactants = Vec::new();
    if let Some(list) = element.child("listOfReactants") {
        for reference in list.children_named("speciesReference") {
            reactants.push(extract_species_reference(reference, &description, ctx, warnings)?);
        }
    }

    let mut products = Vec::new();
    if let Some(list) = element.child("listOfProducts") {
        for reference in list.children_named("speciesReference") {
            products.push(extract_species_reference(reference, &description, ctx, warnings)?);
        }
    }

    let mut modifiers = Vec::new();
    if let Some(list) = element.child("listOfModifiers") {
        for reference in list.children_named("modifierSpeciesReference") {
            let species = required(reference, "species")?.trim().to_string();
            if ctx.registry.kind(&species) != Some(SIdKind::Species) {
                return Err(SBMLError::UnknownSpecies {
                    reaction: description,
                    species,
                });
            }
            modifiers.push(ModifierReference { species });
        }
    }

    if reactants.is_empty() && products.is_empty() {
        return Err(SBMLError::EmptyReaction(description));
    }

    let kinetic_law = match element.child("kineticLaw") {
        Some(law) => {
            let has_locals = ["listOfLocalParameters", "listOfParameters"]
                .iter()
                .filter_map(|list| law.child(list))
                .any(|list| list.elements().next().is_some());
            if has_locals {
                return Err(SBMLError::LocalParameters(description));
            }
            law.child("math").cloned()
        }
        None => None,
    };
    if kinetic_law.is_none() {
        log::debug!("{} has no kinetic law", description);
    }

    Ok(Reaction {
        id,
        name: optional_string(element, "name"),
        compartment,
        reversible: parse_bool(element, "reversible")?,
        reactants,
        products,
        modifiers,
        kinetic_law,
        index,
    })
}

/// Reads an element of `<listOfRules>`. Rules without math have no effect and
/// are skipped.
pub fn extract_rule(element: &XmlElement) -> Result<Option<Rule>, SBMLError> {
    let kind = match element.name.as_str() {
        "assignmentRule" => RuleKind::Assignment,
        "rateRule" => RuleKind::Rate,
        "algebraicRule" => return Err(SBMLError::AlgebraicRule),
        other => {
            log::debug!("Skipping unknown rule element <{}>", other);
            return Ok(None);
        }
    };

    let variable = required(element, "variable")?.trim().to_string();
    match element.child("math") {
        Some(math) => Ok(Some(Rule {
            kind,
            variable,
            math: math.clone(),
        })),
        None => {
            log::debug!("Skipping <{}> for \"{}\" without math", kind.tag(), variable);
            Ok(None)
        }
    }
}

pub fn extract_initial_assignment(
    element: &XmlElement,
) -> Result<Option<InitialAssignment>, SBMLError> {
    let symbol = required(element, "symbol")?.trim().to_string();
    Ok(element.child("math").map(|math| InitialAssignment {
        symbol,
        math: math.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        units: UnitTable,
        defaults: ModelDefaults,
        registry: SIdRegistry,
    }

    impl Fixture {
        fn new(level: u32) -> Self {
            let units = UnitTable::new(level);
            let attributes = ModelAttributes {
                volume_units: Some("litre".to_string()),
                length_units: Some("metre".to_string()),
                substance_units: Some("mole".to_string()),
                ..Default::default()
            };
            let defaults = ModelDefaults::resolve(&attributes, &units).unwrap();
            let mut registry = SIdRegistry::new();
            registry.register("c", SIdKind::Compartment).unwrap();
            registry.register("s", SIdKind::Species).unwrap();
            Self {
                units,
                defaults,
                registry,
            }
        }

        fn context(&self, strictness: Strictness, level: u32) -> ExtractContext<'_> {
            ExtractContext {
                strictness,
                level,
                units: &self.units,
                defaults: &self.defaults,
                registry: &self.registry,
            }
        }
    }

    fn element(xml: &str) -> XmlElement {
        XmlElement::parse(xml).unwrap()
    }

    #[test]
    fn test_compartment_size_units() {
        let fixture = Fixture::new(3);
        let ctx = fixture.context(Strictness::Lenient, 3);

        let c = extract_compartment(&element(r#"<compartment id="a" spatialDimensions="3"/>"#), &ctx)
            .unwrap();
        assert_eq!(c.size_units, Some(crate::units::UnitKind::Litre.unit()));

        let c = extract_compartment(&element(r#"<compartment id="a" spatialDimensions="1"/>"#), &ctx)
            .unwrap();
        assert_eq!(c.size_units, Some(Unit::metre()));

        let c = extract_compartment(&element(r#"<compartment id="a" spatialDimensions="2"/>"#), &ctx)
            .unwrap();
        assert_eq!(c.size_units, None);

        let c =
            extract_compartment(&element(r#"<compartment id="a" spatialDimensions="1.4"/>"#), &ctx)
                .unwrap();
        assert_eq!(c.size_units, None);

        let c = extract_compartment(&element(r#"<compartment id="a" units="henry"/>"#), &ctx)
            .unwrap();
        assert_eq!(c.size_units, Some(crate::units::UnitKind::Henry.unit()));
    }

    #[test]
    fn test_level2_compartment_defaults_to_three_dimensions() {
        let fixture = Fixture::new(2);
        let ctx = fixture.context(Strictness::Lenient, 2);
        let c = extract_compartment(&element(r#"<compartment id="a"/>"#), &ctx).unwrap();
        assert_eq!(c.spatial_dimensions, Some(3.0));
    }

    #[test]
    fn test_species_flags() {
        let fixture = Fixture::new(3);
        let lenient = fixture.context(Strictness::Lenient, 3);
        let strict = fixture.context(Strictness::Strict, 3);

        let xml = element(r#"<species id="x" compartment="c"/>"#);
        let species = extract_species(&xml, &lenient).unwrap();
        assert!(!species.has_only_substance_units);
        assert!(!species.boundary_condition);
        assert!(!species.constant);

        let err = extract_species(&xml, &strict).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Element <species> is missing required attribute \"hasOnlySubstanceUnits\"."
        );

        let xml = element(r#"<species id="x" compartment="c" hasOnlySubstanceUnits="true"/>"#);
        let err = extract_species(&xml, &strict).unwrap_err();
        assert!(err.to_string().contains("\"constant\""));

        let xml = element(
            r#"<species id="x" compartment="c" hasOnlySubstanceUnits="true" constant="false"/>"#,
        );
        let err = extract_species(&xml, &strict).unwrap_err();
        assert!(err.to_string().contains("\"boundaryCondition\""));
    }

    #[test]
    fn test_species_references() {
        let fixture = Fixture::new(3);
        let ctx = fixture.context(Strictness::Lenient, 3);

        let err = extract_species(&element(r#"<species id="x"/>"#), &ctx).unwrap_err();
        assert!(err.to_string().contains("\"compartment\""));

        let err =
            extract_species(&element(r#"<species id="x" compartment="nowhere"/>"#), &ctx)
                .unwrap_err();
        assert!(err.to_string().starts_with("Unknown compartment"));

        let err = extract_species(&element(r#"<species id="1x" compartment="c"/>"#), &ctx)
            .unwrap_err();
        assert!(err.to_string().starts_with("Invalid SId"));
    }

    #[test]
    fn test_reaction_checks() {
        let fixture = Fixture::new(3);
        let ctx = fixture.context(Strictness::Lenient, 3);
        let mut warnings = WarningCollector::new();

        let xml = element(
            r#"<reaction id="r"><listOfReactants><speciesReference species="s"/></listOfReactants></reaction>"#,
        );
        let reaction = extract_reaction(&xml, 0, &ctx, &mut warnings).unwrap();
        assert_eq!(reaction.reactants[0].coefficient(), 1.0);
        assert_eq!(warnings.count(), 1);
        assert!(warnings.text().contains("Stoichiometry has not been set"));

        let err = extract_reaction(&element(r#"<reaction id="r"/>"#), 0, &ctx, &mut warnings)
            .unwrap_err();
        assert!(err.to_string().contains("at least one reactant or product"));

        let err = extract_reaction(&element(r#"<reaction id="r" fast="true"/>"#), 0, &ctx, &mut warnings)
            .unwrap_err();
        assert_eq!(err, SBMLError::FastReaction("reaction \"r\"".to_string()));

        let xml = element(
            r#"<reaction id="r" fast="true"><listOfProducts><speciesReference species="s" stoichiometry="1"/></listOfProducts></reaction>"#,
        );
        let err = extract_reaction(&xml, 0, &ctx, &mut warnings).unwrap_err();
        assert!(err
            .to_string()
            .contains("does not support the conversion of <fast>"));

        let xml = element(
            r#"<reaction id="r"><listOfProducts><speciesReference species="s" stoichiometry="1"/></listOfProducts>
                <kineticLaw><listOfLocalParameters><localParameter id="k"/></listOfLocalParameters></kineticLaw>
            </reaction>"#,
        );
        let err = extract_reaction(&xml, 0, &ctx, &mut warnings).unwrap_err();
        assert!(err
            .to_string()
            .contains("does not support the definition of local parameters"));

        let xml = element(
            r#"<reaction id="r"><listOfProducts><speciesReference species="q" stoichiometry="1"/></listOfProducts></reaction>"#,
        );
        let err = extract_reaction(&xml, 0, &ctx, &mut warnings).unwrap_err();
        assert!(err.to_string().starts_with("Species ID not existent"));
    }

    #[test]
    fn test_rules() {
        let err = extract_rule(&element(r#"<algebraicRule><math/></algebraicRule>"#)).unwrap_err();
        assert_eq!(err.to_string(), "Algebraic assignments are not supported.");

        let rule = extract_rule(&element(r#"<rateRule variable="x"><math/></rateRule>"#))
            .unwrap()
            .unwrap();
        assert_eq!(rule.kind, RuleKind::Rate);
        assert_eq!(rule.variable, "x");

        assert_eq!(
            extract_rule(&element(r#"<assignmentRule variable="x"/>"#)).unwrap(),
            None
        );
    }

    #[test]
    fn test_level2_model_attributes() {
        let model = element(r#"<model id="m"/>"#);
        let attributes = extract_model_attributes(&model, 2);
        assert_eq!(attributes.volume_units.as_deref(), Some("volume"));
        assert_eq!(attributes.time_units.as_deref(), Some("time"));

        let attributes = extract_model_attributes(&model, 3);
        assert_eq!(attributes.volume_units, None);
    }
}

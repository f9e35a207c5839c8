//! SBML Document Writer
//!
//! Writes an imported [`Model`] back out as an SBML Level 3 Version 2
//! document. The document is rebuilt from the records kept by the model, so
//! reading the written document yields an equivalent model.
//!
//! Documents of older levels may refer to the Level 2 built-in units
//! (`substance`, `volume`, ...), which do not exist in Level 3. The writer
//! declares a unit definition for every built-in unit that is referenced but
//! not defined by the document itself.

use std::{
    collections::{BTreeSet, HashSet},
    io::Cursor,
    path::Path,
};

use quick_xml::{
    events::{BytesDecl, Event},
    Writer,
};

use crate::{
    model::graph::Model,
    sbml::{
        entities::{
            Compartment, ModelRecords, Parameter, Reaction, Species, SpeciesReference,
            UnitDefinition, UnitTerm,
        },
        error::SBMLError,
        ident::free_name,
        units::{level2_builtin, terms_for},
        version::SBML_L3V2_NAMESPACE,
        xml::XmlElement,
    },
};

const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Serializes a model as an SBML Level 3 Version 2 document.
pub fn to_sbml_string(model: &Model) -> Result<String, SBMLError> {
    let document = build_document(model);

    let mut buffer = Cursor::new(Vec::new());
    let mut writer = Writer::new_with_indent(&mut buffer, b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| SBMLError::Xml(e.to_string()))?;
    document
        .write(&mut writer)
        .map_err(|e| SBMLError::Xml(e.to_string()))?;

    String::from_utf8(buffer.into_inner()).map_err(|e| SBMLError::Xml(e.to_string()))
}

/// Writes a model to an SBML file.
pub fn write_sbml_file(model: &Model, path: impl AsRef<Path>) -> Result<(), SBMLError> {
    let path = path.as_ref();
    let xml = to_sbml_string(model)?;
    std::fs::write(path, xml).map_err(|e| SBMLError::Xml(format!("{}: {}", path.display(), e)))?;
    log::info!("Wrote SBML file {}", path.display());
    Ok(())
}

fn build_document(model: &Model) -> XmlElement {
    let records = model.records();

    let mut sbml = XmlElement::new("sbml");
    sbml.set_attribute("xmlns", SBML_L3V2_NAMESPACE);
    sbml.set_attribute("level", "3");
    sbml.set_attribute("version", "2");

    let mut element = XmlElement::new("model");
    let attributes = &records.attributes;
    set_optional(&mut element, "id", attributes.id.as_deref());
    set_optional(&mut element, "name", attributes.name.as_deref());
    set_optional(&mut element, "substanceUnits", attributes.substance_units.as_deref());
    set_optional(&mut element, "timeUnits", attributes.time_units.as_deref());
    set_optional(&mut element, "volumeUnits", attributes.volume_units.as_deref());
    set_optional(&mut element, "areaUnits", attributes.area_units.as_deref());
    set_optional(&mut element, "lengthUnits", attributes.length_units.as_deref());
    set_optional(&mut element, "extentUnits", attributes.extent_units.as_deref());
    set_optional(&mut element, "conversionFactor", attributes.conversion_factor.as_deref());

    if let Some(notes) = model.notes() {
        element.push(notes_element(notes));
    }

    let definitions = unit_definitions(records);
    push_list(&mut element, "listOfUnitDefinitions", definitions.iter().map(unit_definition));
    push_list(&mut element, "listOfCompartments", records.compartments.iter().map(compartment));
    push_list(&mut element, "listOfSpecies", records.species.iter().map(species));
    push_list(&mut element, "listOfParameters", records.parameters.iter().map(parameter));
    push_list(
        &mut element,
        "listOfInitialAssignments",
        records.initial_assignments.iter().map(|assignment| {
            let mut element = XmlElement::new("initialAssignment");
            element.set_attribute("symbol", assignment.symbol.as_str());
            element.push(assignment.math.detached());
            element
        }),
    );
    push_list(
        &mut element,
        "listOfRules",
        records.rules.iter().map(|rule| {
            let mut element = XmlElement::new(rule.kind.tag());
            element.set_attribute("variable", rule.variable.as_str());
            element.push(rule.math.detached());
            element
        }),
    );
    push_list(
        &mut element,
        "listOfReactions",
        records
            .reactions
            .iter()
            .zip(reaction_ids(records))
            .map(|(r, id)| reaction(r, &id)),
    );

    sbml.push(element);
    sbml
}

fn set_optional(element: &mut XmlElement, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        element.set_attribute(key, value);
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Adds a list element, unless there is nothing to put in it.
fn push_list(parent: &mut XmlElement, name: &str, items: impl Iterator<Item = XmlElement>) {
    let mut list = XmlElement::new(name);
    for item in items {
        list.push(item);
    }
    if !list.children.is_empty() {
        parent.push(list);
    }
}

fn notes_element(notes: &str) -> XmlElement {
    let mut body = XmlElement::new("body");
    body.set_attribute("xmlns", XHTML_NAMESPACE);
    for line in notes.lines() {
        let mut paragraph = XmlElement::new("p");
        paragraph.push_text(line);
        body.push(paragraph);
    }

    let mut element = XmlElement::new("notes");
    element.push(body);
    element
}

/// The unit definitions of the document plus definitions for the referenced
/// Level 2 built-in units.
fn unit_definitions(records: &ModelRecords) -> Vec<UnitDefinition> {
    let mut definitions = records.unit_definitions.clone();

    let attributes = &records.attributes;
    let references = [
        &attributes.substance_units,
        &attributes.time_units,
        &attributes.volume_units,
        &attributes.area_units,
        &attributes.length_units,
        &attributes.extent_units,
    ]
    .into_iter()
    .chain(records.compartments.iter().map(|c| &c.units))
    .chain(records.species.iter().map(|s| &s.substance_units))
    .chain(records.parameters.iter().map(|p| &p.units))
    .filter_map(|reference| reference.as_deref())
    .collect::<BTreeSet<_>>();

    for reference in references {
        if definitions.iter().any(|d| d.id == reference) {
            continue;
        }
        if let Some(unit) = level2_builtin(reference) {
            definitions.push(UnitDefinition {
                id: reference.to_string(),
                name: None,
                terms: terms_for(&unit),
                unit,
            });
        }
    }

    definitions
}

fn unit_definition(definition: &UnitDefinition) -> XmlElement {
    let mut element = XmlElement::new("unitDefinition");
    element.set_attribute("id", definition.id.as_str());
    set_optional(&mut element, "name", definition.name.as_deref());

    let mut units = XmlElement::new("listOfUnits");
    for term in &definition.terms {
        units.push(unit_term(term));
    }
    if !definition.terms.is_empty() {
        element.push(units);
    }
    element
}

fn unit_term(term: &UnitTerm) -> XmlElement {
    let mut element = XmlElement::new("unit");
    element.set_attribute("kind", term.kind.name());
    element.set_attribute("exponent", term.exponent.to_string());
    element.set_attribute("scale", term.scale.to_string());
    element.set_attribute("multiplier", term.multiplier.to_string());
    element
}

fn compartment(compartment: &Compartment) -> XmlElement {
    let mut element = XmlElement::new("compartment");
    element.set_attribute("id", compartment.id.as_str());
    set_optional(&mut element, "name", compartment.name.as_deref());
    if let Some(dimensions) = compartment.spatial_dimensions {
        element.set_attribute("spatialDimensions", dimensions.to_string());
    }
    if let Some(size) = compartment.size {
        element.set_attribute("size", size.to_string());
    }
    set_optional(&mut element, "units", compartment.units.as_deref());
    element.set_attribute("constant", flag(compartment.constant.unwrap_or(true)));
    element
}

fn species(species: &Species) -> XmlElement {
    let mut element = XmlElement::new("species");
    element.set_attribute("id", species.id.as_str());
    set_optional(&mut element, "name", species.name.as_deref());
    element.set_attribute("compartment", species.compartment.as_str());
    if let Some(amount) = species.initial_amount {
        element.set_attribute("initialAmount", amount.to_string());
    }
    if let Some(concentration) = species.initial_concentration {
        element.set_attribute("initialConcentration", concentration.to_string());
    }
    set_optional(&mut element, "substanceUnits", species.substance_units.as_deref());
    element.set_attribute("hasOnlySubstanceUnits", flag(species.has_only_substance_units));
    element.set_attribute("boundaryCondition", flag(species.boundary_condition));
    element.set_attribute("constant", flag(species.constant));
    set_optional(&mut element, "conversionFactor", species.conversion_factor.as_deref());
    element
}

fn parameter(parameter: &Parameter) -> XmlElement {
    let mut element = XmlElement::new("parameter");
    element.set_attribute("id", parameter.id.as_str());
    set_optional(&mut element, "name", parameter.name.as_deref());
    if let Some(value) = parameter.value {
        element.set_attribute("value", value.to_string());
    }
    set_optional(&mut element, "units", parameter.units.as_deref());
    element.set_attribute("constant", flag(parameter.constant.unwrap_or(true)));
    element
}

fn species_reference(reference: &SpeciesReference) -> XmlElement {
    let mut element = XmlElement::new("speciesReference");
    set_optional(&mut element, "id", reference.id.as_deref());
    element.set_attribute("species", reference.species.as_str());
    element.set_attribute("stoichiometry", reference.coefficient().to_string());
    element.set_attribute("constant", "true");
    element
}

/// Reaction ids, with a free id for every reaction that has none.
fn reaction_ids(records: &ModelRecords) -> Vec<String> {
    let mut taken = records
        .compartments
        .iter()
        .map(|c| c.id.clone())
        .chain(records.species.iter().map(|s| s.id.clone()))
        .chain(records.parameters.iter().map(|p| p.id.clone()))
        .chain(records.reactions.iter().filter_map(|r| r.id.clone()))
        .chain(
            records
                .reactions
                .iter()
                .flat_map(|r| r.reactants.iter().chain(r.products.iter()))
                .filter_map(|r| r.id.clone()),
        )
        .collect::<HashSet<_>>();

    records
        .reactions
        .iter()
        .enumerate()
        .map(|(index, reaction)| match &reaction.id {
            Some(id) => id.clone(),
            None => {
                let base = format!("reaction_{}", index + 1);
                let id = free_name(&base, |name| taken.contains(name));
                taken.insert(id.clone());
                id
            }
        })
        .collect()
}

fn reaction(reaction: &Reaction, id: &str) -> XmlElement {
    let mut element = XmlElement::new("reaction");
    element.set_attribute("id", id);
    set_optional(&mut element, "name", reaction.name.as_deref());
    set_optional(&mut element, "compartment", reaction.compartment.as_deref());
    element.set_attribute("reversible", flag(reaction.reversible.unwrap_or(true)));
    element.set_attribute("fast", "false");

    push_list(&mut element, "listOfReactants", reaction.reactants.iter().map(species_reference));
    push_list(&mut element, "listOfProducts", reaction.products.iter().map(species_reference));
    push_list(
        &mut element,
        "listOfModifiers",
        reaction.modifiers.iter().map(|modifier| {
            let mut element = XmlElement::new("modifierSpeciesReference");
            element.set_attribute("species", modifier.species.as_str());
            element
        }),
    );

    if let Some(math) = &reaction.kinetic_law {
        let mut law = XmlElement::new("kineticLaw");
        law.push(math.detached());
        element.push(law);
    }
    element
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag() {
        assert_eq!(flag(true), "true");
        assert_eq!(flag(false), "false");
    }

    #[test]
    fn test_notes_element_one_paragraph_per_line() {
        let notes = notes_element("first line\nsecond & last");
        let body = notes.child("body").unwrap();
        let lines = body
            .children_named("p")
            .map(|p| p.text())
            .collect::<Vec<_>>();
        assert_eq!(lines, vec!["first line", "second & last"]);
    }

    #[test]
    fn test_builtin_units_are_declared() {
        let mut records = ModelRecords::default();
        records.attributes.substance_units = Some("substance".to_string());
        records.attributes.time_units = Some("second".to_string());

        let definitions = unit_definitions(&records);
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].id, "substance");
        assert_eq!(definitions[0].unit, crate::units::Unit::mole());
    }

    fn unnamed_reaction(id: Option<&str>, index: usize) -> Reaction {
        Reaction {
            id: id.map(str::to_string),
            name: None,
            compartment: None,
            reversible: Some(false),
            reactants: Vec::new(),
            products: Vec::new(),
            modifiers: Vec::new(),
            kinetic_law: None,
            index,
        }
    }

    #[test]
    fn test_reaction_ids_are_filled_in() {
        let mut records = ModelRecords::default();
        records.parameters.push(Parameter {
            id: "reaction_1".to_string(),
            name: None,
            value: Some(1.0),
            units: None,
            constant: Some(true),
            unit: None,
        });
        records.reactions = vec![
            unnamed_reaction(None, 0),
            unnamed_reaction(Some("r"), 1),
            unnamed_reaction(None, 2),
        ];

        assert_eq!(reaction_ids(&records), vec!["reaction_1_1", "r", "reaction_3"]);
    }

    #[test]
    fn test_empty_lists_are_omitted() {
        let mut parent = XmlElement::new("model");
        push_list(&mut parent, "listOfRules", std::iter::empty());
        assert!(parent.children.is_empty());
    }
}

//! SBML model assembly
//!
//! Turns a parsed SBML document into a [`Model`]. The assembly runs in two
//! passes:
//!
//! 1. Every entity is read into an immutable record and its identifier is
//!    registered. Entities are read in dependency order: unit definitions,
//!    compartments, species, parameters, reactions, initial assignments and
//!    rules.
//! 2. Once all identifiers are known, math is converted into expressions and
//!    the variables of the model are created. Each compartment becomes a
//!    component holding its size and its species; parameters, the time
//!    variable and the global conversion factor live in the global component.
//!
//! Species changed by reactions become states whose derivative is the sum of
//! the fluxes of all reactions they take part in, weighted by stoichiometry.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::{
    model::{
        component::Component,
        expr::{BinaryOp, Expr},
        graph::Model,
        variable::{Variable, VariableRole},
    },
    sbml::{
        entities::{ModelRecords, RuleKind, Species, SpeciesReference, UnitDefinition},
        error::SBMLError,
        extract::{
            extract_compartment, extract_initial_assignment, extract_model_attributes,
            extract_parameter, extract_reaction, extract_rule, extract_species, ExtractContext,
            ListKind, ModelDefaults,
        },
        ident::{free_name, SIdKind, SIdRegistry, GLOBAL_COMPONENT, GLOBAL_CONVERSION_FACTOR},
        mathml::{build_expression, NameResolver},
        notes::notes_to_text,
        read::ParserOptions,
        units::UnitTable,
        version::check_document,
        warnings::WarningCollector,
        xml::XmlElement,
    },
    units::Unit,
};

/// Progress of an import. Each stage is only entered once the previous one
/// completed without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Idle,
    NamespaceChecked,
    UnitsLoaded,
    EntitiesLoaded,
    CrossReferenced,
    Assembled,
}

/// Assembles the model of an SBML document.
pub(crate) fn assemble(
    root: &XmlElement,
    options: &ParserOptions,
    warnings: &mut WarningCollector,
) -> Result<Model, SBMLError> {
    Assembler::new(options).run(root, warnings)
}

struct Assembler<'a> {
    options: &'a ParserOptions,
    stage: Stage,
    level: u32,
    units: UnitTable,
    defaults: ModelDefaults,
    registry: SIdRegistry,
    records: ModelRecords,
}

impl<'a> Assembler<'a> {
    fn new(options: &'a ParserOptions) -> Self {
        Self {
            options,
            stage: Stage::Idle,
            level: 3,
            units: UnitTable::new(3),
            defaults: ModelDefaults::default(),
            registry: SIdRegistry::new(),
            records: ModelRecords::default(),
        }
    }

    fn advance(&mut self, stage: Stage) {
        debug_assert!(stage > self.stage);
        log::debug!("SBML import: {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }

    fn context(&self) -> ExtractContext<'_> {
        ExtractContext {
            strictness: self.options.strictness,
            level: self.level,
            units: &self.units,
            defaults: &self.defaults,
            registry: &self.registry,
        }
    }

    fn run(mut self, root: &XmlElement, warnings: &mut WarningCollector) -> Result<Model, SBMLError> {
        let info = check_document(root, self.options.strictness, warnings)?;
        self.level = info.effective_level();
        self.units = UnitTable::new(self.level);
        self.advance(Stage::NamespaceChecked);

        let model = root.child("model").ok_or(SBMLError::MissingModel)?;
        let lists = sort_lists(model, warnings)?;
        self.records.attributes = extract_model_attributes(model, self.level);

        self.load_units(&lists)?;
        self.advance(Stage::UnitsLoaded);

        self.load_entities(&lists, warnings)?;
        self.advance(Stage::EntitiesLoaded);

        self.cross_reference()?;
        self.advance(Stage::CrossReferenced);

        let name = self
            .records
            .attributes
            .name
            .clone()
            .or_else(|| self.records.attributes.id.clone())
            .unwrap_or_else(|| self.options.default_model_name.clone());
        let notes = model
            .child("notes")
            .and_then(|notes| notes_to_text(notes, self.options.notes_width));

        let (time, components) = ModelBuilder::new(&self.records, &self.defaults).build()?;
        self.advance(Stage::Assembled);

        Ok(Model::new(name, notes, time, components, self.records))
    }

    fn load_units(&mut self, lists: &HashMap<ListKind, &XmlElement>) -> Result<(), SBMLError> {
        if let Some(list) = lists.get(&ListKind::UnitDefinitions) {
            for element in list.children_named("unitDefinition") {
                let definition = UnitDefinition::try_from(element)?;
                self.units.define(&definition)?;
                self.records.unit_definitions.push(definition);
            }
        }
        self.defaults = ModelDefaults::resolve(&self.records.attributes, &self.units)?;
        Ok(())
    }

    fn load_entities(
        &mut self,
        lists: &HashMap<ListKind, &XmlElement>,
        warnings: &mut WarningCollector,
    ) -> Result<(), SBMLError> {
        let list = |kind: ListKind, tag: &'static str| {
            lists
                .get(&kind)
                .copied()
                .map(|list| list.children_named(tag).collect::<Vec<_>>())
                .unwrap_or_default()
        };

        for element in list(ListKind::Compartments, "compartment") {
            let compartment = extract_compartment(element, &self.context())?;
            self.registry
                .register(&compartment.id, SIdKind::Compartment)?;
            self.records.compartments.push(compartment);
        }

        for element in list(ListKind::Species, "species") {
            let species = extract_species(element, &self.context())?;
            self.registry.register(&species.id, SIdKind::Species)?;
            self.records.species.push(species);
        }

        for element in list(ListKind::Parameters, "parameter") {
            let parameter = extract_parameter(element, &self.context())?;
            self.registry.register(&parameter.id, SIdKind::Parameter)?;
            self.records.parameters.push(parameter);
        }

        for (index, element) in list(ListKind::Reactions, "reaction").into_iter().enumerate() {
            let reaction = extract_reaction(element, index, &self.context(), warnings)?;
            if let Some(id) = &reaction.id {
                self.registry.register(id, SIdKind::Reaction)?;
            }
            for reference in reaction.reactants.iter().chain(reaction.products.iter()) {
                if let Some(id) = &reference.id {
                    self.registry.register(id, SIdKind::SpeciesReference)?;
                }
            }
            self.records.reactions.push(reaction);
        }

        for element in list(ListKind::InitialAssignments, "initialAssignment") {
            if let Some(assignment) = extract_initial_assignment(element)? {
                self.records.initial_assignments.push(assignment);
            }
        }

        if let Some(rules) = lists.get(&ListKind::Rules) {
            for element in rules.elements() {
                if let Some(rule) = extract_rule(element)? {
                    self.records.rules.push(rule);
                }
            }
        }

        Ok(())
    }

    /// Checks references between records that could not be checked while
    /// reading, because the target may be declared later in the document.
    fn cross_reference(&self) -> Result<(), SBMLError> {
        for species in &self.records.species {
            if let Some(factor) = &species.conversion_factor {
                if self.registry.kind(factor) != Some(SIdKind::Parameter) {
                    return Err(SBMLError::UnknownConversionFactor {
                        species: species.id.clone(),
                        factor: factor.clone(),
                    });
                }
            }
        }

        if let Some(factor) = &self.records.attributes.conversion_factor {
            if self.registry.kind(factor) != Some(SIdKind::Parameter) {
                return Err(SBMLError::UnknownModelConversionFactor(factor.clone()));
            }
        }

        let reacting = self
            .records
            .reactions
            .iter()
            .flat_map(|r| r.reactants.iter().chain(r.products.iter()))
            .map(|r| r.species.as_str())
            .collect::<HashSet<_>>();

        let mut ruled = HashSet::new();
        let mut assigned = HashSet::new();
        for rule in &self.records.rules {
            self.check_variable(&rule.variable, rule.kind.tag())?;
            if !ruled.insert(rule.variable.as_str()) {
                return Err(SBMLError::DuplicateRule(rule.variable.clone()));
            }
            if rule.kind == RuleKind::Assignment {
                assigned.insert(rule.variable.as_str());
            }

            let boundary = self
                .records
                .species
                .iter()
                .any(|s| s.id == rule.variable && s.boundary_condition);
            if reacting.contains(rule.variable.as_str()) && !boundary {
                return Err(SBMLError::RuleConflict(rule.variable.clone()));
            }
        }

        for assignment in &self.records.initial_assignments {
            self.check_variable(&assignment.symbol, "initialAssignment")?;
            if assigned.contains(assignment.symbol.as_str()) {
                return Err(SBMLError::AssignmentConflict(assignment.symbol.clone()));
            }
        }

        Ok(())
    }

    fn check_variable(&self, variable: &str, element: &str) -> Result<(), SBMLError> {
        match self.registry.kind(variable) {
            Some(SIdKind::Reaction) | None => Err(SBMLError::UnknownVariable {
                element: element.to_string(),
                variable: variable.to_string(),
            }),
            Some(_) => Ok(()),
        }
    }
}

/// Groups the lists of a `<model>` element by kind.
///
/// Function definitions are rejected here; constraints and events are dropped
/// with a single warning each.
fn sort_lists<'x>(
    model: &'x XmlElement,
    warnings: &mut WarningCollector,
) -> Result<HashMap<ListKind, &'x XmlElement>, SBMLError> {
    let mut lists = HashMap::new();

    for child in model.elements() {
        let Some(kind) = ListKind::from_tag(&child.name) else {
            if child.name != "notes" && child.name != "annotation" {
                log::debug!("Ignoring <{}> in <model>", child.name);
            }
            continue;
        };

        let has_entries = child.elements().next().is_some();
        match kind {
            ListKind::FunctionDefinitions if has_entries => {
                return Err(SBMLError::FunctionDefinitions)
            }
            ListKind::Constraints if has_entries => warnings.warn("Ignoring SBML constraints."),
            ListKind::Events if has_entries => warnings.warn("Ignoring SBML events."),
            ListKind::FunctionDefinitions | ListKind::Constraints | ListKind::Events => {}
            _ => {
                if lists.insert(kind, child).is_some() {
                    return Err(SBMLError::DuplicateList(child.name.clone()));
                }
            }
        }
    }

    Ok(lists)
}

/// Resolves SIds to the qualified names of their variables.
struct SIdResolver<'a> {
    names: &'a HashMap<String, String>,
    time: &'a str,
}

impl NameResolver for SIdResolver<'_> {
    fn resolve(&self, name: &str) -> Result<Expr, SBMLError> {
        self.names
            .get(name)
            .map(Expr::name)
            .ok_or_else(|| SBMLError::UnresolvedName(name.to_string()))
    }

    fn time(&self) -> Expr {
        Expr::name(self.time)
    }
}

/// Creates the components and variables from the records.
struct ModelBuilder<'a> {
    records: &'a ModelRecords,
    defaults: &'a ModelDefaults,
    components: IndexMap<String, Component>,
    /// Qualified variable name per SId.
    names: HashMap<String, String>,
    /// Qualified size variable name per compartment.
    sizes: HashMap<String, String>,
}

impl<'a> ModelBuilder<'a> {
    fn new(records: &'a ModelRecords, defaults: &'a ModelDefaults) -> Self {
        Self {
            records,
            defaults,
            components: IndexMap::new(),
            names: HashMap::new(),
            sizes: HashMap::new(),
        }
    }

    /// Returns the qualified name of the time variable and the components.
    fn build(mut self) -> Result<(String, IndexMap<String, Component>), SBMLError> {
        let time = self.create_global_variables();
        self.create_compartment_variables();
        self.create_stoichiometry_variables();

        let resolver = SIdResolver {
            names: &self.names,
            time: &time,
        };
        let rates = self.reaction_rates(&resolver)?;
        let rules = self
            .records
            .rules
            .iter()
            .map(|rule| Ok((rule, build_expression(&rule.math, &resolver)?)))
            .collect::<Result<Vec<_>, SBMLError>>()?;
        let assignments = self
            .records
            .initial_assignments
            .iter()
            .map(|a| Ok((a, build_expression(&a.math, &resolver)?)))
            .collect::<Result<Vec<_>, SBMLError>>()?;

        for (species, rate) in rates {
            if let Some(variable) = self.variable_mut(&species) {
                variable.promote_to_state(rate);
            }
        }

        for (rule, expr) in rules {
            if let Some(variable) = self.variable_mut(&rule.variable) {
                match rule.kind {
                    RuleKind::Assignment => {
                        variable.set_role(VariableRole::Intermediary);
                        variable.set_rhs(Some(expr));
                    }
                    RuleKind::Rate => variable.promote_to_state(expr),
                }
            }
        }

        for (assignment, expr) in assignments {
            if let Some(variable) = self.variable_mut(&assignment.symbol) {
                if variable.is_state() {
                    variable.set_initial_value(Some(expr));
                } else {
                    variable.set_rhs(Some(expr));
                }
            }
        }

        Ok((time, self.components))
    }

    fn variable_mut(&mut self, sid: &str) -> Option<&mut Variable> {
        let qname = self.names.get(sid)?;
        let (component, name) = qname.split_once('.')?;
        self.components.get_mut(component)?.get_mut(name)
    }

    fn component(&mut self, name: &str) -> &mut Component {
        self.components
            .entry(name.to_string())
            .or_insert_with(|| Component::new(name))
    }

    /// Stoichiometry parameters as (component, reference).
    fn stoichiometry_references(&self) -> Vec<(&'a str, &'a SpeciesReference)> {
        let records: &'a ModelRecords = self.records;
        records
            .reactions
            .iter()
            .flat_map(|reaction| {
                let component = reaction.compartment.as_deref().unwrap_or(GLOBAL_COMPONENT);
                reaction
                    .reactants
                    .iter()
                    .chain(reaction.products.iter())
                    .filter(|r| r.id.is_some())
                    .map(move |r| (component, r))
            })
            .collect()
    }

    /// Creates parameters, the time variable and the global conversion factor.
    fn create_global_variables(&mut self) -> String {
        let records = self.records;
        let mut taken = records
            .parameters
            .iter()
            .map(|p| p.id.as_str())
            .collect::<HashSet<_>>();
        taken.extend(
            self.stoichiometry_references()
                .into_iter()
                .filter(|(component, _)| *component == GLOBAL_COMPONENT)
                .filter_map(|(_, r)| r.id.as_deref()),
        );
        let time_name = free_name("time", |name| taken.contains(name));
        let time_unit = self.defaults.time;

        let global = self.component(GLOBAL_COMPONENT);
        global
            .add_variable(&time_name, VariableRole::Bound)
            .set_unit(time_unit);
        let time = format!("{}.{}", GLOBAL_COMPONENT, time_name);

        for parameter in &records.parameters {
            let variable = self
                .component(GLOBAL_COMPONENT)
                .add_variable(&parameter.id, VariableRole::Constant);
            variable.set_unit(parameter.unit);
            variable.set_rhs(parameter.value.map(Expr::Number));
            self.names.insert(
                parameter.id.clone(),
                format!("{}.{}", GLOBAL_COMPONENT, parameter.id),
            );
        }

        if let Some(factor) = &records.attributes.conversion_factor {
            let unit = records
                .parameters
                .iter()
                .find(|p| &p.id == factor)
                .and_then(|p| p.unit);
            let target = format!("{}.{}", GLOBAL_COMPONENT, factor);
            let variable = self
                .component(GLOBAL_COMPONENT)
                .add_variable(GLOBAL_CONVERSION_FACTOR, VariableRole::Constant);
            variable.set_unit(unit);
            variable.set_rhs(Some(Expr::name(target)));
        }

        time
    }

    /// Creates one component per compartment with its size and species.
    fn create_compartment_variables(&mut self) {
        let records = self.records;
        let stoichiometry = self.stoichiometry_references();

        for compartment in &records.compartments {
            let mut taken = records
                .species
                .iter()
                .filter(|s| s.compartment == compartment.id)
                .map(|s| s.id.as_str())
                .collect::<HashSet<_>>();
            taken.extend(
                stoichiometry
                    .iter()
                    .filter(|(component, _)| *component == compartment.id)
                    .filter_map(|(_, r)| r.id.as_deref()),
            );
            let size_name = free_name("size", |name| taken.contains(name));

            let variable = self
                .component(&compartment.id)
                .add_variable(&size_name, VariableRole::Constant);
            variable.set_unit(compartment.size_units);
            variable.set_rhs(compartment.size.map(Expr::Number));

            let qname = format!("{}.{}", compartment.id, size_name);
            self.names.insert(compartment.id.clone(), qname.clone());
            self.sizes.insert(compartment.id.clone(), qname);
        }

        for species in &records.species {
            let initial = self.species_initial_value(species);
            let unit = self.species_unit(species);
            let variable = self
                .component(&species.compartment)
                .add_variable(&species.id, VariableRole::Constant);
            variable.set_unit(unit);
            variable.set_rhs(initial);
            self.names.insert(
                species.id.clone(),
                format!("{}.{}", species.compartment, species.id),
            );
        }
    }

    fn create_stoichiometry_variables(&mut self) {
        for (component, reference) in self.stoichiometry_references() {
            let Some(id) = reference.id.as_deref() else {
                continue;
            };
            let variable = self
                .component(component)
                .add_variable(id, VariableRole::Constant);
            variable.set_unit(Some(Unit::dimensionless()));
            variable.set_rhs(Some(Expr::Number(reference.coefficient())));
            self.names
                .insert(id.to_string(), format!("{}.{}", component, id));
        }
    }

    /// The size variable of the species' compartment, if it scales the species.
    fn sized_compartment(&self, species: &Species) -> Option<Expr> {
        let compartment = self
            .records
            .compartments
            .iter()
            .find(|c| c.id == species.compartment)?;
        if !compartment.is_sized() {
            return None;
        }
        self.sizes.get(&compartment.id).map(Expr::name)
    }

    fn species_initial_value(&self, species: &Species) -> Option<Expr> {
        let size = self.sized_compartment(species);
        match (species.initial_amount, species.initial_concentration) {
            (Some(amount), _) if !species.is_amount() => Some(match size {
                Some(size) => Expr::binary(BinaryOp::Div, Expr::Number(amount), size),
                None => Expr::Number(amount),
            }),
            (Some(amount), _) => Some(Expr::Number(amount)),
            (None, Some(concentration)) if species.is_amount() => Some(match size {
                Some(size) => Expr::binary(BinaryOp::Mul, Expr::Number(concentration), size),
                None => Expr::Number(concentration),
            }),
            (None, Some(concentration)) => Some(Expr::Number(concentration)),
            (None, None) => None,
        }
    }

    fn species_unit(&self, species: &Species) -> Option<Unit> {
        let amount = species.amount_units?;
        if species.is_amount() {
            return Some(amount);
        }
        let compartment = self
            .records
            .compartments
            .iter()
            .find(|c| c.id == species.compartment)?;
        if !compartment.is_sized() {
            return Some(amount);
        }
        compartment.size_units.map(|size| amount / size)
    }

    /// Sums the reaction fluxes per species.
    fn reaction_rates(
        &self,
        resolver: &dyn NameResolver,
    ) -> Result<IndexMap<String, Expr>, SBMLError> {
        let mut sums: IndexMap<String, Expr> = IndexMap::new();

        for reaction in &self.records.reactions {
            let Some(math) = &reaction.kinetic_law else {
                continue;
            };
            let flux = build_expression(math, resolver)?;

            let terms = reaction
                .reactants
                .iter()
                .map(|r| (r, true))
                .chain(reaction.products.iter().map(|r| (r, false)));
            for (reference, is_reactant) in terms {
                let fixed = self
                    .records
                    .species
                    .iter()
                    .any(|s| s.id == reference.species && s.is_fixed());
                if fixed {
                    continue;
                }

                let term = self.stoichiometry_term(reference, &flux);
                let sum = match (sums.shift_remove(&reference.species), is_reactant) {
                    (None, true) => Expr::neg(term),
                    (None, false) => term,
                    (Some(sum), true) => Expr::binary(BinaryOp::Sub, sum, term),
                    (Some(sum), false) => Expr::binary(BinaryOp::Add, sum, term),
                };
                sums.insert(reference.species.clone(), sum);
            }
        }

        let global_factor = self
            .records
            .attributes
            .conversion_factor
            .as_ref()
            .map(|_| Expr::name(format!("{}.{}", GLOBAL_COMPONENT, GLOBAL_CONVERSION_FACTOR)));

        let mut rates = IndexMap::new();
        for (id, sum) in sums {
            let Some(species) = self.records.species.iter().find(|s| s.id == id) else {
                continue;
            };

            let factor = match &species.conversion_factor {
                Some(factor) => self.names.get(factor).map(Expr::name),
                None => global_factor.clone(),
            };
            let mut rate = match factor {
                Some(factor) => Expr::binary(BinaryOp::Mul, factor, sum),
                None => sum,
            };
            if !species.is_amount() {
                if let Some(size) = self.sized_compartment(species) {
                    rate = Expr::binary(BinaryOp::Div, rate, size);
                }
            }
            rates.insert(id, rate);
        }

        Ok(rates)
    }

    fn stoichiometry_term(&self, reference: &SpeciesReference, flux: &Expr) -> Expr {
        if let Some(qname) = reference.id.as_ref().and_then(|id| self.names.get(id)) {
            return Expr::binary(BinaryOp::Mul, Expr::name(qname.as_str()), flux.clone());
        }
        match reference.coefficient() {
            c if c == 1.0 => flux.clone(),
            c => Expr::binary(BinaryOp::Mul, Expr::Number(c), flux.clone()),
        }
    }
}

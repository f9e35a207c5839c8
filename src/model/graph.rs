//! The assembled model
//!
//! A [`Model`] is the read-only result of an import. It groups variables into
//! components and keeps the SBML records it was assembled from, so entities can
//! be looked up by their SBML identifiers as well as by qualified name.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    model::{
        component::Component,
        variable::{Variable, VariableRole},
    },
    sbml::entities::{Compartment, ModelRecords, Parameter, Reaction, Species},
    units::Unit,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    name: String,
    notes: Option<String>,
    time: String,
    components: IndexMap<String, Component>,
    records: ModelRecords,
}

impl Model {
    pub(crate) fn new(
        name: String,
        notes: Option<String>,
        time: String,
        components: IndexMap<String, Component>,
        records: ModelRecords,
    ) -> Self {
        Self {
            name,
            notes,
            time,
            components,
            records,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Plain-text notes extracted from the document, if any.
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// The bound time variable.
    pub fn time(&self) -> Option<&Variable> {
        self.get(&self.time)
    }

    pub fn time_unit(&self) -> Option<&Unit> {
        self.time().and_then(|t| t.unit())
    }

    /// Looks up a variable by qualified name, e.g. `compartment.S1`.
    pub fn get(&self, qname: &str) -> Option<&Variable> {
        let (component, variable) = qname.split_once('.')?;
        self.components.get(component)?.get(variable)
    }

    pub fn has_variable(&self, qname: &str) -> bool {
        self.get(qname).is_some()
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    pub fn count_components(&self) -> usize {
        self.components.len()
    }

    /// All variables, component by component.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.components.values().flat_map(|c| c.variables())
    }

    /// Counts the variables with the given role, or all variables for `None`.
    pub fn count_variables(&self, role: Option<VariableRole>) -> usize {
        self.components
            .values()
            .map(|c| c.count_variables(role))
            .sum()
    }

    /// The source records the model was assembled from.
    pub fn records(&self) -> &ModelRecords {
        &self.records
    }

    pub fn compartment(&self, id: &str) -> Option<&Compartment> {
        self.records.compartments.iter().find(|c| c.id == id)
    }

    pub fn species(&self, id: &str) -> Option<&Species> {
        self.records.species.iter().find(|s| s.id == id)
    }

    pub fn parameter(&self, id: &str) -> Option<&Parameter> {
        self.records.parameters.iter().find(|p| p.id == id)
    }

    pub fn reaction(&self, id: &str) -> Option<&Reaction> {
        self.records
            .reactions
            .iter()
            .find(|r| r.id.as_deref() == Some(id))
    }

    /// The unit declared by the unit definition with the given UnitSId.
    pub fn unit(&self, id: &str) -> Option<Unit> {
        self.records
            .unit_definitions
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.unit)
    }

    /// Evaluates the value of a variable at time zero.
    ///
    /// States evaluate to their initial value, the bound time variable to zero,
    /// and all other variables to their right-hand side. Returns `None` if any
    /// variable on the way has no value, or if the definitions are cyclic.
    pub fn evaluate(&self, qname: &str) -> Option<f64> {
        self.evaluate_visiting(qname, &[])
    }

    /// `visiting` holds the variables whose evaluation is in progress.
    fn evaluate_visiting<'q>(&self, qname: &'q str, visiting: &[&'q str]) -> Option<f64> {
        if visiting.contains(&qname) {
            log::debug!("Cyclic definition of {}", qname);
            return None;
        }

        let variable = self.get(qname)?;
        let expr = match variable.role() {
            VariableRole::Bound => return Some(0.0),
            VariableRole::State => variable.initial_value()?,
            VariableRole::Constant | VariableRole::Intermediary => variable.rhs()?,
        };

        let mut visiting = visiting.to_vec();
        visiting.push(qname);
        expr.eval(&|name| self.evaluate_visiting(name, &visiting))
    }
}

/// Models compare by their assembled variables, not by the records they were
/// built from.
impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.notes == other.notes
            && self.time == other.time
            && self.components == other.components
    }
}

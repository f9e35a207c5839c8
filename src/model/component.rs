use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::variable::{Variable, VariableRole};

/// A named group of variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    name: String,
    variables: IndexMap<String, Variable>,
}

impl Component {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            variables: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Variables in order of creation.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    pub fn count_variables(&self, role: Option<VariableRole>) -> usize {
        self.variables
            .values()
            .filter(|v| match role {
                Some(role) => v.role() == role,
                None => true,
            })
            .count()
    }

    /// Adds a variable and returns a mutable handle to it.
    pub(crate) fn add_variable(&mut self, name: &str, role: VariableRole) -> &mut Variable {
        let variable = Variable::new(&self.name, name, role);
        self.variables.entry(name.to_string()).or_insert(variable)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.get_mut(name)
    }
}

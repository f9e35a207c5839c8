use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::{model::expr::Expr, units::Unit};

/// The role a variable plays in the assembled model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableRole {
    /// Bound to an external input (the time variable).
    Bound,
    /// Defined by a time derivative.
    State,
    /// Defined by an expression evaluated at every point in time.
    Intermediary,
    /// Defined by a value that does not change over time.
    Constant,
}

impl Display for VariableRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VariableRole::Bound => "bound",
            VariableRole::State => "state",
            VariableRole::Intermediary => "intermediary",
            VariableRole::Constant => "constant",
        };
        write!(f, "{}", name)
    }
}

/// A variable in an assembled model.
///
/// For states the `rhs` holds the time derivative and `initial_value` the
/// value at time zero. For constants and intermediaries `rhs` holds the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    name: String,
    component: String,
    role: VariableRole,
    unit: Option<Unit>,
    rhs: Option<Expr>,
    initial_value: Option<Expr>,
}

impl Variable {
    pub(crate) fn new(component: &str, name: &str, role: VariableRole) -> Self {
        Self {
            name: name.to_string(),
            component: component.to_string(),
            role,
            unit: None,
            rhs: None,
            initial_value: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    /// The qualified name, `component.variable`.
    pub fn qname(&self) -> String {
        format!("{}.{}", self.component, self.name)
    }

    pub fn role(&self) -> VariableRole {
        self.role
    }

    pub fn unit(&self) -> Option<&Unit> {
        self.unit.as_ref()
    }

    pub fn rhs(&self) -> Option<&Expr> {
        self.rhs.as_ref()
    }

    /// The initial value of a state variable.
    pub fn initial_value(&self) -> Option<&Expr> {
        self.initial_value.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.role == VariableRole::Bound
    }

    pub fn is_state(&self) -> bool {
        self.role == VariableRole::State
    }

    pub fn is_intermediary(&self) -> bool {
        self.role == VariableRole::Intermediary
    }

    pub fn is_constant(&self) -> bool {
        self.role == VariableRole::Constant
    }

    pub(crate) fn set_role(&mut self, role: VariableRole) {
        self.role = role;
    }

    pub(crate) fn set_unit(&mut self, unit: Option<Unit>) {
        self.unit = unit;
    }

    pub(crate) fn set_rhs(&mut self, rhs: Option<Expr>) {
        self.rhs = rhs;
    }

    pub(crate) fn set_initial_value(&mut self, value: Option<Expr>) {
        self.initial_value = value;
    }

    /// Promotes the variable to a state: its current value becomes the
    /// initial value and `derivative` becomes its right-hand side.
    pub(crate) fn promote_to_state(&mut self, derivative: Expr) {
        if self.role != VariableRole::State {
            self.initial_value = self.rhs.take();
        }
        self.role = VariableRole::State;
        self.rhs = Some(derivative);
    }
}

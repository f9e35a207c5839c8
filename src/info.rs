//! Information display module for imported models
//!
//! Implements `Display` for [`Model`], rendering its variables as tables
//! grouped by role, and provides [`Reaction::scheme`] for a readable form of
//! the reactions kept in the model records.

use std::fmt::{self, Display};

use itertools::Itertools;
use tabled::{builder::Builder, settings::Style};

use crate::{
    model::{
        graph::Model,
        variable::{Variable, VariableRole},
    },
    sbml::entities::{Reaction, SpeciesReference},
};

/// Conversion of model parts to table rows
trait TableRecord {
    fn columns() -> Vec<String>;

    fn to_record(&self) -> Vec<String>;
}

fn to_table<T: TableRecord>(records: &[&T]) -> String {
    let mut builder = Builder::default();
    builder.push_record(T::columns());

    for record in records {
        builder.push_record(record.to_record());
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

impl TableRecord for Variable {
    fn columns() -> Vec<String> {
        vec![
            "qname".to_string(),
            "unit".to_string(),
            "initial value".to_string(),
            "rhs".to_string(),
        ]
    }

    fn to_record(&self) -> Vec<String> {
        let show = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
        vec![
            self.qname(),
            show(self.unit().map(|u| u.to_string())),
            show(self.initial_value().map(|e| e.to_string())),
            show(self.rhs().map(|e| e.to_string())),
        ]
    }
}

impl TableRecord for Reaction {
    fn columns() -> Vec<String> {
        vec!["reaction".to_string(), "scheme".to_string()]
    }

    fn to_record(&self) -> Vec<String> {
        vec![self.describe(), self.scheme()]
    }
}

impl Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = Builder::default();
        builder.push_record(vec![self.name().to_string()]);

        if let Some(notes) = self.notes() {
            builder.push_record(vec![notes.to_string()]);
        }

        let sections = [
            ("Bound", VariableRole::Bound),
            ("States", VariableRole::State),
            ("Intermediaries", VariableRole::Intermediary),
            ("Constants", VariableRole::Constant),
        ];
        for (title, role) in sections {
            let variables = self
                .variables()
                .filter(|v| v.role() == role)
                .collect::<Vec<_>>();
            if !variables.is_empty() {
                builder.push_record(vec![title.to_string()]);
                builder.push_record(vec![to_table(&variables)]);
            }
        }

        let reactions = self.records().reactions.iter().collect::<Vec<_>>();
        if !reactions.is_empty() {
            builder.push_record(vec!["Reactions".to_string()]);
            builder.push_record(vec![to_table(&reactions)]);
        }

        let mut table = builder.build();
        table.with(Style::sharp());
        write!(f, "{}", table)
    }
}

impl Reaction {
    /// Renders the reaction as `2 A + B -> C`, using `<->` when reversible.
    pub fn scheme(&self) -> String {
        let side = |references: &[SpeciesReference]| {
            references
                .iter()
                .map(|r| match r.coefficient() {
                    c if c == 1.0 => r.species.clone(),
                    c => format!("{} {}", c, r.species),
                })
                .join(" + ")
        };

        let arrow = if self.reversible.unwrap_or(true) {
            "<->"
        } else {
            "->"
        };
        format!("{} {} {}", side(&self.reactants), arrow, side(&self.products))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(species: &str, stoichiometry: Option<f64>) -> SpeciesReference {
        SpeciesReference {
            id: None,
            species: species.to_string(),
            stoichiometry,
        }
    }

    #[test]
    fn test_reaction_scheme() {
        let reaction = Reaction {
            id: Some("r1".to_string()),
            name: None,
            compartment: None,
            reversible: Some(false),
            reactants: vec![reference("A", Some(2.0)), reference("B", None)],
            products: vec![reference("C", Some(1.0))],
            modifiers: vec![],
            kinetic_law: None,
            index: 0,
        };
        assert_eq!(reaction.scheme(), "2 A + B -> C");
        assert_eq!(
            reaction.to_record(),
            vec!["reaction \"r1\"".to_string(), "2 A + B -> C".to_string()]
        );
    }
}
